use std::sync::Arc;

use tracing::{debug, info};

use regdoc_core::config::SynthesisSettings;
use regdoc_core::error::Result;
use regdoc_core::traits::Generator;
use regdoc_core::types::{Answer, ScoredCandidate};

/// Fills the answer template once; substituted values are never rescanned.
fn qa_prompt(deflection: &str, context: &str, query: &str) -> String {
    format!(
        r#"You are an assistant for the academic regulations of Can Tho University.
Answer the question using ONLY the information in the document context below.

Rules:
1. Use only the context below.
2. If the question is not related to the context, answer exactly: "{deflection}"
3. If the context does not make the answer clear, answer exactly: "{deflection}"
4. Do not invent, infer or add information that is not in the context.
5. Answer entirely in Vietnamese.
6. Keep the answer short, precise and easy to understand.

Document context:
{context}

Question: {query}

Answer in Vietnamese:"#
    )
}

/// Context block for the prompt: each candidate prefixed with its source,
/// separated by blank lines, bounded by `max_chars`. Whole candidates are
/// dropped from the tail; only an oversized first candidate is cut.
/// Returns the context and how many leading candidates it contains.
pub fn build_context(candidates: &[ScoredCandidate], max_chars: usize) -> (String, usize) {
    let mut out = String::new();
    let mut used = 0usize;
    let mut included = 0usize;
    for (i, c) in candidates.iter().enumerate() {
        let block = format!("[{} - Trang {}]\n{}", c.chunk.metadata.file_name, c.chunk.metadata.page_label, c.chunk.text);
        let sep = if out.is_empty() { 0 } else { 2 };
        let len = block.chars().count();
        if used + sep + len > max_chars {
            if i == 0 && max_chars > 0 {
                out.extend(block.chars().take(max_chars));
                included = 1;
            }
            break;
        }
        if sep > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&block);
        used += sep + len;
        included += 1;
    }
    (out, included)
}

/// Produces grounded answers from reranked candidates.
pub struct AnswerSynthesizer {
    generator: Arc<dyn Generator>,
    settings: SynthesisSettings,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn Generator>, settings: SynthesisSettings) -> Self {
        Self { generator, settings }
    }

    pub fn deflection(&self) -> &str {
        &self.settings.deflection_message
    }

    pub fn prompt(&self, query: &str, context: &str) -> String {
        qa_prompt(&self.settings.deflection_message, context, query)
    }

    /// Always calls the generator, even with no candidates. Citations are the
    /// candidates that made it into the context, in order.
    pub async fn synthesize(&self, query: &str, mut candidates: Vec<ScoredCandidate>) -> Result<Answer> {
        let (context, included) = build_context(&candidates, self.settings.max_context_chars);
        if included < candidates.len() {
            debug!(dropped = candidates.len() - included, "context budget reached");
            candidates.truncate(included);
        }
        let prompt = self.prompt(query, &context);
        debug!(candidates = candidates.len(), prompt_chars = prompt.len(), "synthesizing");
        let reply = self.generator.complete(&prompt).await?;
        let text = self.normalise(&reply);
        if text == self.settings.deflection_message {
            info!("answer deflected");
        }
        Ok(Answer { text, citations: candidates })
    }

    fn normalise(&self, reply: &str) -> String {
        let trimmed = reply.trim();
        if trimmed.is_empty() || trimmed.contains(self.settings.deflection_message.as_str()) {
            return self.settings.deflection_message.clone();
        }
        trimmed.to_string()
    }
}
