use std::sync::Arc;

use tracing::{debug, info};

use regdoc_core::error::Result;
use regdoc_core::traits::Generator;

const REWRITE_PROMPT: &str = r#"You are an assistant specialised in Vietnamese semantics.
Rewrite the user's question so that it is formal and clear, using the administrative and legal terminology found in university regulations, so that it can be searched in those documents.

Requirements:
1. Keep the original intent of the question.
2. Replace slang, abbreviations and regional wording with standard administrative terms.
3. Return only the rewritten question, without any explanation.
4. If the question is not about academic or student regulations, return the original question unchanged.

Example:
- Input: "Nợ môn có bị tống cổ ra khỏi ktx ko"
- Output: "Sinh viên nợ môn hoặc kết quả học tập kém có bị chấm dứt hợp đồng ký túc xá không?"

Question: "{query}"
Standardized question:"#;

pub fn rewrite_prompt(query: &str) -> String {
    REWRITE_PROMPT.replace("{query}", query)
}

/// Strip whitespace and one layer of matching quotes the model may wrap
/// around its answer.
pub fn clean_rewrite(reply: &str) -> &str {
    let trimmed = reply.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('«', '»')] {
        if let Some(inner) = trimmed.strip_prefix(open).and_then(|s| s.strip_suffix(close)) {
            return inner.trim();
        }
    }
    trimmed
}

/// Normalises informal questions into the vocabulary of the regulations with
/// one generation call. Out-of-domain questions come back as they were.
pub struct QueryRewriter {
    generator: Arc<dyn Generator>,
}

impl QueryRewriter {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub async fn rewrite(&self, query: &str) -> Result<String> {
        let reply = self.generator.complete(&rewrite_prompt(query)).await?;
        let cleaned = clean_rewrite(&reply);
        if cleaned.is_empty() {
            debug!("blank rewrite reply, keeping original query");
            return Ok(query.to_string());
        }
        info!(original = query, rewritten = cleaned, "query rewritten");
        Ok(cleaned.to_string())
    }
}
