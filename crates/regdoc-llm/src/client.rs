use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use regdoc_core::config::LlmSettings;
use regdoc_core::error::{Error, Result};
use regdoc_core::traits::Generator;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// `{endpoint}/chat/completions`, tolerating a trailing slash on the endpoint.
pub fn chat_url(endpoint: &str) -> String {
    format!("{}/chat/completions", endpoint.trim_end_matches('/'))
}

/// Extract `choices[0].message.content` from a chat completions response body.
pub fn parse_completion(body: &str) -> Result<String> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| Error::Generation(format!("invalid JSON response: {e}")))?;
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Generation(format!("unexpected response format: {}", snippet(body))))
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((i, _)) => &body[..i],
        None => body,
    }
}

/// Chat completions client. One user message per call; the prompt carries the
/// whole instruction.
pub struct ChatClient {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatClient {
    pub fn new(settings: &LlmSettings, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client: {e}")))?;
        let url = chat_url(&settings.endpoint);
        info!(%url, model = %settings.model, "generation client ready");
        Ok(Self {
            http,
            url,
            model: settings.model.clone(),
            api_key: api_key.to_string(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }
}

#[async_trait]
impl Generator for ChatClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let start = Instant::now();
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Generation(format!("request timed out after {:?}", start.elapsed()))
                } else {
                    Error::Generation(format!("request failed: {e}"))
                }
            })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| Error::Generation(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(Error::Generation(format!("HTTP {status}: {}", snippet(&text))));
        }
        debug!(elapsed = ?start.elapsed(), bytes = text.len(), "completion received");
        parse_completion(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_built_from_endpoint() {
        assert_eq!(chat_url("https://api.openai.com/v1"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(chat_url("http://localhost:8080/v1/"), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Xin chào"}},{"message":{"content":"other"}}]}"#;
        assert_eq!(parse_completion(body).expect("parse"), "Xin chào");
    }

    #[test]
    fn malformed_bodies_are_generation_errors() {
        for body in ["not json", r#"{"choices":[]}"#, r#"{"error":{"message":"bad key"}}"#] {
            let err = parse_completion(body).unwrap_err();
            assert!(matches!(err, Error::Generation(_)), "{body}");
            assert!(err.is_upstream());
        }
    }

    #[test]
    fn request_omits_unset_max_tokens() {
        let req = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            temperature: 0.0,
            max_tokens: None,
        };
        let v = serde_json::to_value(&req).expect("json");
        assert!(v.get("max_tokens").is_none());
        assert_eq!(v["messages"][0]["role"], "user");
    }
}
