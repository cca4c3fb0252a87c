use std::future::Future;
use std::sync::Mutex;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("LLM API returned error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("No response from LLM")]
    EmptyResponse,
    #[error("LLM error: {0}")]
    Other(String),
}

/// A text-in, text-out language model.
pub trait LlmClient: Send + Sync {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

// ── Gemini ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    #[serde(default)]
    text: String,
}

impl GeminiResponse {
    /// Text parts of the first candidate, concatenated.
    fn into_text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, endpoint: Option<String>) -> Self {
        Self {
            api_key,
            endpoint: endpoint
                .unwrap_or_else(|| GEMINI_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            client: Client::new(),
        }
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

impl LlmClient for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.url(model))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini API request failed: {}", e);
                LlmError::Request(e)
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Gemini API error: {} - {}", status, body);
            return Err(LlmError::Status { status, body });
        }

        let parsed: GeminiResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            LlmError::Request(e)
        })?;

        parsed.into_text().ok_or(LlmError::EmptyResponse)
    }
}

// ── Mock ──────────────────────────────────────────────────────────────────────

/// Canned model for tests. Records every `(model, prompt)` it is given.
pub struct MockLlm {
    reply: Result<String, String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockLlm {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlm {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((model.to_string(), prompt.to_string()));
        }
        self.reply.clone().map_err(LlmError::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wraps_prompt_in_single_text_part() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "献立を提案してください".into(),
                }],
            }],
        };
        let json = serde_json::to_value(request).unwrap();
        assert_eq!(json, serde_json::json!({"contents":[{"parts":[{"text":"献立を提案してください"}]}]}));
    }

    #[test]
    fn url_names_model() {
        let client = GeminiClient::new("k".into(), Some("http://localhost:9000/v1beta/".into()));
        assert_eq!(
            client.url("gemini-2.5-flash"),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent"
        );
        let client = GeminiClient::new("k".into(), None);
        assert!(client.url("gemini-1.5-flash").starts_with(GEMINI_ENDPOINT));
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"レシピ名: 肉じゃが\n"},{"text":"使用食材: じゃがいも"}],"role":"model"}},
                {"content":{"parts":[{"text":"ignored"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "レシピ名: 肉じゃが\n使用食材: じゃがいも");
    }

    #[test]
    fn blocked_response_has_no_text() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#,
        )
        .unwrap();
        assert!(response.into_text().is_none());
        let response: GeminiResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(response.into_text().is_none());
    }

    #[tokio::test]
    async fn mock_records_calls() {
        let llm = MockLlm::replying("肉じゃが");
        assert_eq!(llm.generate("gemini-2.0-flash", "p").await.unwrap(), "肉じゃが");
        assert_eq!(llm.calls(), [("gemini-2.0-flash".to_string(), "p".to_string())]);

        let llm = MockLlm::failing("quota exceeded");
        assert!(matches!(llm.generate("m", "p").await, Err(LlmError::Other(m)) if m == "quota exceeded"));
    }
}
