use std::future::Future;

use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("OCR service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// Abstraction over an OCR service.
/// Implementations accept PNG image bytes and return the full recognised text,
/// or an empty string when the image contains none.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, png_bytes: &[u8]) -> impl Future<Output = Result<String, OcrError>> + Send;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string regardless of the image.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    async fn recognize(&self, _png_bytes: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

// ── Google Cloud Vision backend ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

/// Text detection through the Cloud Vision `images:annotate` REST endpoint.
#[derive(Debug, Clone)]
pub struct VisionRecognizer {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl VisionRecognizer {
    pub fn new(api_key: String, endpoint: Option<String>) -> Self {
        Self {
            api_key,
            endpoint: endpoint.unwrap_or_else(|| VISION_ENDPOINT.to_string()),
            client: Client::new(),
        }
    }

    fn build_request(png_bytes: &[u8]) -> AnnotateRequest {
        AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: general_purpose::STANDARD.encode(png_bytes),
                },
                features: vec![Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        }
    }

    /// The first annotation holds the whole text block; the rest are single words.
    fn full_text(response: AnnotateResponse) -> Result<String, OcrError> {
        let Some(first) = response.responses.into_iter().next() else {
            return Ok(String::new());
        };
        if let Some(err) = first.error.filter(|e| !e.message.is_empty()) {
            return Err(OcrError::Engine(err.message));
        }
        Ok(first
            .text_annotations
            .into_iter()
            .next()
            .map(|a| a.description)
            .unwrap_or_default())
    }
}

impl OcrBackend for VisionRecognizer {
    async fn recognize(&self, png_bytes: &[u8]) -> Result<String, OcrError> {
        let request = Self::build_request(png_bytes);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Vision API request failed: {}", e);
                OcrError::Request(e)
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Vision API error: {} - {}", status, body);
            return Err(OcrError::Status { status, body });
        }

        let parsed: AnnotateResponse = response.json().await?;
        Self::full_text(parsed)
    }
}
