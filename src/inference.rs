use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::error::ServiceError;

/// Largest decoded image accepted for analysis (4 MiB).
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

pub const ACCEPTED_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Fixed instruction sent alongside every image.
pub const IDENTIFICATION_PROMPT: &str = "You are an expert AI object identifier.\n\
Analyze the provided image and identify the objects present.\n\
Respond with a list of objects identified in the image.";

/// DataUriError
///
/// Why an uploaded `data:` URI was refused. The messages are shown to the user as-is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("Image data URI cannot be empty.")]
    Empty,
    #[error("Image data URI must look like 'data:<mimetype>;base64,<encoded_data>'.")]
    Malformed,
    #[error("Unsupported image type '{0}'. Upload a PNG, JPEG, WEBP or GIF image.")]
    UnsupportedType(String),
    #[error("Image data is not valid base64.")]
    InvalidBase64,
    #[error("Image is too large. Upload an image smaller than 4MB.")]
    TooLarge,
}

/// PhotoDataUri
///
/// A validated `data:<mime>;base64,<payload>` image, ready to be inlined in a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoDataUri {
    pub mime_type: String,
    /// Base64 payload exactly as uploaded.
    pub data: String,
}

impl PhotoDataUri {
    pub fn parse(raw: &str) -> Result<Self, DataUriError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DataUriError::Empty);
        }

        let rest = raw.strip_prefix("data:").ok_or(DataUriError::Malformed)?;
        let (meta, data) = rest.split_once(',').ok_or(DataUriError::Malformed)?;
        let mime_type = meta
            .strip_suffix(";base64")
            .ok_or(DataUriError::Malformed)?
            .to_ascii_lowercase();

        if !ACCEPTED_IMAGE_TYPES.contains(&mime_type.as_str()) {
            return Err(DataUriError::UnsupportedType(mime_type));
        }

        let decoded = STANDARD
            .decode(data)
            .map_err(|_| DataUriError::InvalidBase64)?;
        if decoded.is_empty() {
            return Err(DataUriError::Empty);
        }
        if decoded.len() > MAX_IMAGE_BYTES {
            return Err(DataUriError::TooLarge);
        }

        Ok(Self {
            mime_type,
            data: data.to_string(),
        })
    }
}

// 1. ObjectIdentifier Contract
/// ObjectIdentifier
///
/// The remote vision model, reduced to the one question the console asks it.
#[async_trait]
pub trait ObjectIdentifier: Send + Sync {
    /// Returns the names of the objects visible in `photo`. An empty list is a valid answer.
    async fn identify(&self, photo: &PhotoDataUri) -> Result<Vec<String>, ServiceError>;
}

pub type IdentifierState = Arc<dyn ObjectIdentifier>;

// 2. The Real Implementation (Gemini generateContent)
/// GeminiClient
///
/// Calls `models/{model}:generateContent` with the fixed prompt and the image as inline data,
/// constraining the answer to `{"objects": [string]}` through a response schema.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct IdentifiedObjects {
    objects: Vec<String>,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn request_body(photo: &PhotoDataUri) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": IDENTIFICATION_PROMPT },
                    { "inline_data": { "mime_type": photo.mime_type, "data": photo.data } }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "objects": { "type": "ARRAY", "items": { "type": "STRING" } }
                    },
                    "required": ["objects"]
                }
            }
        })
    }
}

/// parse_generation
///
/// Pulls the structured `{"objects": [...]}` answer out of a `generateContent` response body.
fn parse_generation(body: GenerateResponse) -> Result<Vec<String>, ServiceError> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .ok_or_else(|| ServiceError::Malformed("model returned no candidates".to_string()))?;

    serde_json::from_str::<IdentifiedObjects>(text.trim())
        .map(|parsed| {
            parsed
                .objects
                .into_iter()
                .map(|object| object.trim().to_string())
                .filter(|object| !object.is_empty())
                .collect()
        })
        .map_err(|e| ServiceError::Malformed(format!("model output did not match schema: {}", e)))
}

#[async_trait]
impl ObjectIdentifier for GeminiClient {
    async fn identify(&self, photo: &PhotoDataUri) -> Result<Vec<String>, ServiceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(photo))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(%status, model = %self.model, "generateContent failed");
            return Err(ServiceError::Upstream {
                status: status.as_u16(),
                message: if message.is_empty() {
                    status.to_string()
                } else {
                    message
                },
            });
        }

        let body = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        parse_generation(body)
    }
}

// 3. The Mock Implementation (For Tests)
/// MockObjectIdentifier
///
/// Returns a canned object list, or a simulated failure.
#[derive(Clone, Default)]
pub struct MockObjectIdentifier {
    pub objects: Vec<String>,
    pub should_fail: bool,
}

impl MockObjectIdentifier {
    pub fn returning(objects: &[&str]) -> Self {
        Self {
            objects: objects.iter().map(|o| o.to_string()).collect(),
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            objects: vec![],
            should_fail: true,
        }
    }
}

#[async_trait]
impl ObjectIdentifier for MockObjectIdentifier {
    async fn identify(&self, _photo: &PhotoDataUri) -> Result<Vec<String>, ServiceError> {
        if self.should_fail {
            return Err(ServiceError::Upstream {
                status: 503,
                message: "Mock Model Error: Simulation requested".to_string(),
            });
        }
        Ok(self.objects.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: serde_json::Value) -> GenerateResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn extracts_objects_from_candidate_text() {
        let body = response(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"objects\": [\"cat\", \" sofa \", \"\"]}" }] }
            }]
        }));
        assert_eq!(parse_generation(body).unwrap(), vec!["cat", "sofa"]);
    }

    #[test]
    fn missing_candidates_is_malformed() {
        let body = response(serde_json::json!({ "candidates": [] }));
        assert!(matches!(parse_generation(body), Err(ServiceError::Malformed(_))));
    }

    #[test]
    fn prose_answer_is_malformed() {
        let body = response(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "I see a cat." }] } }]
        }));
        assert!(matches!(parse_generation(body), Err(ServiceError::Malformed(_))));
    }

    #[test]
    fn request_inlines_the_image() {
        let photo = PhotoDataUri {
            mime_type: "image/png".to_string(),
            data: "aGVsbG8=".to_string(),
        };
        let body = GeminiClient::request_body(&photo);
        assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["data"], "aGVsbG8=");
        assert_eq!(body["contents"][0]["parts"][0]["text"], IDENTIFICATION_PROMPT);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }
}
