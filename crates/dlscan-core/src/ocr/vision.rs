//! Google Cloud Vision `images:annotate` client.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::TextDetector;
use super::auth::{AccessToken, Credentials, fetch_access_token};

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: [ImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    image: ImageContent,
    features: [Feature<'a>; 1],
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageResponse {
    #[serde(default, rename = "textAnnotations")]
    text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

/// Pull the transcript out of an annotate response.
///
/// The first text annotation holds the full text of the image; the rest are
/// individual words.
pub(crate) fn transcript_from_response(response: AnnotateResponse) -> Result<String, OcrError> {
    let Some(image) = response.responses.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(status) = image.error.filter(|s| !s.message.is_empty()) {
        return Err(OcrError::Service(status.message));
    }
    Ok(image
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .unwrap_or_default())
}

/// Message for a non-success HTTP answer.
fn service_error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Vision request failed ({status}): {body}"))
}

/// Vision API text-detection client.
pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
}

impl VisionClient {
    /// Create a client from configuration, resolving credentials.
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let credentials = Credentials::resolve(config)?;
        Self::with_credentials(
            &config.endpoint,
            credentials,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Create a client with explicit credentials.
    pub fn with_credentials(
        endpoint: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, OcrError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            credentials,
            token: Mutex::new(None),
        })
    }

    async fn bearer_token(&self, key: &super::ServiceAccountKey) -> Result<String, OcrError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.token.clone());
        }
        let token = fetch_access_token(&self.http, key).await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }
}

impl TextDetector for VisionClient {
    async fn detect(&self, image: &[u8]) -> Result<String, OcrError> {
        let body = AnnotateRequest {
            requests: [ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: [Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        request = match &self.credentials {
            Credentials::ApiKey(key) => request.query(&[("key", key.as_str())]),
            Credentials::ServiceAccount(sa) => request.bearer_auth(self.bearer_token(sa).await?),
        };

        debug!("Sending {} bytes to {}", image.len(), self.endpoint);
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        trace!("Vision response ({status}): {text}");

        if !status.is_success() {
            return Err(OcrError::Service(service_error_message(status, &text)));
        }

        let parsed: AnnotateResponse = serde_json::from_str(&text)
            .map_err(|e| OcrError::InvalidResponse(e.to_string()))?;
        let transcript = transcript_from_response(parsed)?;
        debug!("Vision returned {} characters", transcript.len());
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String, OcrError> {
        transcript_from_response(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_first_annotation_is_the_transcript() {
        let json = r#"{"responses": [{"textAnnotations": [
            {"locale": "en", "description": "1 SMITH\n2 JOHN\n"},
            {"description": "SMITH"}
        ]}]}"#;
        assert_eq!(parse(json).unwrap(), "1 SMITH\n2 JOHN\n");
    }

    #[test]
    fn test_no_text_is_empty() {
        assert_eq!(parse(r#"{"responses": [{}]}"#).unwrap(), "");
        assert_eq!(parse(r#"{}"#).unwrap(), "");
    }

    #[test]
    fn test_error_message_is_a_service_error() {
        let json = r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#;
        match parse(json) {
            Err(OcrError::Service(msg)) => assert_eq!(msg, "Bad image data."),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_http_error_message() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid."}}"#;
        assert_eq!(
            service_error_message(reqwest::StatusCode::FORBIDDEN, body),
            "API key not valid."
        );
        assert!(
            service_error_message(reqwest::StatusCode::BAD_GATEWAY, "oops")
                .contains("502")
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = AnnotateRequest {
            requests: [ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode([1u8, 2, 3]),
                },
                features: [Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "requests": [{
                    "image": {"content": "AQID"},
                    "features": [{"type": "TEXT_DETECTION"}]
                }]
            })
        );
    }
}
