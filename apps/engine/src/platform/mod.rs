//! HTTP client for the remote capability platform — the single point of entry
//! for every remote call the engine makes in its default configuration.
//!
//! One client implements all five gateway traits (probe, identity, blobs,
//! records, inference) against the platform's REST surface. Transport-level
//! retry with exponential backoff exists only here, on the inference call
//! (429/5xx); the orchestration core above never retries anything.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::gateway::{BlobHandle, BlobStore, Identity, Inference, PlatformProbe, RecordStore};
use crate::models::User;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_SCORE_RETRIES: u32 = 3;

/// Client for one platform origin, authenticated by a bearer token.
#[derive(Clone)]
pub struct PlatformClient {
    http: Client,
    base_url: String,
    token: String,
}

impl PlatformClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header("authorization", format!("Bearer {}", self.token))
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct KvWrite<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct KvValue {
    value: String,
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    path: &'a str,
    instructions: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl ScoreResponse {
    /// Text of the first text block, if any.
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct PlatformError {
    error: PlatformErrorBody,
}

#[derive(Debug, Deserialize)]
struct PlatformErrorBody {
    message: String,
}

/// Pulls the platform's error message out of a failed response body, falling
/// back to the raw body text.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<PlatformError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    format!("status {status}: {message}")
}

// ── Capability implementations ──────────────────────────────────────────────

#[async_trait]
impl PlatformProbe for PlatformClient {
    async fn check(&self) -> Result<(), AppError> {
        let response = self
            .http
            .get(self.url("/api/status"))
            .send()
            .await
            .map_err(|e| AppError::PlatformUnavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::PlatformUnavailable(error_message(response).await))
        }
    }
}

#[async_trait]
impl Identity for PlatformClient {
    async fn is_signed_in(&self) -> Result<bool, AppError> {
        let response = self
            .authorized(self.http.get(self.url("/api/auth/whoami")))
            .send()
            .await
            .map_err(|e| AppError::PlatformUnavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            _ => Err(AppError::Identity(error_message(response).await)),
        }
    }

    async fn current_user(&self) -> Result<User, AppError> {
        let response = self
            .authorized(self.http.get(self.url("/api/auth/whoami")))
            .send()
            .await
            .map_err(|e| AppError::PlatformUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Identity(error_message(response).await));
        }

        response
            .json::<User>()
            .await
            .map_err(|e| AppError::Identity(format!("malformed user payload: {e}")))
    }

    async fn sign_in(&self) -> Result<(), AppError> {
        let response = self
            .authorized(self.http.post(self.url("/api/auth/session")))
            .send()
            .await
            .map_err(|e| AppError::PlatformUnavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Identity(error_message(response).await))
        }
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let response = self
            .authorized(self.http.delete(self.url("/api/auth/session")))
            .send()
            .await
            .map_err(|e| AppError::PlatformUnavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Identity(error_message(response).await))
        }
    }
}

#[async_trait]
impl BlobStore for PlatformClient {
    async fn upload(&self, bytes: Bytes, name: &str) -> Result<BlobHandle, AppError> {
        let response = self
            .authorized(self.http.post(self.url("/api/fs/upload")))
            .query(&[("name", name)])
            .header("content-type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(error_message(response).await));
        }

        let handle: BlobHandle = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("malformed upload response: {e}")))?;

        debug!(path = %handle.path, size = handle.size, "uploaded blob");
        Ok(handle)
    }

    async fn read(&self, path: &str) -> Result<Bytes, AppError> {
        let response = self
            .authorized(self.http.get(self.url("/api/fs/read")))
            .query(&[("path", path)])
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(error_message(response).await));
        }

        response
            .bytes()
            .await
            .map_err(|e| AppError::Storage(format!("read {path}: {e}")))
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        let response = self
            .authorized(self.http.delete(self.url("/api/fs")))
            .query(&[("path", path)])
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Storage(error_message(response).await))
        }
    }

    async fn list(&self, dir: &str) -> Result<Vec<BlobHandle>, AppError> {
        let response = self
            .authorized(self.http.get(self.url("/api/fs/list")))
            .query(&[("dir", dir)])
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(error_message(response).await));
        }

        response
            .json::<Vec<BlobHandle>>()
            .await
            .map_err(|e| AppError::Storage(format!("malformed list response: {e}")))
    }
}

#[async_trait]
impl RecordStore for PlatformClient {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let response = self
            .authorized(self.http.get(self.url("/api/kv")))
            .query(&[("key", key)])
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let value: KvValue = response
                    .json()
                    .await
                    .map_err(|e| AppError::Storage(format!("malformed kv response: {e}")))?;
                Ok(Some(value.value))
            }
            _ => Err(AppError::Storage(error_message(response).await)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let response = self
            .authorized(self.http.put(self.url("/api/kv")))
            .json(&KvWrite { key, value })
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Storage(error_message(response).await))
        }
    }

    async fn flush(&self) -> Result<(), AppError> {
        let response = self
            .authorized(self.http.delete(self.url("/api/kv")))
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Storage(error_message(response).await))
        }
    }
}

#[async_trait]
impl Inference for PlatformClient {
    /// Submits the stored document and instruction template for scoring.
    /// Retries on 429 and 5xx with exponential backoff; all other failures
    /// surface immediately.
    async fn score(&self, blob_path: &str, instructions: &str) -> Result<String, AppError> {
        let request_body = ScoreRequest {
            path: blob_path,
            instructions,
        };

        let mut last_error: Option<AppError> = None;

        for attempt in 0..MAX_SCORE_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "score call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .authorized(self.http.post(self.url("/api/ai/score")))
                .json(&request_body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AppError::Inference(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                last_error = Some(AppError::Inference(error_message(response).await));
                continue;
            }

            if !status.is_success() {
                return Err(AppError::Inference(error_message(response).await));
            }

            let score: ScoreResponse = response
                .json()
                .await
                .map_err(|e| AppError::Inference(format!("malformed score response: {e}")))?;

            if let Some(usage) = &score.usage {
                debug!(
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "score call succeeded"
                );
            }

            let text = score
                .text()
                .ok_or_else(|| AppError::Inference("score response had no text".to_string()))?;

            return Ok(strip_json_fences(text).to_string());
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Inference("score retries exhausted".to_string())))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences the model sometimes wraps
/// its payload in, leaving parsing to the caller.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let stripped = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));

    match stripped {
        Some(inner) => {
            let inner = inner.trim_start();
            inner
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or(inner)
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"overallScore\": 70}\n```";
        assert_eq!(strip_json_fences(input), "{\"overallScore\": 70}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"overallScore\": 70}\n```";
        assert_eq!(strip_json_fences(input), "{\"overallScore\": 70}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"overallScore\": 70}";
        assert_eq!(strip_json_fences(input), "{\"overallScore\": 70}");
    }

    #[test]
    fn test_score_response_text_skips_non_text_blocks() {
        let response = ScoreResponse {
            content: vec![
                ContentBlock {
                    block_type: "thinking".to_string(),
                    text: None,
                },
                ContentBlock {
                    block_type: "text".to_string(),
                    text: Some("{}".to_string()),
                },
            ],
            usage: None,
        };
        assert_eq!(response.text(), Some("{}"));
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let client = PlatformClient::new("https://platform.test/", "token");
        assert_eq!(client.url("/api/status"), "https://platform.test/api/status");
    }
}
