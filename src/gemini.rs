//! Gemini API client used as the inference provider
//!
//! Uses a long-lived reqwest::Client for connection pooling. A 503 or 429
//! from the API is reported as `TransientUnavailable` so the caller's retry
//! policy can pick it up; every other failure is fatal for the attempt.
//!
//! The API key travels in the `x-goog-api-key` header and never in the URL,
//! so transport errors cannot echo it back to callers.

use crate::error::AdvisoryError;
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const API_ROOT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Text-in, text-out language model
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: &str) -> Result<Self> {
        Self::with_base_url(api_key, format!("{}/{}:generateContent", API_ROOT, model))
    }

    /// Point the client at an arbitrary `generateContent` endpoint.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl InferenceProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(AdvisoryError::LlmError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
        };

        debug!(prompt_len = prompt.len(), "Calling Gemini API");

        let response = self
            .client
            .post(&self.base_url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Gemini API request failed: {}", e);
                AdvisoryError::LlmError(format!("Gemini API error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &error_text));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AdvisoryError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        let answer = extract_text(gemini_response)?;

        info!(reply_len = answer.len(), "Gemini response received");

        Ok(answer)
    }
}

/// Map a non-success HTTP status to the error taxonomy.
fn classify_failure(status: StatusCode, body: &str) -> AdvisoryError {
    if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::TOO_MANY_REQUESTS {
        AdvisoryError::TransientUnavailable(format!("Gemini returned {}", status))
    } else {
        error!(%status, "Gemini API error response: {}", body);
        AdvisoryError::LlmError(format!("Gemini API error {}: {}", status, body))
    }
}

fn extract_text(response: GeminiResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AdvisoryError::LlmError("No response from Gemini API".to_string()))?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        debug!(finish_reason = reason, "Gemini candidate finished");
    }

    candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| AdvisoryError::LlmError("Empty response from Gemini".to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::post,
        Json, Router,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "Analyze these bank transactions".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["contents"][0]["parts"][0]["text"],
            "Analyze these bank transactions"
        );
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_extract_text() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "{\"total_income\": 5}" }], "role": "model" },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 10 }
        }"#;
        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(response).unwrap(), "{\"total_income\": 5}");
    }

    #[test]
    fn test_empty_candidates_is_llm_error() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            extract_text(response),
            Err(AdvisoryError::LlmError(_))
        ));
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_failure(StatusCode::SERVICE_UNAVAILABLE, "overloaded").is_transient());
        assert!(classify_failure(StatusCode::TOO_MANY_REQUESTS, "quota").is_transient());
        assert!(!classify_failure(StatusCode::UNAUTHORIZED, "bad key").is_transient());
        assert!(!classify_failure(StatusCode::BAD_REQUEST, "bad").is_transient());
        assert!(!classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom").is_transient());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = GeminiClient::new(String::new(), "gemini-1.5-flash").unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(err.to_string().to_lowercase().contains("gemini_api_key"));
    }

    #[tokio::test]
    async fn test_generate_against_local_server() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/generate",
            post(move |headers: HeaderMap| {
                let counter = counter.clone();
                async move {
                    let keyed = headers
                        .get(API_KEY_HEADER)
                        .map_or(false, |v| v == "test-key");
                    if !keyed {
                        (AxumStatus::UNAUTHORIZED, Json(serde_json::json!({})))
                    } else if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (AxumStatus::SERVICE_UNAVAILABLE, Json(serde_json::json!({})))
                    } else {
                        (
                            AxumStatus::OK,
                            Json(serde_json::json!({
                                "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
                            })),
                        )
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client =
            GeminiClient::with_base_url("test-key".into(), format!("http://{}/generate", addr))
                .unwrap();

        let first = client.generate("prompt").await;
        assert!(matches!(first, Err(AdvisoryError::TransientUnavailable(_))));

        let second = client.generate("prompt").await.unwrap();
        assert_eq!(second, "ok");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_api_key() {
        // nothing listens on port 1, so the request fails before any response
        let client = GeminiClient::with_base_url(
            "SECRET-KEY-123".into(),
            "http://127.0.0.1:1/generate".into(),
        )
        .unwrap();

        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, AdvisoryError::LlmError(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));

        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8_lossy(&bytes);
        assert!(body.contains("error"));
        assert!(!body.contains("SECRET-KEY-123"));
    }
}
