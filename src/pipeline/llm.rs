//! Inference client for an Ollama-compatible HTTP backend.
//!
//! Two endpoints are used:
//!
//! * `GET  /api/tags`     liveness probe, short timeout
//! * `POST /api/generate` one non-streaming completion
//!
//! Nothing here returns an error to the caller. A dead daemon, a timeout, a
//! 5xx or a body without a `response` field all become
//! [`InferenceReply::Unavailable`], and the chat service answers from its
//! canned replies instead.

use crate::error::DocChatError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceReply {
    Text(String),
    /// The backend could not answer; the string says why.
    Unavailable(String),
}

/// A model-serving backend.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Cheap reachability check.
    async fn is_available(&self) -> bool;

    /// Generate a reply to `prompt` with `model`.
    async fn generate(&self, prompt: &str, model: &str) -> InferenceReply;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP client for a local Ollama daemon.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    probe_timeout: Duration,
    generate_timeout: Duration,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        probe_timeout: Duration,
        generate_timeout: Duration,
    ) -> Result<Self, DocChatError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("doc2chat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DocChatError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            probe_timeout,
            generate_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn try_generate(&self, prompt: &str, model: &str) -> Result<String, String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .timeout(self.generate_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| describe(&e, self.generate_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("backend returned HTTP {status}"));
        }

        let timeout = self.generate_timeout;
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| format!("unreadable response: {}", describe(&e, timeout)))?;
        Ok(parsed.response)
    }
}

fn describe(e: &reqwest::Error, timeout: Duration) -> String {
    if e.is_timeout() {
        format!("timed out after {} ms", timeout.as_millis())
    } else if e.is_connect() {
        "cannot connect to backend".to_string()
    } else {
        e.to_string()
    }
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .http
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                debug!("Probe {} returned HTTP {}", url, resp.status());
                false
            }
            Err(e) => {
                debug!("Probe {} failed: {}", url, describe(&e, self.probe_timeout));
                false
            }
        }
    }

    async fn generate(&self, prompt: &str, model: &str) -> InferenceReply {
        let start = Instant::now();
        match self.try_generate(prompt, model).await {
            Ok(text) => {
                debug!(
                    "Model {} replied with {} chars in {:?}",
                    model,
                    text.len(),
                    start.elapsed()
                );
                InferenceReply::Text(text)
            }
            Err(reason) => {
                warn!("Generation with {} failed: {}", model, reason);
                InferenceReply::Unavailable(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{addr}")
    }

    fn client(base: &str) -> OllamaClient {
        OllamaClient::new(base, Duration::from_millis(500), Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn generate_sends_non_streaming_request() {
        let app = Router::new()
            .route("/api/tags", get(|| async { Json(json!({"models": []})) }))
            .route(
                "/api/generate",
                post(|Json(body): Json<Value>| async move {
                    let echo = format!("{}|{}|{}", body["model"], body["prompt"], body["stream"]);
                    Json(json!({"model": "llama3.2", "response": echo, "done": true}))
                }),
            );
        let ollama = client(&serve(app).await);

        assert!(ollama.is_available().await);
        assert_eq!(
            ollama.generate("hi", "llama3.2").await,
            InferenceReply::Text(r#""llama3.2"|"hi"|false"#.to_string())
        );
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let app = Router::new()
            .route(
                "/api/tags",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route(
                "/api/generate",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response() }),
            );
        let ollama = client(&serve(app).await);

        assert!(!ollama.is_available().await);
        match ollama.generate("hi", "llama3.2").await {
            InferenceReply::Unavailable(reason) => assert!(reason.contains("500"), "{reason}"),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_without_response_is_unavailable() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async { Json(json!({"error": "model not found"})) }),
        );
        let ollama = client(&serve(app).await);
        assert!(matches!(
            ollama.generate("hi", "missing").await,
            InferenceReply::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"response": "too late"}))
            }),
        );
        let ollama = OllamaClient::new(
            serve(app).await,
            Duration::from_millis(100),
            Duration::from_millis(200),
        )
        .unwrap();

        let start = Instant::now();
        match ollama.generate("hi", "llama3.2").await {
            InferenceReply::Unavailable(reason) => {
                assert!(reason.contains("timed out"), "{reason}")
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let ollama = client(&format!("http://{addr}"));
        assert!(!ollama.is_available().await);
        assert!(matches!(
            ollama.generate("hi", "llama3.2").await,
            InferenceReply::Unavailable(_)
        ));
    }
}
