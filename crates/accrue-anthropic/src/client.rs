// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.

use std::time::Duration;

use accrue_core::AccrueError;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

/// Sends Messages API requests, retrying once on transient statuses
/// (429, 500, 503, 529).
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl AnthropicClient {
    /// `base_url` is the API origin, e.g. `https://api.anthropic.com`.
    pub fn new(api_key: &str, api_version: &str, base_url: &str) -> Result<Self, AccrueError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| AccrueError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(api_version).map_err(|e| {
                AccrueError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        // The pipeline bounds each call with its own, shorter timeout.
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| provider_error("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sends a non-streaming request and returns the full response.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, AccrueError> {
        let mut retries_left = self.max_retries;
        loop {
            match self.send_once(request).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Transient { status, body } if retries_left > 0 => {
                    retries_left -= 1;
                    warn!(%status, body = %body, delay = ?self.retry_delay, "transient API status, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Attempt::Transient { status, body } | Attempt::Rejected { status, body } => {
                    return Err(AccrueError::Provider {
                        message: describe_failure(status, &body),
                        source: None,
                    });
                }
            }
        }
    }

    async fn send_once(&self, request: &MessageRequest) -> Result<Attempt, AccrueError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| provider_error("HTTP request failed", e))?;

        let status = response.status();
        debug!(%status, model = %request.model, "messages response received");
        let body = response
            .text()
            .await
            .map_err(|e| provider_error("failed to read response body", e))?;

        if status.is_success() {
            let parsed = serde_json::from_str(&body)
                .map_err(|e| provider_error("failed to parse API response", e))?;
            Ok(Attempt::Done(parsed))
        } else if is_transient(status) {
            Ok(Attempt::Transient { status, body })
        } else {
            Ok(Attempt::Rejected { status, body })
        }
    }
}

enum Attempt {
    Done(MessageResponse),
    Transient { status: StatusCode, body: String },
    Rejected { status: StatusCode, body: String },
}

fn provider_error<E>(context: &str, e: E) -> AccrueError
where
    E: std::error::Error + Send + Sync + 'static,
{
    AccrueError::Provider {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Prefers the structured error body; falls back to the raw status and text.
fn describe_failure(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => format!(
            "Anthropic API error ({}): {}",
            parsed.error.type_, parsed.error.message
        ),
        Err(_) => format!("API returned {status}: {body}"),
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::types::ApiMessage;

    fn client(server: &MockServer) -> AnthropicClient {
        AnthropicClient::new("test-api-key", "2023-06-01", &server.uri())
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    fn request() -> MessageRequest {
        MessageRequest {
            model: "claude-sonnet-4-20250514".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: "Hello".into(),
            }],
            system: None,
            max_tokens: 64,
        }
    }

    fn ok_body(id: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })
    }

    #[tokio::test]
    async fn sends_auth_headers_to_messages_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("msg_1", "Hi")))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).complete_message(&request()).await.unwrap();
        assert_eq!(response.id, "msg_1");
        assert_eq!(response.text(), "Hi");
    }

    #[tokio::test]
    async fn retries_once_on_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit_error", "message": "slow down"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("msg_retry", "ok")))
            .mount(&server)
            .await;

        let response = client(&server).complete_message(&request()).await.unwrap();
        assert_eq!(response.id, "msg_retry");
    }

    #[tokio::test]
    async fn gives_up_after_second_overload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = client(&server).complete_message(&request()).await.unwrap_err();
        assert!(err.to_string().contains("overloaded_error"), "got: {err}");
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "Bad model"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).complete_message(&request()).await.unwrap_err();
        assert!(matches!(err, AccrueError::Provider { .. }));
        assert!(err.to_string().contains("Bad model"));
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let c = AnthropicClient::new("k", "2023-06-01", "https://api.anthropic.com/").unwrap();
        assert_eq!(c.endpoint, "https://api.anthropic.com/v1/messages");
    }
}
