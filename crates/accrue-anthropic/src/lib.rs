// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reference [`DraftGenerator`] backed by the Anthropic Messages API.
//!
//! The instruction template goes in the system prompt and the aggregated
//! context is the single user message.

pub mod client;
pub mod types;

use accrue_config::model::AnthropicConfig;
use accrue_core::types::{AdapterType, HealthStatus};
use accrue_core::{AccrueError, DraftGenerator, DraftRequest, PluginAdapter};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

/// Rough chars-per-token ratio used to size `max_tokens` from a char bound.
const CHARS_PER_TOKEN: usize = 3;

pub struct AnthropicGenerator {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
}

impl AnthropicGenerator {
    /// Builds the generator from config, falling back to `ANTHROPIC_API_KEY`
    /// when no key is configured.
    pub fn new(config: &AnthropicConfig) -> Result<Self, AccrueError> {
        let api_key = resolve_api_key(
            config.api_key.as_deref(),
            std::env::var("ANTHROPIC_API_KEY").ok(),
        )?;
        let client = AnthropicClient::new(&api_key, &config.api_version, &config.base_url)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: AnthropicClient, config: &AnthropicConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    fn to_message_request(&self, request: &DraftRequest) -> MessageRequest {
        let wanted = u32::try_from(request.max_chars / CHARS_PER_TOKEN + 1).unwrap_or(u32::MAX);
        MessageRequest {
            model: self.model.clone(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: request.context.clone(),
            }],
            system: Some(request.prompt.clone()),
            max_tokens: wanted.min(self.max_tokens),
        }
    }
}

fn resolve_api_key(configured: Option<&str>, env: Option<String>) -> Result<String, AccrueError> {
    match configured.filter(|k| !k.is_empty()) {
        Some(key) => Ok(key.to_string()),
        None => env.filter(|k| !k.is_empty()).ok_or_else(|| {
            AccrueError::Config(
                "Anthropic API key not found. Set anthropic.api_key in config or the ANTHROPIC_API_KEY environment variable."
                    .into(),
            )
        }),
    }
}

#[async_trait]
impl PluginAdapter for AnthropicGenerator {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<HealthStatus, AccrueError> {
        // Avoids spending tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AccrueError> {
        debug!("anthropic generator shutting down");
        Ok(())
    }
}

#[async_trait]
impl DraftGenerator for AnthropicGenerator {
    async fn generate(&self, request: DraftRequest) -> Result<String, AccrueError> {
        let api_request = self.to_message_request(&request);
        let response = self.client.complete_message(&api_request).await?;
        debug!(
            deliverable_id = %request.deliverable_id,
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "draft generated"
        );
        if response.stop_reason.as_deref() == Some("max_tokens") {
            warn!(deliverable_id = %request.deliverable_id, "draft hit the token limit");
        }
        let text = response.text();
        if text.trim().is_empty() {
            return Err(AccrueError::Provider {
                message: format!("response {} contained no text", response.id),
                source: None,
            });
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use accrue_core::DeliverableType;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn draft_request() -> DraftRequest {
        DraftRequest {
            deliverable_id: "d1".into(),
            deliverable_type: DeliverableType::Digest,
            prompt: "Write a digest.".into(),
            context: "=== source: slack/C1 ===\n[2026-03-02T08:00:00.000000Z] (message) shipped".into(),
            max_chars: 3000,
        }
    }

    fn generator(server: &MockServer) -> AnthropicGenerator {
        let config = AnthropicConfig {
            base_url: server.uri(),
            ..AnthropicConfig::default()
        };
        let client = AnthropicClient::new("test-key", &config.api_version, &config.base_url)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10));
        AnthropicGenerator::with_client(client, &config)
    }

    #[tokio::test]
    async fn prompt_is_system_and_context_is_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(serde_json::json!({
                "system": "Write a digest.",
                "max_tokens": 1001,
                "messages": [{"role": "user", "content": draft_request().context}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [{"type": "text", "text": "Digest body"}],
                "model": "claude-sonnet-4-20250514",
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 40, "output_tokens": 3}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = generator(&server).generate(draft_request()).await.unwrap();
        assert_eq!(text, "Digest body");
    }

    #[tokio::test]
    async fn empty_responses_are_provider_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_empty",
                "type": "message",
                "role": "assistant",
                "content": [],
                "model": "claude-sonnet-4-20250514",
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 40, "output_tokens": 0}
            })))
            .mount(&server)
            .await;

        let err = generator(&server).generate(draft_request()).await.unwrap_err();
        assert!(err.to_string().contains("no text"));
    }

    #[test]
    fn configured_key_wins_over_env() {
        assert_eq!(
            resolve_api_key(Some("cfg"), Some("env".into())).unwrap(),
            "cfg"
        );
        assert_eq!(resolve_api_key(None, Some("env".into())).unwrap(), "env");
        assert_eq!(resolve_api_key(Some(""), Some("env".into())).unwrap(), "env");
        assert!(matches!(
            resolve_api_key(None, None).unwrap_err(),
            AccrueError::Config(_)
        ));
    }
}
