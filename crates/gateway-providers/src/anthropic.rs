//! Anthropic Messages API adapter.
//!
//! System messages are lifted into the top-level `system` field; function
//! messages are replayed as user turns since the canonical chat shape has
//! no tool-use blocks.

use crate::http::{self, send_json};
use crate::openai::missing_credential;
use async_trait::async_trait;
use gateway_config::ProviderConfig;
use gateway_core::{
    ChatCompletionOutput, ChatMessage, ChatRole, GatewayError, GatewayResult, OperationInput,
    OperationOutput, OperationType, ProviderAdapter, ProviderKind, ProviderRawResult,
    TextGenerationOutput, Usage,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// API version sent in `anthropic-version` when none is configured
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;

const OPERATIONS: &[OperationType] =
    &[OperationType::TextGeneration, OperationType::ChatCompletion];

/// Adapter for the Anthropic Messages API
pub struct AnthropicAdapter {
    base_url: String,
    api_key: SecretString,
    api_version: String,
    models: BTreeMap<OperationType, String>,
    client: Client,
}

impl std::fmt::Debug for AnthropicAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicAdapter")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl AnthropicAdapter {
    /// Create the adapter
    ///
    /// # Errors
    /// Returns a validation error if the API key is missing
    pub fn new(config: &ProviderConfig, default_timeout: Duration) -> GatewayResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| missing_credential(ProviderKind::Anthropic, "api_key"))?;
        Ok(Self {
            base_url: config
                .endpoint()
                .unwrap_or_else(|| "https://api.anthropic.com/v1".to_string()),
            api_key,
            api_version: config
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            models: config.models.clone(),
            client: http::build_client(config.timeout.unwrap_or(default_timeout))?,
        })
    }

    fn build_request(
        &self,
        input: &OperationInput,
        model: String,
    ) -> GatewayResult<MessagesRequest> {
        match input {
            OperationInput::TextGeneration(r) => Ok(MessagesRequest {
                model,
                max_tokens: r.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                system: None,
                messages: vec![WireMessage {
                    role: "user",
                    content: r.prompt.clone(),
                }],
                temperature: r.temperature,
                top_p: r.top_p,
                stop_sequences: r.stop.clone(),
            }),
            OperationInput::ChatCompletion(r) => {
                let (system, messages) = split_system(&r.messages);
                Ok(MessagesRequest {
                    model,
                    max_tokens: r.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                    system,
                    messages,
                    temperature: r.temperature,
                    top_p: r.top_p,
                    stop_sequences: r.stop.clone(),
                })
            }
            other => Err(http::unsupported(ProviderKind::Anthropic, other.operation_type())),
        }
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn supported_operations(&self) -> &[OperationType] {
        OPERATIONS
    }

    async fn execute(
        &self,
        input: &OperationInput,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let operation = input.operation_type();
        let model = input
            .model()
            .or_else(|| self.models.get(&operation).map(String::as_str))
            .unwrap_or(DEFAULT_MODEL)
            .to_string();
        let body = self.build_request(input, model)?;
        debug!(
            provider = %self.kind(),
            operation = %operation,
            model = %body.model,
            "Sending request"
        );

        let request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", &self.api_version)
            .json(&body);
        let (response, raw): (MessagesResponse, Value) =
            send_json(self.kind(), request, timeout).await?;

        let text: String = response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        if response.content.is_empty() {
            return Err(GatewayError::provider(
                self.kind(),
                "Response contained no content",
                None,
                false,
            ));
        }
        let usage = response
            .usage
            .map(|u| Usage::split(u.input_tokens, u.output_tokens));

        let output = match operation {
            OperationType::TextGeneration => {
                OperationOutput::TextGeneration(TextGenerationOutput { text, usage })
            }
            _ => OperationOutput::ChatCompletion(ChatCompletionOutput {
                message: ChatMessage::assistant(text),
                usage,
            }),
        };
        Ok(ProviderRawResult::new(output, raw).with_usage(usage))
    }
}

/// Lift system turns out of the conversation
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<WireMessage>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .collect();
    let conversation = messages
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .map(|m| WireMessage {
            role: if m.role == ChatRole::Assistant { "assistant" } else { "user" },
            content: match (&m.role, &m.name) {
                (ChatRole::Function, Some(name)) => format!("[{name} result]\n{}", m.content),
                _ => m.content.clone(),
            },
        })
        .collect();
    ((!system.is_empty()).then(|| system.join("\n\n")), conversation)
}

// ===== API Types =====

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{ChatCompletionRequest, TextGenerationRequest};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn adapter(server: &MockServer) -> AnthropicAdapter {
        let config = ProviderConfig::new(ProviderKind::Anthropic)
            .with_api_key("ant-key")
            .with_base_url(server.uri());
        AnthropicAdapter::new(&config, TIMEOUT).expect("adapter")
    }

    #[test]
    fn test_system_messages_lifted() {
        let messages = vec![
            ChatMessage::system("Be brief."),
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello"),
        ];
        let (system, conversation) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("Be brief."));
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[0].role, "user");
        assert_eq!(conversation[1].role, "assistant");
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "ant-key"))
            .and(header("anthropic-version", DEFAULT_API_VERSION))
            .and(body_partial_json(json!({"system": "Be brief.", "max_tokens": 1024})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Hello!"}],
                "usage": {"input_tokens": 12, "output_tokens": 3}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatCompletionRequest::new(vec![
            ChatMessage::system("Be brief."),
            ChatMessage::user("Hi"),
        ]);
        let result = adapter(&server)
            .execute(&OperationInput::ChatCompletion(request), TIMEOUT)
            .await
            .expect("success");

        let OperationOutput::ChatCompletion(output) = result.output else {
            panic!("wrong output");
        };
        assert_eq!(output.message.content, "Hello!");
        assert_eq!(result.usage, Some(Usage::split(12, 3)));
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .execute(
                &OperationInput::TextGeneration(TextGenerationRequest::new("Hi")),
                TIMEOUT,
            )
            .await
            .expect_err("overloaded");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Overloaded"));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .execute(
                &OperationInput::TextGeneration(TextGenerationRequest::new("Hi")),
                TIMEOUT,
            )
            .await
            .expect_err("unauthorized");
        assert!(matches!(err, GatewayError::Authentication { .. }));
    }
}
