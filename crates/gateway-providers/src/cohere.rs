//! Cohere adapter.
//!
//! Text generation and chat share the `/chat` endpoint: a bare prompt is sent
//! as a single message with no history.

use crate::http::{self, send_json};
use crate::openai::missing_credential;
use async_trait::async_trait;
use gateway_config::ProviderConfig;
use gateway_core::{
    ChatCompletionOutput, ChatMessage, ChatRole, EmbeddingOutput, GatewayError, GatewayResult,
    OperationInput, OperationOutput, OperationType, ProviderAdapter, ProviderKind,
    ProviderRawResult, TextGenerationOutput, Usage,
};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

const OPERATIONS: &[OperationType] = &[
    OperationType::TextGeneration,
    OperationType::ChatCompletion,
    OperationType::Embedding,
];

/// Adapter for the Cohere v1 API
pub struct CohereAdapter {
    base_url: String,
    api_key: SecretString,
    models: BTreeMap<OperationType, String>,
    client: Client,
}

impl std::fmt::Debug for CohereAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CohereAdapter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CohereAdapter {
    /// Create the adapter
    ///
    /// # Errors
    /// Returns a validation error if the API key is missing
    pub fn new(config: &ProviderConfig, default_timeout: Duration) -> GatewayResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| missing_credential(ProviderKind::Cohere, "api_key"))?;
        Ok(Self {
            base_url: config
                .endpoint()
                .unwrap_or_else(|| "https://api.cohere.ai/v1".to_string()),
            api_key,
            models: config.models.clone(),
            client: http::build_client(config.timeout.unwrap_or(default_timeout))?,
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
    }

    async fn chat(
        &self,
        body: ChatRequest,
        timeout: Duration,
    ) -> GatewayResult<(String, Option<Usage>, Value)> {
        let (response, raw): (ChatResponse, Value) =
            send_json(self.kind(), self.post("chat").json(&body), timeout).await?;
        let usage = response
            .meta
            .and_then(|m| m.billed_units)
            .map(|b| Usage::split(b.input_tokens, b.output_tokens));
        Ok((response.text, usage, raw))
    }
}

#[async_trait]
impl ProviderAdapter for CohereAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cohere
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
            .unwrap_or(if operation == OperationType::Embedding {
                "embed-english-v3.0"
            } else {
                "command-r"
            })
            .to_string();
        debug!(provider = %self.kind(), operation = %operation, model = %model, "Sending request");

        match input {
            OperationInput::TextGeneration(r) => {
                let body = ChatRequest {
                    model,
                    message: r.prompt.clone(),
                    preamble: None,
                    chat_history: Vec::new(),
                    temperature: r.temperature,
                    p: r.top_p,
                    max_tokens: r.max_tokens,
                    stop_sequences: r.stop.clone(),
                };
                let (text, usage, raw) = self.chat(body, timeout).await?;
                Ok(ProviderRawResult::new(
                    OperationOutput::TextGeneration(TextGenerationOutput { text, usage }),
                    raw,
                )
                .with_usage(usage))
            }
            OperationInput::ChatCompletion(r) => {
                let (preamble, chat_history, message) = split_history(&r.messages)?;
                let body = ChatRequest {
                    model,
                    message,
                    preamble,
                    chat_history,
                    temperature: r.temperature,
                    p: r.top_p,
                    max_tokens: r.max_tokens,
                    stop_sequences: r.stop.clone(),
                };
                let (text, usage, raw) = self.chat(body, timeout).await?;
                Ok(ProviderRawResult::new(
                    OperationOutput::ChatCompletion(ChatCompletionOutput {
                        message: ChatMessage::assistant(text),
                        usage,
                    }),
                    raw,
                )
                .with_usage(usage))
            }
            OperationInput::Embedding(r) => {
                let body = EmbedRequest {
                    model,
                    texts: r.input.texts().into_iter().map(str::to_string).collect(),
                    input_type: "search_document",
                };
                let (response, raw): (EmbedResponse, Value) =
                    send_json(self.kind(), self.post("embed").json(&body), timeout).await?;
                let usage = response
                    .meta
                    .and_then(|m| m.billed_units)
                    .map(|b| Usage::total(b.input_tokens));
                Ok(ProviderRawResult::new(
                    OperationOutput::Embedding(EmbeddingOutput {
                        embeddings: response.embeddings,
                        usage,
                    }),
                    raw,
                )
                .with_usage(usage))
            }
            other => Err(http::unsupported(self.kind(), other.operation_type())),
        }
    }
}

/// Split a conversation into preamble, history and the final user message
fn split_history(
    messages: &[ChatMessage],
) -> GatewayResult<(Option<String>, Vec<HistoryEntry>, String)> {
    let Some((last, earlier)) = messages.split_last() else {
        return Err(GatewayError::validation(
            "messages cannot be empty",
            Some("messages".to_string()),
            "empty_messages",
        ));
    };
    let preamble: Vec<&str> = earlier
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .collect();
    let history = earlier
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .map(|m| HistoryEntry {
            role: if m.role == ChatRole::Assistant { "CHATBOT" } else { "USER" },
            message: m.content.clone(),
        })
        .collect();
    Ok((
        (!preamble.is_empty()).then(|| preamble.join("\n\n")),
        history,
        last.content.clone(),
    ))
}

// ===== API Types =====

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    chat_history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    role: &'static str,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
    meta: Option<Meta>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    texts: Vec<String>,
    input_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    billed_units: Option<BilledUnits>,
}

#[derive(Debug, Deserialize)]
struct BilledUnits {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}
