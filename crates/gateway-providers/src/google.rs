//! Google Generative Language API adapter.
//!
//! Gemini models serve text and chat through `generateContent`, embeddings
//! go through `batchEmbedContents`, and Imagen models generate images
//! through `predict`.

use crate::http::{self, send_json};
use crate::openai::missing_credential;
use async_trait::async_trait;
use gateway_config::ProviderConfig;
use gateway_core::{
    ChatCompletionOutput, ChatMessage, ChatRole, EmbeddingOutput, EmbeddingRequest, GatewayError,
    GatewayResult, ImageGenerationOutput, ImageGenerationRequest, OperationInput, OperationOutput,
    OperationType, ProviderAdapter, ProviderKind, ProviderRawResult, TextGenerationOutput, Usage,
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
    OperationType::ImageGeneration,
    OperationType::Embedding,
];

/// Adapter for Gemini, text-embedding and Imagen models
pub struct GoogleAdapter {
    base_url: String,
    api_key: SecretString,
    models: BTreeMap<OperationType, String>,
    client: Client,
}

impl std::fmt::Debug for GoogleAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAdapter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GoogleAdapter {
    /// Create the adapter
    ///
    /// # Errors
    /// Returns a validation error if the API key is missing
    pub fn new(config: &ProviderConfig, default_timeout: Duration) -> GatewayResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| missing_credential(ProviderKind::Google, "api_key"))?;
        Ok(Self {
            base_url: config
                .endpoint()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1".to_string()),
            api_key,
            models: config.models.clone(),
            client: http::build_client(config.timeout.unwrap_or(default_timeout))?,
        })
    }

    fn post(&self, model: &str, method: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/models/{model}:{method}", self.base_url))
            .header("x-goog-api-key", self.api_key.expose_secret())
    }

    async fn generate(
        &self,
        model: &str,
        body: GenerateRequest,
        timeout: Duration,
    ) -> GatewayResult<(String, Option<Usage>, Value)> {
        let (response, raw): (GenerateResponse, Value) =
            send_json(self.kind(), self.post(model, "generateContent").json(&body), timeout).await?;

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            GatewayError::provider(self.kind(), "Response contained no candidates", None, false)
        })?;
        let text = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        let usage = response.usage_metadata.map(|u| Usage {
            prompt_tokens: Some(u.prompt_token_count),
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });
        Ok((text, usage, raw))
    }

    async fn embed(
        &self,
        request: &EmbeddingRequest,
        model: &str,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let body = BatchEmbedRequest {
            requests: request
                .input
                .texts()
                .into_iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{model}"),
                    content: Content::text(None, text),
                    output_dimensionality: request.dimensions,
                })
                .collect(),
        };
        let (response, raw): (BatchEmbedResponse, Value) =
            send_json(self.kind(), self.post(model, "batchEmbedContents").json(&body), timeout)
                .await?;
        Ok(ProviderRawResult::new(
            OperationOutput::Embedding(EmbeddingOutput {
                embeddings: response.embeddings.into_iter().map(|e| e.values).collect(),
                usage: None,
            }),
            raw,
        ))
    }

    async fn imagen(
        &self,
        request: &ImageGenerationRequest,
        model: &str,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let (width, height) = request.size();
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: request.prompt.clone(),
            }],
            parameters: PredictParameters {
                sample_count: request.image_count(),
                negative_prompt: request.negative_prompt.clone(),
                aspect_ratio: aspect_ratio(width, height),
            },
        };
        let (response, raw): (PredictResponse, Value) =
            send_json(self.kind(), self.post(model, "predict").json(&body), timeout).await?;

        let images = response
            .predictions
            .into_iter()
            .map(|p| {
                http::to_data_url(
                    p.mime_type.as_deref().unwrap_or("image/png"),
                    &p.bytes_base64_encoded,
                )
            })
            .collect();
        Ok(ProviderRawResult::new(
            OperationOutput::ImageGeneration(ImageGenerationOutput {
                images,
                seeds: None,
            }),
            raw,
        ))
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
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
            .unwrap_or_else(|| default_model(operation))
            .to_string();
        debug!(provider = %self.kind(), operation = %operation, model = %model, "Sending request");

        match input {
            OperationInput::TextGeneration(r) => {
                let body = GenerateRequest {
                    contents: vec![Content::text(Some("user"), &r.prompt)],
                    system_instruction: None,
                    generation_config: Some(GenerationConfig {
                        temperature: r.temperature,
                        top_p: r.top_p,
                        max_output_tokens: r.max_tokens,
                        stop_sequences: r.stop.clone(),
                    }),
                };
                let (text, usage, raw) = self.generate(&model, body, timeout).await?;
                Ok(ProviderRawResult::new(
                    OperationOutput::TextGeneration(TextGenerationOutput { text, usage }),
                    raw,
                )
                .with_usage(usage))
            }
            OperationInput::ChatCompletion(r) => {
                let (system_instruction, contents) = to_contents(&r.messages);
                let body = GenerateRequest {
                    contents,
                    system_instruction,
                    generation_config: Some(GenerationConfig {
                        temperature: r.temperature,
                        top_p: r.top_p,
                        max_output_tokens: r.max_tokens,
                        stop_sequences: r.stop.clone(),
                    }),
                };
                let (text, usage, raw) = self.generate(&model, body, timeout).await?;
                Ok(ProviderRawResult::new(
                    OperationOutput::ChatCompletion(ChatCompletionOutput {
                        message: ChatMessage::assistant(text),
                        usage,
                    }),
                    raw,
                )
                .with_usage(usage))
            }
            OperationInput::Embedding(r) => self.embed(r, &model, timeout).await,
            OperationInput::ImageGeneration(r) => self.imagen(r, &model, timeout).await,
            other => Err(http::unsupported(self.kind(), other.operation_type())),
        }
    }
}

const fn default_model(operation: OperationType) -> &'static str {
    match operation {
        OperationType::Embedding => "text-embedding-004",
        OperationType::ImageGeneration => "imagen-3.0-generate-001",
        _ => "gemini-1.5-flash",
    }
}

/// Closest Imagen aspect ratio for the requested size
fn aspect_ratio(width: u32, height: u32) -> Option<String> {
    const RATIOS: [(&str, f64); 5] = [
        ("1:1", 1.0),
        ("4:3", 4.0 / 3.0),
        ("3:4", 3.0 / 4.0),
        ("16:9", 16.0 / 9.0),
        ("9:16", 9.0 / 16.0),
    ];
    if height == 0 {
        return None;
    }
    let wanted = f64::from(width) / f64::from(height);
    RATIOS
        .iter()
        .min_by(|a, b| (a.1 - wanted).abs().total_cmp(&(b.1 - wanted).abs()))
        .map(|(label, _)| (*label).to_string())
}

fn to_contents(messages: &[ChatMessage]) -> (Option<Content>, Vec<Content>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .collect();
    let contents = messages
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .map(|m| {
            let role = if m.role == ChatRole::Assistant { "model" } else { "user" };
            Content::text(Some(role), &m.content)
        })
        .collect();
    let system_instruction =
        (!system.is_empty()).then(|| Content::text(None, &system.join("\n\n")));
    (system_instruction, contents)
}

// ===== API Types =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: Option<u32>,
    #[serde(default)]
    total_token_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: String,
    mime_type: Option<String>,
}
