//! OpenAI and Azure OpenAI adapter.
//!
//! Both services share the OpenAI wire format. They differ in:
//! - URL structure: Azure addresses a deployment,
//!   `{endpoint}/openai/deployments/{deployment}/{path}?api-version=...`
//! - Authentication: `Authorization: Bearer` vs. an `api-key` header
//! - Capabilities: the Azure adapter serves text, chat and embeddings only

use crate::http::{self, send_json};
use async_trait::async_trait;
use gateway_config::ProviderConfig;
use gateway_core::{
    AudioTranscriptionOutput, AudioTranscriptionRequest, AudioTranslationOutput,
    AudioTranslationRequest, ChatCompletionOutput, ChatCompletionRequest, ChatMessage, ChatRole,
    EmbeddingOutput, EmbeddingRequest, FunctionCallMode, FunctionCallingOutput,
    FunctionCallingRequest, FunctionDefinition, FunctionInvocation, GatewayError, GatewayResult,
    ImageGenerationOutput, ImageGenerationRequest, ImageQuality, MessageFunctionCall,
    ModerationOutput, ModerationRequest, ModerationResult, OperationInput, OperationOutput,
    OperationType, ProviderAdapter, ProviderKind, ProviderRawResult, TextGenerationOutput,
    TextGenerationRequest, TextInput, TimestampGranularity, TranscriptSegment, TranscriptWord,
    Usage,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Azure OpenAI API version used when none is configured
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

const OPENAI_OPERATIONS: &[OperationType] = &[
    OperationType::TextGeneration,
    OperationType::ChatCompletion,
    OperationType::ImageGeneration,
    OperationType::AudioTranscription,
    OperationType::AudioTranslation,
    OperationType::Embedding,
    OperationType::Moderation,
    OperationType::FunctionCalling,
];

const AZURE_OPERATIONS: &[OperationType] = &[
    OperationType::TextGeneration,
    OperationType::ChatCompletion,
    OperationType::Embedding,
];

#[derive(Debug, Clone)]
enum Flavor {
    OpenAi { organization: Option<String> },
    Azure { api_version: String },
}

/// Adapter for the OpenAI API and Azure OpenAI deployments
pub struct OpenAiAdapter {
    flavor: Flavor,
    base_url: String,
    api_key: SecretString,
    models: BTreeMap<OperationType, String>,
    client: Client,
}

impl std::fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("kind", &self.kind())
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
    /// Create an adapter for api.openai.com (or a compatible endpoint)
    ///
    /// # Errors
    /// Returns a validation error if the API key is missing
    pub fn new(config: &ProviderConfig, default_timeout: Duration) -> GatewayResult<Self> {
        Self::build(
            config,
            default_timeout,
            Flavor::OpenAi {
                organization: config.organization_id.clone(),
            },
        )
    }

    /// Create an adapter for an Azure OpenAI resource
    ///
    /// # Errors
    /// Returns a validation error if the API key or endpoint is missing
    pub fn azure(config: &ProviderConfig, default_timeout: Duration) -> GatewayResult<Self> {
        Self::build(
            config,
            default_timeout,
            Flavor::Azure {
                api_version: config
                    .api_version
                    .clone()
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            },
        )
    }

    fn build(
        config: &ProviderConfig,
        default_timeout: Duration,
        flavor: Flavor,
    ) -> GatewayResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| missing_credential(config.kind, "api_key"))?;
        let base_url = config.endpoint().ok_or_else(|| {
            GatewayError::validation(
                format!("{} requires base_url", config.kind),
                Some("base_url".to_string()),
                "missing_base_url",
            )
        })?;
        Ok(Self {
            flavor,
            base_url,
            api_key,
            models: config.models.clone(),
            client: http::build_client(config.timeout.unwrap_or(default_timeout))?,
        })
    }

    fn model(&self, input: &OperationInput) -> String {
        let operation = input.operation_type();
        input
            .model()
            .or_else(|| self.models.get(&operation).map(String::as_str))
            .unwrap_or_else(|| default_model(operation))
            .to_string()
    }

    fn post(&self, path: &str, model: &str) -> RequestBuilder {
        match &self.flavor {
            Flavor::OpenAi { organization } => {
                let request = self
                    .client
                    .post(format!("{}/{path}", self.base_url))
                    .bearer_auth(self.api_key.expose_secret());
                match organization {
                    Some(org) => request.header("OpenAI-Organization", org),
                    None => request,
                }
            }
            Flavor::Azure { api_version } => self
                .client
                .post(format!(
                    "{}/openai/deployments/{model}/{path}?api-version={api_version}",
                    self.base_url
                ))
                .header("api-key", self.api_key.expose_secret()),
        }
    }

    async fn text(
        &self,
        request: &TextGenerationRequest,
        model: &str,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let body = CompletionRequest {
            model,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
            stop: request.stop.as_deref(),
        };
        let (response, raw): (CompletionResponse, Value) =
            send_json(self.kind(), self.post("completions", model).json(&body), timeout).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .unwrap_or_default();
        let usage = response.usage.map(Usage::from);
        Ok(ProviderRawResult::new(
            OperationOutput::TextGeneration(TextGenerationOutput { text, usage }),
            raw,
        )
        .with_usage(usage))
    }

    async fn chat_call(
        &self,
        model: &str,
        messages: &[ChatMessage],
        sampling: Sampling<'_>,
        functions: Option<&[FunctionDefinition]>,
        function_call: Option<&FunctionCallMode>,
        timeout: Duration,
    ) -> GatewayResult<(ChatMessage, Option<Usage>, Value)> {
        let body = ChatRequest {
            model,
            messages: wire_messages(messages),
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            frequency_penalty: sampling.frequency_penalty,
            presence_penalty: sampling.presence_penalty,
            stop: sampling.stop,
            tools: functions.filter(|f| !f.is_empty()).map(|functions| {
                functions
                    .iter()
                    .map(|f| WireTool {
                        tool_type: "function",
                        function: f,
                    })
                    .collect()
            }),
            tool_choice: function_call.map(tool_choice),
        };
        let (response, raw): (ChatResponse, Value) =
            send_json(self.kind(), self.post("chat/completions", model).json(&body), timeout)
                .await?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            GatewayError::provider(self.kind(), "Response contained no choices", None, false)
        })?;
        let function_call = choice
            .message
            .tool_calls
            .and_then(|calls| calls.into_iter().next())
            .map(|call| call.function)
            .or(choice.message.function_call)
            .map(|f| MessageFunctionCall {
                name: f.name,
                arguments: f.arguments,
            });
        let message = ChatMessage {
            role: ChatRole::Assistant,
            content: choice.message.content.unwrap_or_default(),
            name: None,
            function_call,
        };
        Ok((message, response.usage.map(Usage::from), raw))
    }

    async fn chat(
        &self,
        request: &ChatCompletionRequest,
        model: &str,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let sampling = Sampling {
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
            stop: request.stop.as_deref(),
        };
        let (message, usage, raw) = self
            .chat_call(
                model,
                &request.messages,
                sampling,
                request.functions.as_deref(),
                request.function_call.as_ref(),
                timeout,
            )
            .await?;
        Ok(ProviderRawResult::new(
            OperationOutput::ChatCompletion(ChatCompletionOutput { message, usage }),
            raw,
        )
        .with_usage(usage))
    }

    async fn function_calling(
        &self,
        request: &FunctionCallingRequest,
        model: &str,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let sampling = Sampling {
            temperature: request.temperature,
            ..Sampling::default()
        };
        let (message, usage, raw) = self
            .chat_call(
                model,
                &request.messages,
                sampling,
                Some(&request.functions),
                request.function_call.as_ref(),
                timeout,
            )
            .await?;
        let function_call = message.function_call.as_ref().map(|call| FunctionInvocation {
            name: call.name.clone(),
            arguments: serde_json::from_str(&call.arguments)
                .unwrap_or_else(|_| Value::String(call.arguments.clone())),
        });
        Ok(ProviderRawResult::new(
            OperationOutput::FunctionCalling(FunctionCallingOutput {
                message,
                function_call,
                usage,
            }),
            raw,
        )
        .with_usage(usage))
    }

    async fn image_generation(
        &self,
        request: &ImageGenerationRequest,
        model: &str,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let (width, height) = request.size();
        let body = ImageRequest {
            model,
            prompt: &request.prompt,
            n: request.image_count(),
            size: format!("{width}x{height}"),
            quality: request.quality.map(|q| match q {
                ImageQuality::Standard => "standard",
                ImageQuality::Hd => "hd",
            }),
            style: request.style.as_deref(),
        };
        let (response, raw): (ImageResponse, Value) =
            send_json(self.kind(), self.post("images/generations", model).json(&body), timeout)
                .await?;

        let images = response
            .data
            .into_iter()
            .filter_map(|image| {
                image
                    .url
                    .or_else(|| image.b64_json.map(|b64| http::to_data_url("image/png", &b64)))
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

    async fn audio_form(&self, audio: &str, model: &str, timeout: Duration) -> GatewayResult<Form> {
        let media = http::load_media(&self.client, self.kind(), "audio", audio, timeout).await?;
        let mime = media.mime.unwrap_or_else(|| "audio/mpeg".to_string());
        let part = Part::bytes(media.data)
            .file_name(format!("audio.{}", audio_extension(&mime)))
            .mime_str(&mime)
            .map_err(|e| {
                GatewayError::validation(
                    format!("audio has an invalid content type: {e}"),
                    Some("audio".to_string()),
                    "invalid_media",
                )
            })?;
        Ok(Form::new()
            .part("file", part)
            .text("model", model.to_string())
            .text("response_format", "verbose_json"))
    }

    async fn transcription(
        &self,
        request: &AudioTranscriptionRequest,
        model: &str,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let mut form = self.audio_form(&request.audio, model, timeout).await?;
        if let Some(language) = &request.language {
            form = form.text("language", language.clone());
        }
        if let Some(prompt) = &request.prompt {
            form = form.text("prompt", prompt.clone());
        }
        if let Some(temperature) = request.temperature {
            form = form.text("temperature", temperature.to_string());
        }
        for granularity in request.timestamp_granularities.iter().flatten() {
            let value = match granularity {
                TimestampGranularity::Segment => "segment",
                TimestampGranularity::Word => "word",
            };
            form = form.text("timestamp_granularities[]", value);
        }

        let (response, raw): (TranscriptionResponse, Value) = send_json(
            self.kind(),
            self.post("audio/transcriptions", model).multipart(form),
            timeout,
        )
        .await?;

        let segments = response.segments.map(|segments| {
            segments
                .into_iter()
                .map(|s| TranscriptSegment {
                    id: s.id,
                    start: s.start,
                    end: s.end,
                    text: s.text,
                    confidence: s.avg_logprob.map(f64::exp),
                })
                .collect()
        });
        let words = response.words.map(|words| {
            words
                .into_iter()
                .map(|w| TranscriptWord {
                    word: w.word,
                    start: w.start,
                    end: w.end,
                    confidence: None,
                })
                .collect()
        });
        Ok(ProviderRawResult::new(
            OperationOutput::AudioTranscription(AudioTranscriptionOutput {
                text: response.text,
                segments,
                words,
                language: response.language,
            }),
            raw,
        ))
    }

    async fn translation(
        &self,
        request: &AudioTranslationRequest,
        model: &str,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        if !is_english(&request.target_language) {
            return Err(GatewayError::validation(
                format!(
                    "{} only translates audio into English, not {}",
                    self.kind(),
                    request.target_language
                ),
                Some("target_language".to_string()),
                "unsupported_target_language",
            ));
        }

        let mut form = self.audio_form(&request.audio, model, timeout).await?;
        if let Some(prompt) = &request.prompt {
            form = form.text("prompt", prompt.clone());
        }
        if let Some(temperature) = request.temperature {
            form = form.text("temperature", temperature.to_string());
        }

        let (response, raw): (TranscriptionResponse, Value) = send_json(
            self.kind(),
            self.post("audio/translations", model).multipart(form),
            timeout,
        )
        .await?;
        Ok(ProviderRawResult::new(
            OperationOutput::AudioTranslation(AudioTranslationOutput {
                text: response.text,
                detected_language: response.language,
            }),
            raw,
        ))
    }

    async fn embedding(
        &self,
        request: &EmbeddingRequest,
        model: &str,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let body = EmbeddingsRequest {
            model,
            input: &request.input,
            dimensions: request.dimensions,
            user: request.user.as_deref(),
        };
        let (response, raw): (EmbeddingsResponse, Value) =
            send_json(self.kind(), self.post("embeddings", model).json(&body), timeout).await?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        let usage = response.usage.map(Usage::from);
        Ok(ProviderRawResult::new(
            OperationOutput::Embedding(EmbeddingOutput {
                embeddings: data.into_iter().map(|d| d.embedding).collect(),
                usage,
            }),
            raw,
        )
        .with_usage(usage))
    }

    async fn moderation(
        &self,
        request: &ModerationRequest,
        model: &str,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let body = json!({ "input": request.input, "model": model });
        let (response, raw): (ModerationsResponse, Value) =
            send_json(self.kind(), self.post("moderations", model).json(&body), timeout).await?;
        Ok(ProviderRawResult::new(
            OperationOutput::Moderation(ModerationOutput {
                results: response.results,
            }),
            raw,
        ))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        match self.flavor {
            Flavor::OpenAi { .. } => ProviderKind::OpenAi,
            Flavor::Azure { .. } => ProviderKind::AzureOpenAi,
        }
    }

    fn supported_operations(&self) -> &[OperationType] {
        match self.flavor {
            Flavor::OpenAi { .. } => OPENAI_OPERATIONS,
            Flavor::Azure { .. } => AZURE_OPERATIONS,
        }
    }

    async fn execute(
        &self,
        input: &OperationInput,
        timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        let operation = input.operation_type();
        if !self.supports(operation) {
            return Err(http::unsupported(self.kind(), operation));
        }
        let model = self.model(input);
        debug!(provider = %self.kind(), operation = %operation, model = %model, "Sending request");

        match input {
            OperationInput::TextGeneration(r) => self.text(r, &model, timeout).await,
            OperationInput::ChatCompletion(r) => self.chat(r, &model, timeout).await,
            OperationInput::FunctionCalling(r) => self.function_calling(r, &model, timeout).await,
            OperationInput::ImageGeneration(r) => self.image_generation(r, &model, timeout).await,
            OperationInput::AudioTranscription(r) => self.transcription(r, &model, timeout).await,
            OperationInput::AudioTranslation(r) => self.translation(r, &model, timeout).await,
            OperationInput::Embedding(r) => self.embedding(r, &model, timeout).await,
            OperationInput::Moderation(r) => self.moderation(r, &model, timeout).await,
            OperationInput::ImageAnalysis(_) | OperationInput::VideoAnalysis(_) => {
                Err(http::unsupported(self.kind(), operation))
            }
        }
    }
}

pub(crate) fn missing_credential(provider: ProviderKind, field: &str) -> GatewayError {
    GatewayError::validation(
        format!("{provider} requires {field}"),
        Some(field.to_string()),
        "missing_credentials",
    )
}

const fn default_model(operation: OperationType) -> &'static str {
    match operation {
        OperationType::TextGeneration => "gpt-3.5-turbo-instruct",
        OperationType::ImageGeneration => "dall-e-3",
        OperationType::AudioTranscription | OperationType::AudioTranslation => "whisper-1",
        OperationType::Embedding => "text-embedding-3-small",
        OperationType::Moderation => "omni-moderation-latest",
        _ => "gpt-4o-mini",
    }
}

fn is_english(language: &str) -> bool {
    matches!(
        language.trim().to_ascii_lowercase().as_str(),
        "en" | "eng" | "english" | "en-us" | "en-gb"
    )
}

fn audio_extension(mime: &str) -> &'static str {
    match mime {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        "audio/webm" => "webm",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/flac" | "audio/x-flac" => "flac",
        _ => "mp3",
    }
}

fn tool_choice(mode: &FunctionCallMode) -> Value {
    match mode {
        FunctionCallMode::Keyword(keyword) => Value::String(keyword.clone()),
        FunctionCallMode::Named { name } => json!({
            "type": "function",
            "function": { "name": name }
        }),
    }
}

/// Convert canonical messages, pairing legacy function calls with tool ids
fn wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
    let mut pending: Vec<(String, String)> = Vec::new();
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| match message.role {
            ChatRole::Function => {
                let name = message.name.clone().unwrap_or_default();
                let id = pending
                    .iter()
                    .rposition(|(pending_name, _)| *pending_name == name)
                    .map(|pos| pending.remove(pos).1)
                    .unwrap_or_else(|| format!("call_{name}"));
                WireMessage {
                    role: "tool",
                    content: Some(message.content.clone()),
                    name: None,
                    tool_calls: None,
                    tool_call_id: Some(id),
                }
            }
            role => {
                let tool_calls = message.function_call.as_ref().map(|call| {
                    let id = format!("call_{index}");
                    pending.push((call.name.clone(), id.clone()));
                    vec![WireToolCall {
                        id,
                        tool_type: "function".to_string(),
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    }]
                });
                WireMessage {
                    role: match role {
                        ChatRole::System => "system",
                        ChatRole::Assistant => "assistant",
                        _ => "user",
                    },
                    content: (!message.content.is_empty() || tool_calls.is_none())
                        .then(|| message.content.clone()),
                    name: message.name.clone(),
                    tool_calls,
                    tool_call_id: None,
                }
            }
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
struct Sampling<'a> {
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    frequency_penalty: Option<f32>,
    presence_penalty: Option<f32>,
    stop: Option<&'a [String]>,
}

// ===== API Types =====

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl From<WireUsage> for Usage {
    fn from(usage: WireUsage) -> Self {
        Self {
            prompt_tokens: Some(usage.prompt_tokens),
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: &'a FunctionDefinition,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default)]
    tool_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    language: Option<String>,
    segments: Option<Vec<WireSegment>>,
    words: Option<Vec<WireWord>>,
}

#[derive(Debug, Deserialize)]
struct WireSegment {
    id: u32,
    start: f64,
    end: f64,
    text: String,
    avg_logprob: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireWord {
    word: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a TextInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ModerationsResponse {
    results: Vec<ModerationResult>,
}
