//! Request types for the gateway.
//!
//! Every operation shares one envelope ([`RequestEnvelope`]) and carries a
//! type-specific payload. [`OperationRequest`] flattens both into a single
//! JSON object so callers send `{"prompt": "...", "caller_id": "u1"}` rather
//! than nested structures.

use crate::error::{GatewayError, GatewayResult};
use crate::operation::OperationType;
use crate::response::OperationOutput;
use crate::types::{ProviderKind, RequestId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::time::Duration;

const fn default_use_cache() -> bool {
    true
}

/// Fields shared by every operation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Unique request identifier, generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,

    /// Calling user or service, used for per-caller limits and cost attribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_id: Option<String>,

    /// Provider to try first when it supports the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<ProviderKind>,

    /// Whether the result may be served from and written to the cache
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,

    /// Cache TTL override
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<Duration>,

    /// Per-call deadline override
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Same-provider retry override for transient failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Completion callback URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Opaque caller metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl RequestEnvelope {
    /// Serialized field names that never influence the outcome of a request
    pub const VOLATILE_FIELDS: &'static [&'static str] = &[
        "request_id",
        "use_cache",
        "cache_ttl",
        "timeout",
        "max_retries",
        "webhook_url",
    ];
}

impl Default for RequestEnvelope {
    fn default() -> Self {
        Self {
            request_id: None,
            caller_id: None,
            preferred_provider: None,
            use_cache: default_use_cache(),
            cache_ttl: None,
            timeout: None,
            max_retries: None,
            webhook_url: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// A complete request: envelope plus operation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest<P> {
    /// Shared envelope
    #[serde(flatten)]
    pub envelope: RequestEnvelope,

    /// Operation-specific payload
    #[serde(flatten)]
    pub payload: P,
}

impl<P: Operation> OperationRequest<P> {
    /// Wrap a payload in a default envelope
    pub fn new(payload: P) -> Self {
        Self {
            envelope: RequestEnvelope::default(),
            payload,
        }
    }

    /// Operation type of the payload
    #[must_use]
    pub fn operation_type(&self) -> OperationType {
        P::TYPE
    }

    /// Set the request id
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<RequestId>) -> Self {
        self.envelope.request_id = Some(id.into());
        self
    }

    /// Set the caller id
    #[must_use]
    pub fn with_caller(mut self, caller_id: impl Into<String>) -> Self {
        self.envelope.caller_id = Some(caller_id.into());
        self
    }

    /// Set the preferred provider
    #[must_use]
    pub fn with_preferred_provider(mut self, provider: ProviderKind) -> Self {
        self.envelope.preferred_provider = Some(provider);
        self
    }

    /// Bypass the cache for this request
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.envelope.use_cache = false;
        self
    }

    /// Override the cache TTL
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.envelope.cache_ttl = Some(ttl);
        self
    }

    /// Override the call deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.envelope.timeout = Some(timeout);
        self
    }

    /// Override the same-provider retry budget
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.envelope.max_retries = Some(max_retries);
        self
    }

    /// Set the webhook URL
    #[must_use]
    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.envelope.webhook_url = Some(url.into());
        self
    }
}

/// A payload type bound to one [`OperationType`] and its output
pub trait Operation: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Operation this payload belongs to
    const TYPE: OperationType;

    /// Canonical output produced for this payload
    type Output: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Check required fields and value ranges
    ///
    /// # Errors
    /// Returns `GatewayError::Validation` describing the first offending field
    fn validate(&self) -> GatewayResult<()>;

    /// Convert into the adapter-facing input
    fn into_input(self) -> OperationInput;

    /// Extract this operation's output from an adapter result
    ///
    /// # Errors
    /// Returns `GatewayError::Unknown` if the adapter produced another operation's output
    fn take_output(output: OperationOutput) -> GatewayResult<Self::Output>;
}

/// Adapter-facing view of any operation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum OperationInput {
    /// Text generation
    TextGeneration(TextGenerationRequest),
    /// Chat completion
    ChatCompletion(ChatCompletionRequest),
    /// Image generation
    ImageGeneration(ImageGenerationRequest),
    /// Image analysis
    ImageAnalysis(ImageAnalysisRequest),
    /// Video analysis
    VideoAnalysis(VideoAnalysisRequest),
    /// Audio transcription
    AudioTranscription(AudioTranscriptionRequest),
    /// Audio translation
    AudioTranslation(AudioTranslationRequest),
    /// Embedding
    Embedding(EmbeddingRequest),
    /// Moderation
    Moderation(ModerationRequest),
    /// Function calling
    FunctionCalling(FunctionCallingRequest),
}

impl OperationInput {
    /// Operation type of the wrapped payload
    #[must_use]
    pub const fn operation_type(&self) -> OperationType {
        match self {
            Self::TextGeneration(_) => OperationType::TextGeneration,
            Self::ChatCompletion(_) => OperationType::ChatCompletion,
            Self::ImageGeneration(_) => OperationType::ImageGeneration,
            Self::ImageAnalysis(_) => OperationType::ImageAnalysis,
            Self::VideoAnalysis(_) => OperationType::VideoAnalysis,
            Self::AudioTranscription(_) => OperationType::AudioTranscription,
            Self::AudioTranslation(_) => OperationType::AudioTranslation,
            Self::Embedding(_) => OperationType::Embedding,
            Self::Moderation(_) => OperationType::Moderation,
            Self::FunctionCalling(_) => OperationType::FunctionCalling,
        }
    }

    /// Model requested by the caller, if any
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::TextGeneration(r) => r.model.as_deref(),
            Self::ChatCompletion(r) => r.model.as_deref(),
            Self::ImageGeneration(r) => r.model.as_deref(),
            Self::ImageAnalysis(r) => r.model.as_deref(),
            Self::VideoAnalysis(r) => r.model.as_deref(),
            Self::AudioTranscription(r) => r.model.as_deref(),
            Self::AudioTranslation(r) => r.model.as_deref(),
            Self::Embedding(r) => r.model.as_deref(),
            Self::Moderation(r) => r.model.as_deref(),
            Self::FunctionCalling(r) => r.model.as_deref(),
        }
    }
}

macro_rules! impl_operation {
    ($payload:ty, $variant:ident, $output:ty) => {
        impl Operation for $payload {
            const TYPE: OperationType = OperationType::$variant;
            type Output = $output;

            fn validate(&self) -> GatewayResult<()> {
                self.check_fields()
            }

            fn into_input(self) -> OperationInput {
                OperationInput::$variant(self)
            }

            fn take_output(output: OperationOutput) -> GatewayResult<Self::Output> {
                match output {
                    OperationOutput::$variant(out) => Ok(out),
                    other => Err(GatewayError::unknown(format!(
                        "adapter returned {} output for {}",
                        other.operation_type(),
                        Self::TYPE
                    ))),
                }
            }
        }
    };
}

// ===== Validation helpers =====

fn require_text(value: &str, field: &str) -> GatewayResult<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::required(field));
    }
    Ok(())
}

fn check_range(value: Option<f32>, range: RangeInclusive<f32>, field: &str) -> GatewayResult<()> {
    if let Some(v) = value {
        if !range.contains(&v) {
            return Err(GatewayError::validation(
                format!(
                    "{field} must be between {} and {}, got {v}",
                    range.start(),
                    range.end()
                ),
                Some(field.to_string()),
                format!("invalid_{field}"),
            ));
        }
    }
    Ok(())
}

fn check_positive(value: Option<u32>, field: &str) -> GatewayResult<()> {
    if value == Some(0) {
        return Err(GatewayError::validation(
            format!("{field} must be greater than 0"),
            Some(field.to_string()),
            format!("invalid_{field}"),
        ));
    }
    Ok(())
}

fn check_sampling(
    temperature: Option<f32>,
    top_p: Option<f32>,
    frequency_penalty: Option<f32>,
    presence_penalty: Option<f32>,
) -> GatewayResult<()> {
    check_range(temperature, 0.0..=2.0, "temperature")?;
    check_range(top_p, 0.0..=1.0, "top_p")?;
    check_range(frequency_penalty, -2.0..=2.0, "frequency_penalty")?;
    check_range(presence_penalty, -2.0..=2.0, "presence_penalty")
}

fn check_messages(messages: &[ChatMessage]) -> GatewayResult<()> {
    if messages.is_empty() {
        return Err(GatewayError::validation(
            "messages cannot be empty",
            Some("messages".to_string()),
            "empty_messages",
        ));
    }
    for message in messages {
        if message.content.trim().is_empty() && message.function_call.is_none() {
            return Err(GatewayError::validation(
                format!("{} message content cannot be empty", message.role),
                Some("messages".to_string()),
                "empty_message_content",
            ));
        }
    }
    Ok(())
}

// ===== Text generation =====

/// Single-prompt text generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextGenerationRequest {
    /// Prompt text
    pub prompt: String,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Frequency penalty (-2.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Presence penalty (-2.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Provider model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl TextGenerationRequest {
    /// Create a request for a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    fn check_fields(&self) -> GatewayResult<()> {
        require_text(&self.prompt, "prompt")?;
        check_positive(self.max_tokens, "max_tokens")?;
        check_sampling(
            self.temperature,
            self.top_p,
            self.frequency_penalty,
            self.presence_penalty,
        )
    }
}

impl_operation!(TextGenerationRequest, TextGeneration, crate::response::TextGenerationOutput);

// ===== Chat =====

/// Chat message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions
    System,
    /// End user
    User,
    /// Model reply
    Assistant,
    /// Function result
    Function,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
        };
        f.write_str(s)
    }
}

/// Function call emitted by the model inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFunctionCall {
    /// Function name
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role
    pub role: ChatRole,
    /// Text content
    #[serde(default)]
    pub content: String,
    /// Author name (function name for function results)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function call requested by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<MessageFunctionCall>,
}

impl ChatMessage {
    fn with_role(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            function_call: None,
        }
    }

    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(ChatRole::System, content)
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(ChatRole::User, content)
    }

    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(ChatRole::Assistant, content)
    }

    /// Function result message
    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::with_role(ChatRole::Function, content)
        }
    }
}

/// Declared function the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// What the function does
    #[serde(default)]
    pub description: String,
    /// JSON Schema of the arguments
    #[serde(default)]
    pub parameters: Value,
}

/// How the model may use declared functions: `"auto"`, `"none"`, or `{"name": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionCallMode {
    /// `"auto"` or `"none"`
    Keyword(String),
    /// Force a specific function
    Named {
        /// Function to call
        name: String,
    },
}

impl FunctionCallMode {
    fn check(&self, functions: &[FunctionDefinition]) -> GatewayResult<()> {
        match self {
            Self::Keyword(k) if k == "auto" || k == "none" => Ok(()),
            Self::Keyword(k) => Err(GatewayError::validation(
                format!("function_call must be \"auto\", \"none\" or {{\"name\": ...}}, got {k:?}"),
                Some("function_call".to_string()),
                "invalid_function_call",
            )),
            Self::Named { name } if functions.iter().any(|f| &f.name == name) => Ok(()),
            Self::Named { name } => Err(GatewayError::validation(
                format!("function_call names undeclared function {name}"),
                Some("function_call".to_string()),
                "unknown_function",
            )),
        }
    }
}

fn check_functions(
    functions: &[FunctionDefinition],
    mode: Option<&FunctionCallMode>,
) -> GatewayResult<()> {
    for function in functions {
        require_text(&function.name, "functions.name")?;
    }
    mode.map_or(Ok(()), |m| m.check(functions))
}

/// Multi-turn chat completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Conversation so far
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Frequency penalty (-2.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Presence penalty (-2.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Provider model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Functions the model may call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionDefinition>>,
    /// Function calling mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallMode>,
}

impl ChatCompletionRequest {
    /// Create a request for a conversation
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    fn check_fields(&self) -> GatewayResult<()> {
        check_messages(&self.messages)?;
        check_positive(self.max_tokens, "max_tokens")?;
        check_sampling(
            self.temperature,
            self.top_p,
            self.frequency_penalty,
            self.presence_penalty,
        )?;
        check_functions(
            self.functions.as_deref().unwrap_or_default(),
            self.function_call.as_ref(),
        )
    }
}

impl_operation!(ChatCompletionRequest, ChatCompletion, crate::response::ChatCompletionOutput);

// ===== Image generation =====

/// Image quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    /// Standard quality
    Standard,
    /// High definition
    Hd,
}

/// Text-to-image generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageGenerationRequest {
    /// Image description
    pub prompt: String,
    /// What the image should not contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Number of images (1 - 10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Provider model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Style preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Quality tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<ImageQuality>,
}

impl ImageGenerationRequest {
    /// Create a request for a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Requested image count, defaulting to one
    #[must_use]
    pub fn image_count(&self) -> u32 {
        self.count.unwrap_or(1)
    }

    /// Requested size, defaulting to 1024x1024
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width.unwrap_or(1024), self.height.unwrap_or(1024))
    }

    fn check_fields(&self) -> GatewayResult<()> {
        require_text(&self.prompt, "prompt")?;
        check_positive(self.width, "width")?;
        check_positive(self.height, "height")?;
        if let Some(count) = self.count {
            if !(1..=10).contains(&count) {
                return Err(GatewayError::validation(
                    format!("count must be between 1 and 10, got {count}"),
                    Some("count".to_string()),
                    "invalid_count",
                ));
            }
        }
        Ok(())
    }
}

impl_operation!(ImageGenerationRequest, ImageGeneration, crate::response::ImageGenerationOutput);

// ===== Image and video analysis =====

/// Detection feature for image and video analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisFeature {
    /// Object detection
    Objects,
    /// Face detection
    Faces,
    /// Label detection
    Labels,
    /// Text detection
    Text,
    /// Unsafe content detection
    Moderation,
    /// Scene segmentation (video only)
    Scenes,
}

/// Image analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageAnalysisRequest {
    /// Image as URL, data URL or raw base64
    pub image: String,
    /// Features to detect, labels when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<AnalysisFeature>>,
    /// Provider model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ImageAnalysisRequest {
    /// Create a request for an image
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Requested features with the default applied
    #[must_use]
    pub fn effective_features(&self) -> Vec<AnalysisFeature> {
        match &self.features {
            Some(f) if !f.is_empty() => f.clone(),
            _ => vec![AnalysisFeature::Labels],
        }
    }

    fn check_fields(&self) -> GatewayResult<()> {
        require_text(&self.image, "image")?;
        if self
            .features
            .as_ref()
            .is_some_and(|f| f.contains(&AnalysisFeature::Scenes))
        {
            return Err(GatewayError::validation(
                "scenes can only be detected in video",
                Some("features".to_string()),
                "unsupported_feature",
            ));
        }
        Ok(())
    }
}

impl_operation!(ImageAnalysisRequest, ImageAnalysis, crate::response::ImageAnalysisOutput);

/// Video analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoAnalysisRequest {
    /// Stored video location (`s3://bucket/key`)
    pub video: String,
    /// Features to detect, labels when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<AnalysisFeature>>,
    /// Provider model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Analysis window start, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    /// Analysis window end, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
}

impl VideoAnalysisRequest {
    /// Create a request for a stored video
    pub fn new(video: impl Into<String>) -> Self {
        Self {
            video: video.into(),
            ..Default::default()
        }
    }

    /// Requested features with the default applied
    #[must_use]
    pub fn effective_features(&self) -> Vec<AnalysisFeature> {
        match &self.features {
            Some(f) if !f.is_empty() => f.clone(),
            _ => vec![AnalysisFeature::Labels],
        }
    }

    fn check_fields(&self) -> GatewayResult<()> {
        require_text(&self.video, "video")?;
        for (value, field) in [(self.start_time, "start_time"), (self.end_time, "end_time")] {
            if value.is_some_and(|v| v < 0.0) {
                return Err(GatewayError::validation(
                    format!("{field} cannot be negative"),
                    Some(field.to_string()),
                    format!("invalid_{field}"),
                ));
            }
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if end <= start {
                return Err(GatewayError::validation(
                    format!("end_time ({end}) must be after start_time ({start})"),
                    Some("end_time".to_string()),
                    "invalid_time_range",
                ));
            }
        }
        Ok(())
    }
}

impl_operation!(VideoAnalysisRequest, VideoAnalysis, crate::response::VideoAnalysisOutput);

// ===== Audio =====

/// Timestamp granularity for transcripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampGranularity {
    /// Segment-level timestamps
    Segment,
    /// Word-level timestamps
    Word,
}

/// Speech-to-text in the source language
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioTranscriptionRequest {
    /// Audio as URL, data URL or raw base64
    pub audio: String,
    /// Provider model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// ISO-639-1 source language hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Context prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Sampling temperature (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Timestamp detail to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_granularities: Option<Vec<TimestampGranularity>>,
}

impl AudioTranscriptionRequest {
    /// Create a request for an audio clip
    pub fn new(audio: impl Into<String>) -> Self {
        Self {
            audio: audio.into(),
            ..Default::default()
        }
    }

    fn check_fields(&self) -> GatewayResult<()> {
        require_text(&self.audio, "audio")?;
        check_range(self.temperature, 0.0..=1.0, "temperature")
    }
}

impl_operation!(
    AudioTranscriptionRequest,
    AudioTranscription,
    crate::response::AudioTranscriptionOutput
);

/// Speech-to-text into a target language
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioTranslationRequest {
    /// Audio as URL, data URL or raw base64
    pub audio: String,
    /// Target language (ISO-639-1 code or English name)
    pub target_language: String,
    /// Provider model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Context prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Sampling temperature (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl AudioTranslationRequest {
    /// Create a request for an audio clip
    pub fn new(audio: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            audio: audio.into(),
            target_language: target_language.into(),
            ..Default::default()
        }
    }

    fn check_fields(&self) -> GatewayResult<()> {
        require_text(&self.audio, "audio")?;
        require_text(&self.target_language, "target_language")?;
        check_range(self.temperature, 0.0..=1.0, "temperature")
    }
}

impl_operation!(AudioTranslationRequest, AudioTranslation, crate::response::AudioTranslationOutput);

// ===== Embedding and moderation =====

/// One string or a batch of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    /// Single input
    Single(String),
    /// Batch of inputs
    Batch(Vec<String>),
}

impl Default for TextInput {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

impl TextInput {
    /// Inputs as a list
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Batch(items) => items.iter().map(String::as_str).collect(),
        }
    }

    fn check(&self) -> GatewayResult<()> {
        let texts = self.texts();
        if texts.is_empty() || texts.iter().any(|t| t.trim().is_empty()) {
            return Err(GatewayError::validation(
                "input must contain at least one non-empty string",
                Some("input".to_string()),
                "empty_input",
            ));
        }
        Ok(())
    }
}

/// Vector embeddings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text(s) to embed
    pub input: TextInput,
    /// Provider model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Output dimensionality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    /// End-user identifier forwarded to the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl EmbeddingRequest {
    /// Create a request for an input
    pub fn new(input: TextInput) -> Self {
        Self {
            input,
            ..Default::default()
        }
    }

    fn check_fields(&self) -> GatewayResult<()> {
        self.input.check()?;
        check_positive(self.dimensions, "dimensions")
    }
}

impl_operation!(EmbeddingRequest, Embedding, crate::response::EmbeddingOutput);

/// Content moderation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationRequest {
    /// Text(s) to classify
    pub input: TextInput,
    /// Provider model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ModerationRequest {
    /// Create a request for an input
    pub fn new(input: TextInput) -> Self {
        Self { input, model: None }
    }

    fn check_fields(&self) -> GatewayResult<()> {
        self.input.check()
    }
}

impl_operation!(ModerationRequest, Moderation, crate::response::ModerationOutput);

// ===== Function calling =====

/// Chat completion constrained to declared functions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionCallingRequest {
    /// Conversation so far
    pub messages: Vec<ChatMessage>,
    /// Functions the model may call
    pub functions: Vec<FunctionDefinition>,
    /// Function calling mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallMode>,
    /// Provider model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature (0.0 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl FunctionCallingRequest {
    /// Create a request for a conversation and function set
    pub fn new(messages: Vec<ChatMessage>, functions: Vec<FunctionDefinition>) -> Self {
        Self {
            messages,
            functions,
            ..Default::default()
        }
    }

    fn check_fields(&self) -> GatewayResult<()> {
        check_messages(&self.messages)?;
        if self.functions.is_empty() {
            return Err(GatewayError::validation(
                "functions cannot be empty",
                Some("functions".to_string()),
                "empty_functions",
            ));
        }
        check_functions(&self.functions, self.function_call.as_ref())?;
        check_range(self.temperature, 0.0..=2.0, "temperature")
    }
}

impl_operation!(FunctionCallingRequest, FunctionCalling, crate::response::FunctionCallingOutput);
