//! Response types for the gateway.

use crate::operation::OperationType;
use crate::request::ChatMessage;
use crate::types::{ProviderKind, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Canonical result envelope returned for every successful operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<O> {
    /// Provider that served the request
    pub provider: ProviderKind,
    /// Request identifier
    pub request_id: RequestId,
    /// Always true for a returned result
    pub success: bool,
    /// Wall time spent inside the gateway
    pub processing_time_ms: u64,
    /// Cost attributed to this call in USD
    pub cost: f64,
    /// Whether the result was served from cache
    #[serde(default)]
    pub from_cache: bool,
    /// Provider payload, kept only when response logging is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
    /// Operation-specific output
    #[serde(flatten)]
    pub payload: O,
}

impl<O> OperationResult<O> {
    /// Rewrite a stored result as a cache hit for a new request
    pub fn mark_cached(&mut self, request_id: RequestId, processing_time_ms: u64) {
        self.request_id = request_id;
        self.processing_time_ms = processing_time_ms;
        self.cost = 0.0;
        self.from_cache = true;
    }
}

/// Token usage reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    /// Output tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    /// Input plus output tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

impl Usage {
    /// Usage with input/output split
    #[must_use]
    pub fn split(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
            total_tokens: Some(prompt_tokens + completion_tokens),
        }
    }

    /// Usage with only a total
    #[must_use]
    pub fn total(total_tokens: u32) -> Self {
        Self {
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: Some(total_tokens),
        }
    }
}

/// Adapter-produced output for any operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum OperationOutput {
    /// Text generation
    TextGeneration(TextGenerationOutput),
    /// Chat completion
    ChatCompletion(ChatCompletionOutput),
    /// Image generation
    ImageGeneration(ImageGenerationOutput),
    /// Image analysis
    ImageAnalysis(ImageAnalysisOutput),
    /// Video analysis
    VideoAnalysis(VideoAnalysisOutput),
    /// Audio transcription
    AudioTranscription(AudioTranscriptionOutput),
    /// Audio translation
    AudioTranslation(AudioTranslationOutput),
    /// Embedding
    Embedding(EmbeddingOutput),
    /// Moderation
    Moderation(ModerationOutput),
    /// Function calling
    FunctionCalling(FunctionCallingOutput),
}

impl OperationOutput {
    /// Operation type of the wrapped output
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
}

/// Generated text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextGenerationOutput {
    /// Completion text
    pub text: String,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Chat reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionOutput {
    /// Assistant message
    pub message: ChatMessage,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Generated images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationOutput {
    /// Image URLs or `data:` URLs
    pub images: Vec<String>,
    /// Seeds, when the provider reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds: Option<Vec<u64>>,
}

/// Relative bounding box (0.0 - 1.0 of the frame)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

/// Estimated age range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    /// Lower bound
    pub low: u32,
    /// Upper bound
    pub high: u32,
}

/// Detected object instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Object name
    pub name: String,
    /// Confidence percentage
    pub confidence: f64,
    /// Location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

/// Detected face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    /// Location
    pub bounding_box: BoundingBox,
    /// Emotion confidences keyed by emotion name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotions: Option<BTreeMap<String, f64>>,
    /// Estimated age
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<AgeRange>,
    /// Estimated gender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Confidence percentage
    pub confidence: f64,
}

/// Image-level label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLabel {
    /// Label name
    pub name: String,
    /// Confidence percentage
    pub confidence: f64,
}

/// Detected text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedText {
    /// Recognized text
    pub content: String,
    /// Location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Confidence percentage
    pub confidence: f64,
}

/// Unsafe-content verdict
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModerationSummary {
    /// Whether any category was detected
    pub flagged: bool,
    /// Confidence per category
    pub categories: BTreeMap<String, f64>,
}

/// Image analysis result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageAnalysisOutput {
    /// Objects with locations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<DetectedObject>>,
    /// Faces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<DetectedFace>>,
    /// Image-level labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<DetectedLabel>>,
    /// Text lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<DetectedText>>,
    /// Unsafe content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderation: Option<ModerationSummary>,
}

/// Object seen at a point in a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoObject {
    /// Object name
    pub name: String,
    /// Confidence percentage
    pub confidence: f64,
    /// Seconds from the start of the video
    pub timestamp: f64,
    /// Location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

/// Face seen at a point in a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFace {
    /// Seconds from the start of the video
    pub timestamp: f64,
    /// Location
    pub bounding_box: BoundingBox,
    /// Emotion confidences keyed by emotion name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotions: Option<BTreeMap<String, f64>>,
    /// Confidence percentage
    pub confidence: f64,
}

/// Contiguous scene or shot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoScene {
    /// Scene start in seconds
    pub start_time: f64,
    /// Scene end in seconds
    pub end_time: f64,
    /// Segment description
    pub description: String,
    /// Confidence percentage
    pub confidence: f64,
}

/// Text seen at a point in a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoText {
    /// Recognized text
    pub content: String,
    /// Seconds from the start of the video
    pub timestamp: f64,
    /// Location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Confidence percentage
    pub confidence: f64,
}

/// Video analysis result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoAnalysisOutput {
    /// Objects over time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<VideoObject>>,
    /// Faces over time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<VideoFace>>,
    /// Scene segments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<VideoScene>>,
    /// Text over time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<VideoText>>,
    /// Unsafe content across the video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderation: Option<ModerationSummary>,
}

/// Transcript segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment index
    pub id: u32,
    /// Start in seconds
    pub start: f64,
    /// End in seconds
    pub end: f64,
    /// Segment text
    pub text: String,
    /// Confidence, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Transcript word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptWord {
    /// Word text
    pub word: String,
    /// Start in seconds
    pub start: f64,
    /// End in seconds
    pub end: f64,
    /// Confidence, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTranscriptionOutput {
    /// Full transcript
    pub text: String,
    /// Segments with timestamps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<TranscriptSegment>>,
    /// Words with timestamps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<TranscriptWord>>,
    /// Detected language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Translated transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTranslationOutput {
    /// Translated text
    pub text: String,
    /// Detected source language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
}

/// Embedding vectors, one per input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOutput {
    /// Vectors in input order
    pub embeddings: Vec<Vec<f32>>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Moderation verdict for one input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    /// Whether any category was violated
    pub flagged: bool,
    /// Category verdicts
    pub categories: BTreeMap<String, bool>,
    /// Category scores
    pub category_scores: BTreeMap<String, f64>,
}

/// Moderation verdicts, one per input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationOutput {
    /// Verdicts in input order
    pub results: Vec<ModerationResult>,
}

/// Function the model decided to call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInvocation {
    /// Function name
    pub name: String,
    /// Parsed arguments
    pub arguments: Value,
}

/// Function calling reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallingOutput {
    /// Assistant message
    pub message: ChatMessage,
    /// Parsed function call, when the model made one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionInvocation>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}
