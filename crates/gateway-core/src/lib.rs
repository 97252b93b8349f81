//! # Gateway Core
//!
//! Core types, traits, and error handling for the AI Gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Operation and provider tags
//! - Request envelopes and per-operation payloads
//! - Result envelopes and per-operation outputs
//! - The provider adapter capability
//! - The closed error taxonomy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod operation;
pub mod provider;
pub mod request;
pub mod response;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use operation::OperationType;
pub use provider::{ProviderAdapter, ProviderRawResult};
pub use request::{
    AnalysisFeature, AudioTranscriptionRequest, AudioTranslationRequest, ChatCompletionRequest,
    ChatMessage, ChatRole, EmbeddingRequest, FunctionCallMode, FunctionCallingRequest,
    FunctionDefinition, ImageAnalysisRequest, ImageGenerationRequest, ImageQuality,
    MessageFunctionCall, ModerationRequest, Operation, OperationInput, OperationRequest,
    RequestEnvelope, TextGenerationRequest, TextInput, TimestampGranularity,
    VideoAnalysisRequest,
};
pub use response::{
    AgeRange, AudioTranscriptionOutput, AudioTranslationOutput, BoundingBox, ChatCompletionOutput,
    DetectedFace, DetectedLabel, DetectedObject, DetectedText, EmbeddingOutput,
    FunctionCallingOutput, FunctionInvocation, ImageAnalysisOutput, ImageGenerationOutput,
    ModerationOutput, ModerationResult, ModerationSummary, OperationOutput, OperationResult,
    TextGenerationOutput, TranscriptSegment, TranscriptWord, Usage, VideoAnalysisOutput,
    VideoFace, VideoObject, VideoScene, VideoText,
};
pub use types::{ProviderKind, RequestId};
