//! Canonical operation categories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical category of AI request, independent of provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationType {
    /// Single-prompt text generation
    TextGeneration,
    /// Multi-turn chat completion
    ChatCompletion,
    /// Text-to-image generation
    ImageGeneration,
    /// Object, face, label, text and moderation detection on an image
    ImageAnalysis,
    /// Timestamped detection on a stored video
    VideoAnalysis,
    /// Speech-to-text in the source language
    AudioTranscription,
    /// Speech-to-text into a target language
    AudioTranslation,
    /// Vector embeddings
    Embedding,
    /// Content moderation classification
    Moderation,
    /// Chat completion constrained to declared functions
    FunctionCalling,
}

impl OperationType {
    /// All operation types
    pub const ALL: [Self; 10] = [
        Self::TextGeneration,
        Self::ChatCompletion,
        Self::ImageGeneration,
        Self::ImageAnalysis,
        Self::VideoAnalysis,
        Self::AudioTranscription,
        Self::AudioTranslation,
        Self::Embedding,
        Self::Moderation,
        Self::FunctionCalling,
    ];

    /// Stable string id, also used as the cache key namespace
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TextGeneration => "text-generation",
            Self::ChatCompletion => "chat-completion",
            Self::ImageGeneration => "image-generation",
            Self::ImageAnalysis => "image-analysis",
            Self::VideoAnalysis => "video-analysis",
            Self::AudioTranscription => "audio-transcription",
            Self::AudioTranslation => "audio-translation",
            Self::Embedding => "embedding",
            Self::Moderation => "moderation",
            Self::FunctionCalling => "function-calling",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = crate::error::GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| {
                crate::error::GatewayError::validation(
                    format!("Unknown operation type: {s}"),
                    Some("operation".to_string()),
                    "unknown_operation",
                )
            })
    }
}
