//! # Gateway Providers
//!
//! Provider adapters for the AI Gateway.
//!
//! Each adapter translates canonical operation payloads into one vendor's
//! HTTP API and maps the reply back into canonical outputs:
//! - OpenAI and Azure OpenAI (text, chat, images, audio, embeddings, moderation, functions)
//! - Anthropic (text, chat)
//! - Google Generative Language (Gemini, embeddings, Imagen)
//! - Cohere (text, chat, embeddings)
//! - Stability AI (image generation)
//! - AWS Rekognition (image and video analysis)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anthropic;
pub mod cohere;
pub mod google;
pub mod http;
pub mod openai;
pub mod registry;
pub mod rekognition;
pub mod sigv4;
pub mod stability;

// Re-export main types
pub use anthropic::AnthropicAdapter;
pub use cohere::CohereAdapter;
pub use google::GoogleAdapter;
pub use openai::OpenAiAdapter;
pub use registry::{build_adapter, ProviderRegistry};
pub use rekognition::RekognitionAdapter;
pub use stability::StabilityAdapter;
