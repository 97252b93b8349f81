//! Test fixtures and sample data for integration tests

use gateway_config::{GatewayConfig, ProviderConfig};
use gateway_core::{
    ChatCompletionRequest, ChatMessage, EmbeddingRequest, OperationRequest, ProviderKind,
    TextGenerationRequest, TextInput,
};

/// Provider entry with placeholder credentials
pub fn provider_config(kind: ProviderKind) -> ProviderConfig {
    ProviderConfig::new(kind)
        .with_api_key("test-key")
        .with_secret_key("test-secret")
}

/// Configuration enabling the given providers in order
pub fn gateway_config(kinds: &[ProviderKind]) -> GatewayConfig {
    kinds
        .iter()
        .fold(GatewayConfig::default(), |config, kind| config.with_provider(provider_config(*kind)))
}

/// Create a text generation request
pub fn text_request(prompt: &str) -> OperationRequest<TextGenerationRequest> {
    OperationRequest::new(TextGenerationRequest::new(prompt))
}

/// Create an uncached text generation request
pub fn fresh_text_request(prompt: &str) -> OperationRequest<TextGenerationRequest> {
    text_request(prompt).without_cache()
}

/// Create a chat request with system message
pub fn chat_request(system: &str, user: &str) -> OperationRequest<ChatCompletionRequest> {
    OperationRequest::new(ChatCompletionRequest::new(vec![
        ChatMessage::system(system),
        ChatMessage::user(user),
    ]))
}

/// Create an embedding request for a batch of texts
pub fn embedding_request(texts: &[&str]) -> OperationRequest<EmbeddingRequest> {
    OperationRequest::new(EmbeddingRequest::new(TextInput::Batch(
        texts.iter().map(ToString::to_string).collect(),
    )))
}
