//! End-to-end integration tests
//!
//! Real provider adapters talking to wiremock servers through the full
//! gateway pipeline.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_config::{GatewayConfig, LoggingConfig, ProviderConfig};
use gateway_core::{
    ErrorKind, ModerationRequest, OperationInput, OperationRequest, ProviderKind, TextInput,
};
use gateway_service::AiGateway;

fn openai(server: &MockOpenAI) -> ProviderConfig {
    ProviderConfig::new(ProviderKind::OpenAi)
        .with_api_key("sk-test")
        .with_base_url(server.url())
}

fn anthropic(server: &MockAnthropic) -> ProviderConfig {
    ProviderConfig::new(ProviderKind::Anthropic)
        .with_api_key("sk-ant-test")
        .with_base_url(server.url())
}

fn gateway(config: GatewayConfig) -> AiGateway {
    init_tracing();
    AiGateway::builder().config(config).build().expect("gateway")
}

/// Test a chat completion through the OpenAI adapter
#[tokio::test]
async fn test_openai_chat_completion() {
    let server = MockOpenAI::new().await;
    server.mock_chat_completion("Hello from OpenAI").await;
    let gateway = gateway(GatewayConfig::default().with_provider(openai(&server)));

    let result = gateway
        .chat_complete(chat_request("Be brief.", "Hi").with_caller("e2e"))
        .await
        .expect("chat");

    assert_eq!(result.provider, ProviderKind::OpenAi);
    assert_eq!(result.payload.message.content, "Hello from OpenAI");
    assert_eq!(result.payload.usage.and_then(|u| u.total_tokens), Some(30));
    assert!(result.cost > 0.0);
    assert!(result.raw_response.is_none());
    assert_eq!(server.calls().await, 1);
}

/// Test an OpenAI outage falls back to Anthropic
#[tokio::test]
async fn test_fallback_to_anthropic() {
    let primary = MockOpenAI::new().await;
    primary.mock_server_error().await;
    let secondary = MockAnthropic::new().await;
    secondary.mock_messages("Hello from Claude").await;

    let gateway = gateway(
        GatewayConfig::default()
            .with_provider(openai(&primary))
            .with_provider(anthropic(&secondary)),
    );

    let result = gateway.generate_text(text_request("Hi")).await.expect("fallback");
    assert_eq!(result.provider, ProviderKind::Anthropic);
    assert_eq!(result.payload.text, "Hello from Claude");
    assert_eq!(primary.calls().await, 1);
    assert_eq!(secondary.calls().await, 1);

    let stats = gateway.statistics();
    let openai_breaker = &stats.circuit_breakers[&ProviderKind::OpenAi];
    assert_eq!(openai_breaker.window_failures, 1);
    assert!(stats.cost_by_provider.contains_key(&ProviderKind::Anthropic));
    assert!(!stats.cost_by_provider.contains_key(&ProviderKind::OpenAi));
}

/// Test a rejected API key surfaces an authentication error
#[tokio::test]
async fn test_authentication_failure() {
    let server = MockOpenAI::new().await;
    server.mock_auth_error().await;
    let gateway = gateway(GatewayConfig::default().with_provider(openai(&server)));

    let err = gateway.generate_text(text_request("Hi")).await.expect_err("auth");
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.provider_kind(), Some(ProviderKind::OpenAi));
}

/// Test moderation is only routed to providers that support it
#[tokio::test]
async fn test_moderation_routes_to_openai() {
    let openai_server = MockOpenAI::new().await;
    openai_server.mock_moderation(true).await;
    let anthropic_server = MockAnthropic::new().await;

    let gateway = gateway(
        GatewayConfig::default()
            .with_provider(anthropic(&anthropic_server))
            .with_provider(openai(&openai_server)),
    );

    let result = gateway
        .moderate(OperationRequest::new(ModerationRequest::new(TextInput::Single(
            "something violent".to_string(),
        ))))
        .await
        .expect("moderation");

    assert_eq!(result.provider, ProviderKind::OpenAi);
    assert!(result.payload.results[0].flagged);
    assert_eq!(anthropic_server.calls().await, 0);
}

/// Test provider payloads are attached only when response logging is on
#[tokio::test]
async fn test_raw_response_logging() {
    let server = MockOpenAI::new().await;
    server.mock_chat_completion("raw").await;
    let mut config = GatewayConfig::default().with_provider(openai(&server));
    config.logging = LoggingConfig {
        log_responses: true,
        ..LoggingConfig::default()
    };
    let gateway = gateway(config);

    let result = gateway.chat_complete(chat_request("sys", "Hi")).await.expect("chat");
    let raw = result.raw_response.expect("raw response");
    assert_eq!(raw["id"], "chatcmpl-test");
}

/// Test a JSON-lines batch entry runs through dispatch
#[tokio::test]
async fn test_dispatch_batch_line() {
    let server = MockAnthropic::new().await;
    server.mock_messages("batched").await;
    let gateway = gateway(GatewayConfig::default().with_provider(anthropic(&server)));

    let line = r#"{"operation":"chat-completion","messages":[{"role":"user","content":"Hi"}],"caller_id":"batch","cache_ttl":"5m"}"#;
    let request: OperationRequest<OperationInput> = serde_json::from_str(line).expect("parse");
    let value = gateway.dispatch(request).await.expect("dispatch");

    assert_eq!(value["provider"], "anthropic");
    assert_eq!(value["message"]["content"], "batched");
    assert_eq!(value["success"], true);

    let again: OperationRequest<OperationInput> = serde_json::from_str(line).expect("parse");
    let cached = gateway.dispatch(again).await.expect("dispatch");
    assert_eq!(cached["from_cache"], true);
    assert_eq!(server.calls().await, 1);
}

/// Test request outcomes are exported as Prometheus metrics
#[tokio::test]
async fn test_metrics_exposition() {
    let server = MockOpenAI::new().await;
    server.mock_chat_completion("metrics").await;
    let gateway = gateway(GatewayConfig::default().with_provider(openai(&server)));

    gateway.chat_complete(chat_request("sys", "Hi")).await.expect("chat");
    gateway.chat_complete(chat_request("sys", "Hi")).await.expect("cached");

    let text = gateway.metrics().gather_text();
    assert!(text.contains("ai_gateway_requests_total"));
    assert!(text.contains("outcome=\"cache_hit\""));
    assert!(text.contains("ai_gateway_cost_usd_total"));
}
