//! Routing integration tests
//!
//! Candidate order follows configuration, filtered by operation support,
//! with a preferred provider moved to the front.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_core::{OperationType, ProviderKind};

const A: ProviderKind = ProviderKind::OpenAi;
const B: ProviderKind = ProviderKind::Anthropic;
const C: ProviderKind = ProviderKind::Google;

fn healthy_trio() -> TestGateway {
    TestGateway::new(
        gateway_config(&[A, B, C]),
        vec![
            MockAdapter::new(A).shared(),
            MockAdapter::new(B).shared(),
            MockAdapter::new(C).shared(),
        ],
    )
}

/// Test the first configured provider serves when healthy
#[tokio::test]
async fn test_configuration_order() {
    let harness = healthy_trio();
    let result = harness.gateway.generate_text(text_request("Hello")).await.expect("result");

    assert_eq!(result.provider, A);
    assert_eq!(result.payload.text, "openai reply");
    assert_eq!((harness.calls(A), harness.calls(B), harness.calls(C)), (1, 0, 0));
}

/// Test an open circuit on A routes to B and never touches C
#[tokio::test(start_paused = true)]
async fn test_fallback_skips_open_circuit() {
    let a = MockAdapter::new(A).with_default(MockStep::server_error(A)).shared();
    let harness = TestGateway::new(
        gateway_config(&[A, B, C]),
        vec![a, MockAdapter::new(B).shared(), MockAdapter::new(C).shared()],
    );

    for i in 0..4 {
        harness
            .gateway
            .generate_text(fresh_text_request(&format!("warmup {i}")))
            .await
            .expect("B serves");
    }
    assert_eq!(harness.calls(A), 4);

    let result = harness.gateway.generate_text(fresh_text_request("routed")).await.expect("B");
    assert_eq!(result.provider, B);
    assert_eq!(harness.calls(A), 4);
    assert_eq!(harness.calls(B), 5);
    assert_eq!(harness.calls(C), 0);
}

/// Test the preferred provider is tried first
#[tokio::test]
async fn test_preferred_provider_precedence() {
    let harness = healthy_trio();
    let result = harness
        .gateway
        .generate_text(text_request("Hello").with_preferred_provider(C))
        .await
        .expect("result");

    assert_eq!(result.provider, C);
    assert_eq!((harness.calls(A), harness.calls(B), harness.calls(C)), (0, 0, 1));
}

/// Test a failing preferred provider falls back to configuration order
#[tokio::test]
async fn test_preferred_provider_failure_falls_back() {
    let c = MockAdapter::new(C).with_script([MockStep::server_error(C)]).shared();
    let harness = TestGateway::new(
        gateway_config(&[A, B, C]),
        vec![MockAdapter::new(A).shared(), MockAdapter::new(B).shared(), c],
    );

    let result = harness
        .gateway
        .generate_text(text_request("Hello").with_preferred_provider(C))
        .await
        .expect("result");

    assert_eq!(result.provider, A);
    assert_eq!((harness.calls(A), harness.calls(B), harness.calls(C)), (1, 0, 1));
}

/// Test a preferred provider that cannot serve the operation is ignored
#[tokio::test]
async fn test_preferred_provider_without_capability() {
    let c = MockAdapter::new(C)
        .with_operations(&[OperationType::ImageGeneration])
        .shared();
    let harness = TestGateway::new(
        gateway_config(&[A, B, C]),
        vec![MockAdapter::new(A).shared(), MockAdapter::new(B).shared(), c],
    );

    let result = harness
        .gateway
        .generate_text(text_request("Hello").with_preferred_provider(C))
        .await
        .expect("result");

    assert_eq!(result.provider, A);
    assert_eq!(harness.calls(C), 0);
}

/// Test only providers declaring the operation are candidates
#[tokio::test]
async fn test_operation_support_filters_candidates() {
    let a = MockAdapter::new(A)
        .with_operations(&[OperationType::TextGeneration])
        .shared();
    let harness = TestGateway::new(gateway_config(&[A, B]), vec![a, MockAdapter::new(B).shared()]);

    let result = harness
        .gateway
        .create_embedding(embedding_request(&["one", "two"]))
        .await
        .expect("embedding");

    assert_eq!(result.provider, B);
    assert_eq!(result.payload.embeddings.len(), 2);
    assert_eq!(harness.calls(A), 0);
}

/// Test each fallback step calls one provider at a time and stops at the first success
#[tokio::test]
async fn test_first_success_wins() {
    let a = MockAdapter::new(A).with_script([MockStep::auth_error(A)]).shared();
    let b = MockAdapter::new(B).with_script([MockStep::server_error(B)]).shared();
    let harness = TestGateway::new(
        gateway_config(&[A, B, C]),
        vec![a, b, MockAdapter::new(C).shared()],
    );

    let result = harness
        .gateway
        .chat_complete(chat_request("Be brief.", "Hi"))
        .await
        .expect("chat");

    assert_eq!(result.provider, C);
    assert_eq!(result.payload.message.content, "google reply");
    assert_eq!((harness.calls(A), harness.calls(B), harness.calls(C)), (1, 1, 1));
}
