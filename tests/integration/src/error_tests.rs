//! Error classification integration tests
//!
//! Every failure reaching the caller carries exactly one of the eight
//! error kinds.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_config::GatewayConfig;
use gateway_core::{ErrorKind, GatewayError, ProviderKind, TextGenerationRequest};
use std::collections::BTreeSet;
use std::time::Duration;

const A: ProviderKind = ProviderKind::OpenAi;
const B: ProviderKind = ProviderKind::Anthropic;

fn single(adapter: MockAdapter) -> TestGateway {
    TestGateway::new(gateway_config(&[A]), vec![adapter.shared()])
}

async fn failure(harness: &TestGateway, prompt: &str) -> GatewayError {
    harness
        .gateway
        .generate_text(fresh_text_request(prompt))
        .await
        .expect_err("request should fail")
}

/// Test invalid input is rejected before any provider call
#[tokio::test]
async fn test_validation_error() {
    let harness = single(MockAdapter::new(A));

    let err = failure(&harness, "").await;
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut request = TextGenerationRequest::new("hot");
    request.temperature = Some(3.5);
    let err = harness
        .gateway
        .generate_text(gateway_core::OperationRequest::new(request))
        .await
        .expect_err("temperature out of range");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(harness.calls(A), 0);
}

/// Test the last provider's authentication failure is surfaced
#[tokio::test]
async fn test_authentication_error() {
    let a = MockAdapter::new(A).with_default(MockStep::auth_error(A)).shared();
    let b = MockAdapter::new(B).with_default(MockStep::auth_error(B)).shared();
    let harness = TestGateway::new(gateway_config(&[A, B]), vec![a, b]);

    let err = failure(&harness, "secret").await;
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.provider_kind(), Some(B));
    assert_eq!(err.status_code(), Some(401));
    assert_eq!((harness.calls(A), harness.calls(B)), (1, 1));
}

/// Test exhausting every provider window surfaces RateLimitExceeded
#[tokio::test(start_paused = true)]
async fn test_rate_limit_error() {
    let config = GatewayConfig::default()
        .with_provider(provider_config(A).with_requests_per_minute(1));
    let harness = TestGateway::new(config, vec![MockAdapter::new(A).shared()]);

    harness.gateway.generate_text(fresh_text_request("one")).await.expect("first");
    let err = failure(&harness, "two").await;
    assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    assert_eq!(harness.calls(A), 1);
}

/// Test a hung provider times out and counts against its breaker
#[tokio::test(start_paused = true)]
async fn test_timeout_error() {
    let harness = single(MockAdapter::new(A).with_default(MockStep::Hang(Duration::from_secs(60))));

    let err = harness
        .gateway
        .generate_text(fresh_text_request("slow").with_timeout(Duration::from_secs(2)))
        .await
        .expect_err("timeout");
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.provider_kind(), Some(A));

    let snapshot = harness.gateway.statistics().circuit_breakers[&A].clone();
    assert_eq!(snapshot.window_failures, 1);
}

/// Test a timed-out provider falls back to the next candidate
#[tokio::test(start_paused = true)]
async fn test_timeout_triggers_fallback() {
    let a = MockAdapter::new(A).with_default(MockStep::Hang(Duration::from_secs(60))).shared();
    let harness = TestGateway::new(gateway_config(&[A, B]), vec![a, MockAdapter::new(B).shared()]);

    let result = harness
        .gateway
        .generate_text(fresh_text_request("slow").with_timeout(Duration::from_secs(2)))
        .await
        .expect("fallback");
    assert_eq!(result.provider, B);
}

/// Test an open circuit on the only candidate surfaces CircuitOpen
#[tokio::test(start_paused = true)]
async fn test_circuit_open_error() {
    let harness = single(MockAdapter::new(A).with_default(MockStep::server_error(A)));
    for i in 0..4 {
        failure(&harness, &format!("fail {i}")).await;
    }
    assert_eq!(failure(&harness, "blocked").await.kind(), ErrorKind::CircuitOpen);
}

/// Test a provider failure is surfaced verbatim
#[tokio::test]
async fn test_provider_error() {
    let harness = single(MockAdapter::new(A).with_default(MockStep::server_error(A)));
    let err = failure(&harness, "boom").await;

    assert_eq!(err.kind(), ErrorKind::Provider);
    assert_eq!(err.status_code(), Some(500));
    assert!(err.is_retryable());
}

/// Test transient failures are retried on the same provider when allowed
#[tokio::test(start_paused = true)]
async fn test_transient_failures_retried() {
    let a = MockAdapter::new(A)
        .with_script([MockStep::server_error(A), MockStep::server_error(A)])
        .shared();
    let harness = TestGateway::new(gateway_config(&[A, B]), vec![a, MockAdapter::new(B).shared()]);

    let result = harness
        .gateway
        .generate_text(fresh_text_request("retry").with_max_retries(2))
        .await
        .expect("retried");
    assert_eq!(result.provider, A);
    assert_eq!((harness.calls(A), harness.calls(B)), (3, 0));
}

/// Test authentication failures are never retried on the same provider
#[tokio::test(start_paused = true)]
async fn test_auth_failures_not_retried() {
    let harness = single(MockAdapter::new(A).with_default(MockStep::auth_error(A)));
    let err = harness
        .gateway
        .generate_text(fresh_text_request("auth").with_max_retries(3))
        .await
        .expect_err("auth");
    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(harness.calls(A), 1);
}

/// Test the budget ceiling short-circuits
#[tokio::test]
async fn test_budget_exceeded_error() {
    let config = gateway_config(&[A]).with_monthly_budget(0.0001);
    let harness = TestGateway::new(config, vec![MockAdapter::new(A).shared()]);

    harness.gateway.generate_text(fresh_text_request("spend")).await.expect("first");
    assert_eq!(failure(&harness, "more").await.kind(), ErrorKind::BudgetExceeded);
}

/// Test an adapter answering with the wrong output type is classified Unknown
#[tokio::test]
async fn test_unknown_error() {
    let harness = single(MockAdapter::new(A).with_default(MockStep::WrongOutput));
    assert_eq!(failure(&harness, "odd").await.kind(), ErrorKind::Unknown);
}

/// Test every failure path produces one of the eight kinds
#[tokio::test(start_paused = true)]
async fn test_error_taxonomy_is_closed() {
    let steps = [
        MockStep::auth_error(A),
        MockStep::server_error(A),
        MockStep::Fail(GatewayError::rate_limit(Some(A), "slow down")),
        MockStep::Hang(Duration::from_secs(120)),
        MockStep::WrongOutput,
    ];

    let mut kinds = BTreeSet::new();
    for step in steps {
        let harness = single(MockAdapter::new(A).with_default(step));
        let err = harness
            .gateway
            .generate_text(fresh_text_request("x").with_timeout(Duration::from_secs(1)))
            .await
            .expect_err("failure");
        kinds.insert(err.kind().as_str());
    }

    let allowed: BTreeSet<_> = [
        ErrorKind::Validation,
        ErrorKind::Authentication,
        ErrorKind::RateLimitExceeded,
        ErrorKind::Timeout,
        ErrorKind::CircuitOpen,
        ErrorKind::Provider,
        ErrorKind::BudgetExceeded,
        ErrorKind::Unknown,
    ]
    .iter()
    .map(ErrorKind::as_str)
    .collect();
    assert!(kinds.is_subset(&allowed));
    assert_eq!(kinds.len(), 5);
}
