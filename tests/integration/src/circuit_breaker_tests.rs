//! Circuit breaker integration tests
//!
//! Defaults: 50% failure threshold over a 60s window (minimum 4 calls) and a
//! 30s reset timeout before the half-open probe.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_config::CircuitBreakerSettings;
use gateway_core::{ErrorKind, ProviderKind};
use gateway_resilience::CircuitState;
use std::time::Duration;

const A: ProviderKind = ProviderKind::OpenAi;
const B: ProviderKind = ProviderKind::Anthropic;

/// A fails three of its first four calls; B always succeeds
fn tripping_pair() -> TestGateway {
    let a = MockAdapter::new(A)
        .with_script([
            MockStep::Succeed,
            MockStep::server_error(A),
            MockStep::server_error(A),
            MockStep::server_error(A),
        ])
        .shared();
    TestGateway::new(gateway_config(&[A, B]), vec![a, MockAdapter::new(B).shared()])
}

async fn trip(harness: &TestGateway) {
    for i in 0..4 {
        harness
            .gateway
            .generate_text(fresh_text_request(&format!("trip {i}")))
            .await
            .expect("fallback serves");
    }
    assert_eq!(harness.calls(A), 4);
    assert_eq!(harness.calls(B), 3);
}

/// Test three failures out of four opens the circuit
#[tokio::test(start_paused = true)]
async fn test_breaker_opens_at_threshold() {
    let harness = tripping_pair();
    trip(&harness).await;

    assert_eq!(harness.breaker_state(A), Some(CircuitState::Open));
    let snapshot = harness.gateway.statistics().circuit_breakers[&A].clone();
    assert_eq!(snapshot.window_requests, 4);
    assert_eq!(snapshot.window_failures, 3);
    assert!((snapshot.window_failure_rate - 75.0).abs() < f64::EPSILON);
}

/// Test an open circuit is skipped without calling the provider
#[tokio::test(start_paused = true)]
async fn test_open_circuit_skips_provider() {
    let harness = tripping_pair();
    trip(&harness).await;

    tokio::time::advance(Duration::from_secs(29)).await;
    let result = harness.gateway.generate_text(fresh_text_request("skipped")).await.expect("B");

    assert_eq!(result.provider, B);
    assert_eq!(harness.calls(A), 4);
}

/// Test a successful probe after the reset timeout closes the circuit
#[tokio::test(start_paused = true)]
async fn test_successful_probe_closes_circuit() {
    let harness = tripping_pair();
    trip(&harness).await;

    tokio::time::advance(Duration::from_secs(31)).await;
    let result = harness.gateway.generate_text(fresh_text_request("probe")).await.expect("probe");

    assert_eq!(result.provider, A);
    assert_eq!(harness.calls(A), 5);
    assert_eq!(harness.breaker_state(A), Some(CircuitState::Closed));
}

/// Test a failed probe re-opens the circuit for another reset period
#[tokio::test(start_paused = true)]
async fn test_failed_probe_reopens_circuit() {
    let harness = tripping_pair();
    trip(&harness).await;
    harness.adapter(A).push([MockStep::server_error(A)]);

    tokio::time::advance(Duration::from_secs(31)).await;
    let result = harness.gateway.generate_text(fresh_text_request("probe")).await.expect("B");
    assert_eq!(result.provider, B);
    assert_eq!(harness.calls(A), 5);
    assert_eq!(harness.breaker_state(A), Some(CircuitState::Open));

    tokio::time::advance(Duration::from_secs(10)).await;
    harness.gateway.generate_text(fresh_text_request("still open")).await.expect("B");
    assert_eq!(harness.calls(A), 5);
}

/// Test every circuit open surfaces CircuitOpen
#[tokio::test(start_paused = true)]
async fn test_all_circuits_open() {
    let a = MockAdapter::new(A).with_default(MockStep::server_error(A)).shared();
    let harness = TestGateway::new(gateway_config(&[A]), vec![a]);

    for i in 0..4 {
        let err = harness
            .gateway
            .generate_text(fresh_text_request(&format!("fail {i}")))
            .await
            .expect_err("provider failing");
        assert_eq!(err.kind(), ErrorKind::Provider);
    }

    let err = harness
        .gateway
        .generate_text(fresh_text_request("blocked"))
        .await
        .expect_err("circuit open");
    assert_eq!(err.kind(), ErrorKind::CircuitOpen);
    assert_eq!(harness.calls(A), 4);
}

/// Test a disabled breaker never trips
#[tokio::test(start_paused = true)]
async fn test_disabled_breaker_always_allows() {
    let config = gateway_config(&[A]).with_circuit_breaker(CircuitBreakerSettings {
        enabled: false,
        ..CircuitBreakerSettings::default()
    });
    let a = MockAdapter::new(A).with_default(MockStep::server_error(A)).shared();
    let harness = TestGateway::new(config, vec![a]);

    for i in 0..6 {
        let err = harness
            .gateway
            .generate_text(fresh_text_request(&format!("fail {i}")))
            .await
            .expect_err("provider failing");
        assert_eq!(err.kind(), ErrorKind::Provider);
    }
    assert_eq!(harness.calls(A), 6);
}

/// Test failures outside the rolling window are forgotten
#[tokio::test(start_paused = true)]
async fn test_old_failures_leave_the_window() {
    let a = MockAdapter::new(A)
        .with_script([
            MockStep::server_error(A),
            MockStep::server_error(A),
            MockStep::server_error(A),
        ])
        .shared();
    let harness = TestGateway::new(gateway_config(&[A, B]), vec![a, MockAdapter::new(B).shared()]);

    for i in 0..3 {
        harness
            .gateway
            .generate_text(fresh_text_request(&format!("early {i}")))
            .await
            .expect("B serves");
    }
    tokio::time::advance(Duration::from_secs(61)).await;

    let result = harness.gateway.generate_text(fresh_text_request("late")).await.expect("A");
    assert_eq!(result.provider, A);
    assert_eq!(harness.breaker_state(A), Some(CircuitState::Closed));
}
