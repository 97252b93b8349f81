//! Rate limiting integration tests
//!
//! A provider limit of 10/min gives each caller floor(10/3) = 3/min.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_config::GatewayConfig;
use gateway_core::{ErrorKind, ProviderKind};
use gateway_resilience::CircuitState;
use std::time::Duration;

const A: ProviderKind = ProviderKind::OpenAi;
const B: ProviderKind = ProviderKind::Cohere;

fn limited_config(with_fallback: bool) -> GatewayConfig {
    let config = GatewayConfig::default()
        .with_provider(provider_config(A).with_requests_per_minute(10));
    if with_fallback {
        config.with_provider(provider_config(B))
    } else {
        config
    }
}

/// Test a single caller gets exactly three of five requests
#[tokio::test(start_paused = true)]
async fn test_caller_share_of_provider_limit() {
    let harness = TestGateway::new(limited_config(false), vec![MockAdapter::new(A).shared()]);

    let mut accepted = 0;
    let mut rejected = 0;
    for i in 0..5 {
        match harness
            .gateway
            .generate_text(fresh_text_request(&format!("req {i}")).with_caller("user-1"))
            .await
        {
            Ok(_) => accepted += 1,
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::RateLimitExceeded);
                rejected += 1;
            }
        }
    }

    assert_eq!(accepted, 3);
    assert_eq!(rejected, 2);
    assert_eq!(harness.calls(A), 3);
}

/// Test rate-limited requests fall through to the next provider
#[tokio::test(start_paused = true)]
async fn test_rate_limited_provider_is_skipped() {
    let harness = TestGateway::new(
        limited_config(true),
        vec![MockAdapter::new(A).shared(), MockAdapter::new(B).shared()],
    );

    let mut providers = Vec::new();
    for i in 0..5 {
        let result = harness
            .gateway
            .generate_text(fresh_text_request(&format!("req {i}")).with_caller("user-1"))
            .await
            .expect("served");
        providers.push(result.provider);
    }

    assert_eq!(providers, vec![A, A, A, B, B]);
    assert_eq!(harness.calls(A), 3);
    assert_eq!(harness.calls(B), 2);
    assert_eq!(harness.breaker_state(A), Some(CircuitState::Closed));
}

/// Test callers have independent shares and the provider cap still applies
#[tokio::test(start_paused = true)]
async fn test_provider_limit_across_callers() {
    let harness = TestGateway::new(limited_config(false), vec![MockAdapter::new(A).shared()]);

    let mut accepted = 0;
    for caller in ["a", "b", "c", "d"] {
        for i in 0..3 {
            if harness
                .gateway
                .generate_text(fresh_text_request(&format!("{caller} {i}")).with_caller(caller))
                .await
                .is_ok()
            {
                accepted += 1;
            }
        }
    }

    assert_eq!(accepted, 10);
    assert_eq!(harness.calls(A), 10);
}

/// Test the window resets after a minute
#[tokio::test(start_paused = true)]
async fn test_window_resets() {
    let harness = TestGateway::new(limited_config(false), vec![MockAdapter::new(A).shared()]);

    for i in 0..4 {
        let _ = harness
            .gateway
            .generate_text(fresh_text_request(&format!("first {i}")).with_caller("user-1"))
            .await;
    }
    assert_eq!(harness.calls(A), 3);

    tokio::time::advance(Duration::from_secs(61)).await;
    harness
        .gateway
        .generate_text(fresh_text_request("next window").with_caller("user-1"))
        .await
        .expect("new window");
    assert_eq!(harness.calls(A), 4);
}

/// Test anonymous requests only count against the provider limit
#[tokio::test(start_paused = true)]
async fn test_anonymous_requests_use_provider_limit() {
    let harness = TestGateway::new(limited_config(false), vec![MockAdapter::new(A).shared()]);

    let mut accepted = 0;
    for i in 0..12 {
        if harness.gateway.generate_text(fresh_text_request(&format!("anon {i}"))).await.is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 10);
}
