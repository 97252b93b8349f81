//! Cache integration tests
//!
//! Identical requests are served from the cache at zero cost until the TTL
//! elapses; volatile envelope fields never split the cache.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_config::CacheConfig;
use gateway_core::ProviderKind;
use std::time::Duration;

fn single_provider() -> TestGateway {
    TestGateway::new(
        gateway_config(&[ProviderKind::OpenAi]),
        vec![MockAdapter::new(ProviderKind::OpenAi).shared()],
    )
}

/// Test second identical request is a zero-cost cache hit
#[tokio::test]
async fn test_cache_hit_is_free() {
    let harness = single_provider();

    let first = harness.gateway.generate_text(text_request("What is 2+2?")).await.expect("first");
    let second = harness
        .gateway
        .generate_text(
            text_request("What is 2+2?")
                .with_request_id("second")
                .with_timeout(Duration::from_secs(5))
                .with_max_retries(2)
                .with_webhook("https://hooks.example.com/done"),
        )
        .await
        .expect("second");

    assert!(!first.from_cache);
    assert!(first.cost > 0.0);
    assert!(second.from_cache);
    assert!(second.cost.abs() < f64::EPSILON);
    assert_eq!(second.request_id.as_str(), "second");
    assert_eq!(second.payload, first.payload);
    assert_eq!(harness.calls(ProviderKind::OpenAi), 1);

    let stats = harness.gateway.statistics();
    assert!((stats.total_cost - first.cost).abs() < 1e-12);
}

/// Test different prompts do not share an entry
#[tokio::test]
async fn test_cache_different_requests() {
    let harness = single_provider();
    harness.gateway.generate_text(text_request("What is 2+2?")).await.expect("first");
    let other = harness.gateway.generate_text(text_request("What is 3+3?")).await.expect("second");

    assert!(!other.from_cache);
    assert_eq!(harness.calls(ProviderKind::OpenAi), 2);
}

/// Test caller identity is part of the cache key
#[tokio::test]
async fn test_cache_is_scoped_by_caller() {
    let harness = single_provider();
    harness
        .gateway
        .generate_text(text_request("shared").with_caller("alice"))
        .await
        .expect("alice");
    let bob = harness
        .gateway
        .generate_text(text_request("shared").with_caller("bob"))
        .await
        .expect("bob");

    assert!(!bob.from_cache);
    assert_eq!(harness.calls(ProviderKind::OpenAi), 2);
}

/// Test entries expire after the requested TTL
#[tokio::test(start_paused = true)]
async fn test_cache_entry_expires() {
    let harness = single_provider();
    let ttl = Duration::from_secs(60);

    harness
        .gateway
        .generate_text(text_request("ttl").with_cache_ttl(ttl))
        .await
        .expect("first");
    tokio::time::advance(Duration::from_secs(30)).await;
    let warm = harness.gateway.generate_text(text_request("ttl")).await.expect("warm");
    assert!(warm.from_cache);

    tokio::time::advance(Duration::from_secs(31)).await;
    let cold = harness.gateway.generate_text(text_request("ttl")).await.expect("cold");
    assert!(!cold.from_cache);
    assert_eq!(harness.calls(ProviderKind::OpenAi), 2);
}

/// Test use_cache=false neither reads nor writes
#[tokio::test]
async fn test_cache_bypass() {
    let harness = single_provider();
    harness.gateway.generate_text(fresh_text_request("bypass")).await.expect("first");
    let second = harness.gateway.generate_text(text_request("bypass")).await.expect("second");

    assert!(!second.from_cache);
    assert_eq!(harness.calls(ProviderKind::OpenAi), 2);
}

/// Test a disabled cache is a permanent miss
#[tokio::test]
async fn test_cache_disabled() {
    let config = gateway_config(&[ProviderKind::OpenAi]).with_cache(CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    });
    let harness = TestGateway::new(config, vec![MockAdapter::new(ProviderKind::OpenAi).shared()]);

    for _ in 0..3 {
        let result = harness.gateway.generate_text(text_request("same")).await.expect("result");
        assert!(!result.from_cache);
    }
    assert_eq!(harness.calls(ProviderKind::OpenAi), 3);
}

/// Test failed requests are not cached
#[tokio::test]
async fn test_failures_are_not_cached() {
    let adapter = MockAdapter::new(ProviderKind::OpenAi)
        .with_script([MockStep::server_error(ProviderKind::OpenAi)])
        .shared();
    let harness = TestGateway::new(gateway_config(&[ProviderKind::OpenAi]), vec![adapter]);

    assert!(harness.gateway.generate_text(text_request("flaky")).await.is_err());
    let retry = harness.gateway.generate_text(text_request("flaky")).await.expect("retry");
    assert!(!retry.from_cache);
    assert_eq!(harness.calls(ProviderKind::OpenAi), 2);
}
