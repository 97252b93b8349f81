//! Cost accounting integration tests

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use gateway_core::{ErrorKind, OperationType, ProviderKind, Usage};

const EPSILON: f64 = 1e-9;

/// Test flat cost is base cost times provider multiplier
#[tokio::test]
async fn test_flat_cost_accumulates() {
    let harness = TestGateway::new(
        gateway_config(&[ProviderKind::Anthropic]),
        vec![MockAdapter::new(ProviderKind::Anthropic).shared()],
    );

    let calls = 7;
    for i in 0..calls {
        let result = harness
            .gateway
            .generate_text(fresh_text_request(&format!("prompt {i}")))
            .await
            .expect("result");
        assert!((result.cost - 0.00024).abs() < EPSILON);
    }

    let stats = harness.gateway.statistics();
    let expected = f64::from(calls) * 0.00024;
    assert!((stats.total_cost - expected).abs() < EPSILON);
    assert!((stats.cost_by_provider[&ProviderKind::Anthropic] - expected).abs() < EPSILON);
    assert!((stats.cost_by_operation[&OperationType::TextGeneration] - expected).abs() < EPSILON);
}

/// Test split usage scales input and output tokens separately
#[tokio::test]
async fn test_usage_based_cost() {
    let adapter = MockAdapter::new(ProviderKind::OpenAi)
        .with_default(MockStep::SucceedWithUsage(Usage::split(1000, 1000)))
        .shared();
    let harness = TestGateway::new(gateway_config(&[ProviderKind::OpenAi]), vec![adapter]);

    let result = harness.gateway.generate_text(text_request("tokens")).await.expect("result");
    // 0.0002 * (0.5 * 1 + 1.5 * 1) * 1.0
    assert!((result.cost - 0.0004).abs() < EPSILON);
}

/// Test cost is attributed per caller and per operation
#[tokio::test]
async fn test_cost_breakdown() {
    let harness = TestGateway::new(
        gateway_config(&[ProviderKind::Cohere]),
        vec![MockAdapter::new(ProviderKind::Cohere).shared()],
    );

    harness
        .gateway
        .generate_text(fresh_text_request("a").with_caller("alice"))
        .await
        .expect("text");
    harness
        .gateway
        .chat_complete(chat_request("sys", "hi").with_caller("bob"))
        .await
        .expect("chat");

    let stats = harness.gateway.statistics();
    // 0.0002 * 0.7 and 0.0003 * 0.7
    assert!((stats.cost_by_caller["alice"] - 0.00014).abs() < EPSILON);
    assert!((stats.cost_by_caller["bob"] - 0.00021).abs() < EPSILON);
    assert!((stats.cost_by_operation[&OperationType::ChatCompletion] - 0.00021).abs() < EPSILON);
    assert!((stats.total_cost - 0.00035).abs() < EPSILON);
}

/// Test the request after the ceiling is reached fails before any provider call
#[tokio::test]
async fn test_budget_enforcement() {
    let config = gateway_config(&[ProviderKind::Anthropic]).with_monthly_budget(0.0005);
    let adapter = MockAdapter::new(ProviderKind::Anthropic).shared();
    let harness = TestGateway::new(config, vec![adapter]);

    for i in 0..3 {
        harness
            .gateway
            .generate_text(fresh_text_request(&format!("spend {i}")))
            .await
            .expect("under budget");
    }
    let err = harness
        .gateway
        .generate_text(fresh_text_request("over"))
        .await
        .expect_err("budget exhausted");

    assert_eq!(err.kind(), ErrorKind::BudgetExceeded);
    assert_eq!(harness.calls(ProviderKind::Anthropic), 3);

    let stats = harness.gateway.statistics();
    assert_eq!(stats.budget_remaining(), Some(0.0));
}

/// Test cached results are still served once the budget is exhausted
#[tokio::test]
async fn test_cache_hits_survive_budget() {
    let config = gateway_config(&[ProviderKind::Anthropic]).with_monthly_budget(0.0002);
    let adapter = MockAdapter::new(ProviderKind::Anthropic).shared();
    let harness = TestGateway::new(config, vec![adapter]);

    harness.gateway.generate_text(text_request("cached")).await.expect("first");
    let hit = harness.gateway.generate_text(text_request("cached")).await.expect("cache hit");
    assert!(hit.from_cache);

    let err = harness
        .gateway
        .generate_text(text_request("uncached"))
        .await
        .expect_err("budget exhausted");
    assert_eq!(err.kind(), ErrorKind::BudgetExceeded);
}

/// Test resetting the ledger re-opens the budget
#[tokio::test]
async fn test_reset_cost_ledger() {
    let config = gateway_config(&[ProviderKind::Anthropic]).with_monthly_budget(0.0002);
    let adapter = MockAdapter::new(ProviderKind::Anthropic).shared();
    let harness = TestGateway::new(config, vec![adapter]);

    harness.gateway.generate_text(fresh_text_request("one")).await.expect("first");
    assert!(harness.gateway.generate_text(fresh_text_request("two")).await.is_err());

    harness.gateway.reset_cost_ledger();
    assert!(harness.gateway.statistics().total_cost.abs() < EPSILON);
    harness.gateway.generate_text(fresh_text_request("three")).await.expect("after reset");
}

/// Test concurrent requests never lose a ledger update
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cost_accounting() {
    let harness = TestGateway::new(
        gateway_config(&[ProviderKind::OpenAi]),
        vec![MockAdapter::new(ProviderKind::OpenAi).shared()],
    );

    let mut handles = Vec::new();
    for i in 0..50 {
        let gateway = harness.gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway.generate_text(fresh_text_request(&format!("parallel {i}"))).await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("result");
    }

    assert_eq!(harness.calls(ProviderKind::OpenAi), 50);
    assert!((harness.gateway.statistics().total_cost - 50.0 * 0.0002).abs() < EPSILON);
}
