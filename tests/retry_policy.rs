// tests/retry_policy.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use sentiment_harvester::acquire::retry::RetryExecutor;
use sentiment_harvester::{Provider, RawItem, SourceKind};

/// Fails the first `fail_times` calls, then returns one item per call.
struct FlakyProvider {
    fail_times: usize,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Provider for FlakyProvider {
    async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<RawItem>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.fail_times {
            bail!("simulated outage (call {call})");
        }
        Ok(vec![RawItem::new(SourceKind::Mirror, "1", "recovered")])
    }
    fn name(&self) -> &'static str {
        "flaky"
    }
    fn kind(&self) -> SourceKind {
        SourceKind::Mirror
    }
}

#[tokio::test]
async fn invokes_at_most_n_times_then_fails() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = FlakyProvider {
        fail_times: usize::MAX,
        calls: calls.clone(),
    };

    let executor = RetryExecutor::new(3, Duration::from_millis(1));
    let outcome = executor.run(&provider, "stocks", 10).await;

    assert!(!outcome.succeeded());
    assert!(outcome.items().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn returns_on_first_success_without_further_attempts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = FlakyProvider {
        fail_times: 1,
        calls: calls.clone(),
    };

    let executor = RetryExecutor::new(5, Duration::from_millis(1));
    let outcome = executor.run(&provider, "stocks", 10).await;

    assert!(outcome.succeeded());
    assert_eq!(outcome.items().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// An `Ok` with zero items must behave exactly like a failure.
struct EmptyOkProvider {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Provider for EmptyOkProvider {
    async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<RawItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    }
    fn name(&self) -> &'static str {
        "empty-ok"
    }
    fn kind(&self) -> SourceKind {
        SourceKind::Mirror
    }
}

#[tokio::test]
async fn empty_success_is_retried_and_ends_as_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = EmptyOkProvider {
        calls: calls.clone(),
    };

    let executor = RetryExecutor::new(3, Duration::from_millis(1));
    let outcome = executor.run(&provider, "stocks", 10).await;

    assert!(!outcome.succeeded());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
