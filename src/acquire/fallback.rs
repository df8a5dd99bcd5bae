// src/acquire/fallback.rs
//! Ordered provider fallback for one query. Stateless: cache substitution
//! on chain exhaustion belongs to the caller.

use metrics::counter;

use crate::acquire::retry::RetryExecutor;
use crate::acquire::types::{Provider, ProviderOutcome};

#[derive(Debug, Clone, Copy)]
pub struct FallbackOrchestrator {
    retry: RetryExecutor,
}

impl FallbackOrchestrator {
    pub fn new(retry: RetryExecutor) -> Self {
        Self { retry }
    }

    /// Try each provider in priority order, each through the retry executor,
    /// stopping at the first non-empty success. Exhausting the whole chain
    /// returns a failed outcome; it never panics past this boundary.
    pub async fn acquire(
        &self,
        chain: &[Box<dyn Provider>],
        keyword: &str,
        limit: usize,
    ) -> ProviderOutcome {
        for provider in chain {
            let outcome = self.retry.run(provider.as_ref(), keyword, limit).await;
            if outcome.succeeded() {
                counter!("acquire_items_total").increment(outcome.items().len() as u64);
                tracing::info!(
                    provider = provider.name(),
                    keyword,
                    items = outcome.items().len(),
                    "provider satisfied query"
                );
                return outcome;
            }
            counter!("acquire_fallbacks_total").increment(1);
            tracing::warn!(
                provider = provider.name(),
                keyword,
                "provider exhausted, falling back"
            );
        }

        tracing::warn!(keyword, "provider chain exhausted");
        ProviderOutcome::failure()
    }
}
