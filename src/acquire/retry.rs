// src/acquire/retry.rs
//! Bounded retries with exponential backoff around a single provider.

use std::time::Duration;

use metrics::counter;

use crate::acquire::types::{Provider, ProviderOutcome};

/// Retry policy for one provider call: up to `retries` attempts, sleeping
/// `base_delay * 2^attempt` between them (attempt counted from 1). Growth is
/// strictly exponential; `max_delay` only bounds the worst-case wait and
/// never changes success/failure semantics.
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Option<Duration>,
}

impl RetryExecutor {
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries: retries.max(1),
            base_delay,
            max_delay: None,
        }
    }

    pub fn with_max_delay(mut self, cap: Duration) -> Self {
        self.max_delay = Some(cap);
        self
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Drive one provider until it yields items or the attempt budget is
    /// spent. Returns on the first success without further invocations.
    pub async fn run(&self, provider: &dyn Provider, query: &str, limit: usize) -> ProviderOutcome {
        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 1..=self.retries {
            match provider.fetch(query, limit).await {
                Ok(items) if !items.is_empty() => {
                    return ProviderOutcome::from_items(items);
                }
                Ok(_) => {
                    // Empty success falls through to the next attempt.
                    last_error = Some(anyhow::anyhow!("provider returned no items"));
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }

            counter!("acquire_provider_errors_total").increment(1);
            tracing::debug!(
                provider = provider.name(),
                query,
                attempt,
                error = ?last_error,
                "provider attempt failed"
            );

            if attempt < self.retries {
                counter!("acquire_retries_total").increment(1);
                tokio::time::sleep(self.delay_for_attempt(attempt)).await;
            }
        }

        tracing::warn!(
            provider = provider.name(),
            query,
            attempts = self.retries,
            error = ?last_error,
            "provider exhausted its retry budget"
        );
        ProviderOutcome::failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_per_attempt() {
        let r = RetryExecutor::new(3, Duration::from_millis(100));
        assert_eq!(r.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(r.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(r.delay_for_attempt(3), Duration::from_millis(800));
    }

    #[test]
    fn cap_bounds_the_wait() {
        let r = RetryExecutor::new(5, Duration::from_secs(1)).with_max_delay(Duration::from_secs(3));
        assert_eq!(r.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(r.delay_for_attempt(2), Duration::from_secs(3));
        assert_eq!(r.delay_for_attempt(4), Duration::from_secs(3));
    }

    #[test]
    fn at_least_one_attempt() {
        let r = RetryExecutor::new(0, Duration::from_millis(1));
        assert_eq!(r.retries, 1);
    }
}
