// src/acquire/mod.rs
//! The acquisition pipeline: keywords in, deduplicated + normalized text
//! corpus out. Per keyword the orchestrator walks the provider chain; live
//! results are persisted through the deduplicated store; on chain exhaustion
//! the keyword's cached history is substituted. No failure in here is fatal
//! to the run — the service degrades per keyword.

pub mod fallback;
pub mod providers;
pub mod retry;
pub mod store;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::acquire::fallback::FallbackOrchestrator;
use crate::acquire::retry::RetryExecutor;
use crate::acquire::store::DeduplicatedStore;
use crate::acquire::types::Provider;
use crate::config::HarvestConfig;
use crate::normalize::normalize_text;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("acquire_items_total", "Items returned by a winning provider.");
        describe_counter!(
            "acquire_items_parsed_total",
            "Items mapped out of provider payloads."
        );
        describe_counter!("acquire_provider_errors_total", "Failed provider attempts.");
        describe_counter!("acquire_retries_total", "Backoff retries performed.");
        describe_counter!(
            "acquire_fallbacks_total",
            "Providers exhausted and skipped over."
        );
        describe_counter!("acquire_cache_hits_total", "Keywords served from cache.");
        describe_counter!(
            "acquire_cache_misses_total",
            "Keywords with no live data and no cache."
        );
        describe_counter!(
            "store_records_written_total",
            "New records appended to the store."
        );
        describe_gauge!("acquire_last_run_ts", "Unix ts when acquisition last ran.");
    });
}

/// Terminal state of one keyword within one run. A failed keyword is not
/// retried until the next external invocation of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordState {
    LiveSuccess,
    CacheHit,
    CacheMiss,
}

#[derive(Debug, Clone)]
pub struct KeywordReport {
    pub state: KeywordState,
    pub texts: Vec<String>,
}

/// Public entry point of the pipeline. All configuration is explicit; the
/// provider chain and store are fixed at construction.
pub struct AcquisitionService {
    chain: Arc<Vec<Box<dyn Provider>>>,
    store: Arc<DeduplicatedStore>,
    orchestrator: FallbackOrchestrator,
    limit: usize,
    max_concurrent: usize,
    overall_deadline: Option<Duration>,
}

impl AcquisitionService {
    pub fn new(cfg: &HarvestConfig) -> Self {
        Self::with_chain(cfg, providers::build_chain(&cfg.providers))
    }

    /// Build the service around an explicit provider chain. Tests inject
    /// mock providers this way.
    pub fn with_chain(cfg: &HarvestConfig, chain: Vec<Box<dyn Provider>>) -> Self {
        let mut retry = RetryExecutor::new(cfg.retries, cfg.base_delay());
        if let Some(cap) = cfg.max_delay() {
            retry = retry.with_max_delay(cap);
        }
        Self {
            chain: Arc::new(chain),
            store: Arc::new(DeduplicatedStore::new(cfg.cache_dir.clone())),
            orchestrator: FallbackOrchestrator::new(retry),
            limit: cfg.limit,
            max_concurrent: cfg.max_concurrent,
            overall_deadline: cfg.overall_deadline_secs.map(Duration::from_secs),
        }
    }

    /// Run the whole pipeline for a set of keywords. Keywords are
    /// independent: each reaches exactly one terminal state and no keyword's
    /// failure affects another. Keywords not finished when the overall
    /// deadline expires are abandoned and reported as `CacheMiss`.
    pub async fn acquire_for_keywords(
        &self,
        keywords: &[String],
    ) -> BTreeMap<String, KeywordReport> {
        ensure_metrics_described();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<(String, KeywordReport)> = JoinSet::new();

        for keyword in keywords {
            let keyword = keyword.clone();
            let chain = Arc::clone(&self.chain);
            let store = Arc::clone(&self.store);
            let orchestrator = self.orchestrator;
            let limit = self.limit;
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                // Acquire fails only when the semaphore is closed, which
                // means the run is being abandoned anyway.
                let _permit = semaphore.acquire_owned().await.ok();
                let report = acquire_one(&chain, orchestrator, &store, &keyword, limit).await;
                (keyword, report)
            });
        }

        let mut reports: BTreeMap<String, KeywordReport> = BTreeMap::new();
        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((keyword, report)) => {
                        reports.insert(keyword, report);
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "keyword task failed to join");
                    }
                }
            }
        };

        match self.overall_deadline {
            Some(deadline) => {
                if tokio::time::timeout(deadline, drain).await.is_err() {
                    tracing::error!(
                        deadline_secs = deadline.as_secs(),
                        "overall deadline expired, abandoning in-flight keywords"
                    );
                }
            }
            None => drain.await,
        }

        // Anything not in a terminal state is reported, never left hanging.
        for keyword in keywords {
            reports.entry(keyword.clone()).or_insert_with(|| {
                counter!("acquire_cache_misses_total").increment(1);
                KeywordReport {
                    state: KeywordState::CacheMiss,
                    texts: Vec::new(),
                }
            });
        }

        gauge!("acquire_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
        reports
    }

    /// The corpus the sentiment consumer reads: every keyword's normalized
    /// texts, flattened in keyword order.
    pub fn flatten(reports: &BTreeMap<String, KeywordReport>) -> Vec<String> {
        reports
            .values()
            .flat_map(|r| r.texts.iter().cloned())
            .collect()
    }
}

async fn acquire_one(
    chain: &[Box<dyn Provider>],
    orchestrator: FallbackOrchestrator,
    store: &DeduplicatedStore,
    keyword: &str,
    limit: usize,
) -> KeywordReport {
    let outcome = orchestrator.acquire(chain, keyword, limit).await;

    // A successful outcome always carries at least one item; all items of
    // one outcome come from the winning provider.
    if let Some(first) = outcome.items().first() {
        let kind = first.source_kind;
        match store.append(keyword, kind, outcome.items()).await {
            Ok(written) => {
                tracing::info!(keyword, source = %kind, written, "persisted live items");
            }
            Err(e) => {
                // Downstream scoring is not blocked by cache-write problems;
                // the fetched items are still surfaced.
                tracing::error!(error = ?e, keyword, source = %kind, "store write failed");
            }
        }
        let texts = outcome
            .items()
            .iter()
            .map(|it| normalize_text(&it.content))
            .filter(|t| !t.is_empty())
            .collect();
        return KeywordReport {
            state: KeywordState::LiveSuccess,
            texts,
        };
    }

    match store.read_all_for_keyword(keyword).await {
        Ok(cached) if !cached.is_empty() => {
            tracing::warn!(
                keyword,
                records = cached.len(),
                "live acquisition failed, using cached history"
            );
            counter!("acquire_cache_hits_total").increment(1);
            let texts = cached
                .iter()
                .map(|it| normalize_text(&it.content))
                .filter(|t| !t.is_empty())
                .collect();
            KeywordReport {
                state: KeywordState::CacheHit,
                texts,
            }
        }
        Ok(_) => {
            tracing::error!(keyword, "no live data and no cached history");
            counter!("acquire_cache_misses_total").increment(1);
            KeywordReport {
                state: KeywordState::CacheMiss,
                texts: Vec::new(),
            }
        }
        Err(e) => {
            tracing::error!(error = ?e, keyword, "cache read failed");
            counter!("acquire_cache_misses_total").increment(1);
            KeywordReport {
                state: KeywordState::CacheMiss,
                texts: Vec::new(),
            }
        }
    }
}
