//! Harvester — Binary Entrypoint
//! Runs one acquisition pass over the configured keywords and logs a
//! per-keyword summary. Scheduling belongs to the caller (cron, systemd
//! timer); this binary deliberately runs exactly once.

use sentiment_harvester::{AcquisitionService, HarvestConfig, KeywordState};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sentiment_harvester=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent. This lets
    // HARVESTER_CLIENT_ID / HARVESTER_CLIENT_SECRET come from .env.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = HarvestConfig::load_default()?;
    let keywords = config.cleaned_keywords();
    if keywords.is_empty() {
        tracing::warn!("no keywords configured, nothing to do");
        return Ok(());
    }

    let service = AcquisitionService::new(&config);
    let reports = service.acquire_for_keywords(&keywords).await;

    for (keyword, report) in &reports {
        let state = match report.state {
            KeywordState::LiveSuccess => "live_success",
            KeywordState::CacheHit => "cache_hit",
            KeywordState::CacheMiss => "cache_miss",
        };
        tracing::info!(
            keyword = keyword.as_str(),
            state,
            texts = report.texts.len(),
            "keyword finished"
        );
    }

    let corpus = AcquisitionService::flatten(&reports);
    tracing::info!(total_texts = corpus.len(), "acquisition run complete");
    Ok(())
}
