// src/acquire/providers/mod.rs
pub mod browser;
pub mod mirror;
pub mod official;
pub mod scraper;

use crate::acquire::types::Provider;
use crate::config::ProviderConfig;

/// Assemble the fallback chain in fixed priority order: browser first
/// (richest), official API last (most reliable). Providers with missing
/// prerequisites are still constructed; they report a capability failure at
/// call time so the chain's semantics stay uniform.
pub fn build_chain(cfg: &ProviderConfig) -> Vec<Box<dyn Provider>> {
    vec![
        Box::new(browser::BrowserProvider::from_endpoint(
            cfg.browser_endpoint.clone(),
        )),
        Box::new(scraper::ScraperProvider::new(cfg.scraper_command.clone())),
        Box::new(mirror::MirrorProvider::from_base_url(
            cfg.mirror_base_url.clone(),
        )),
        Box::new(official::OfficialProvider::from_credentials(
            cfg.official.clone(),
        )),
    ]
}
