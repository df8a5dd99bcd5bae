// src/config.rs
//! Explicit run configuration. Everything the pipeline needs is passed in
//! at construction; nothing is loaded from module-level globals.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub const ENV_CONFIG_PATH: &str = "HARVESTER_CONFIG_PATH";
pub const ENV_CLIENT_ID: &str = "HARVESTER_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "HARVESTER_CLIENT_SECRET";

const DEFAULT_CONFIG_PATH: &str = "config/harvester.toml";

/// Credentials passed through to the official-API provider. The pipeline
/// does no auth-flow management beyond handing these over.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfficialCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Per-provider wiring. Absent endpoints are fine: the provider is still
/// placed in the chain and reports a capability failure at call time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub browser_endpoint: Option<String>,
    pub scraper_command: String,
    pub mirror_base_url: Option<String>,
    pub official: OfficialCredentials,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            browser_endpoint: None,
            scraper_command: "snscrape".to_string(),
            mirror_base_url: None,
            official: OfficialCredentials::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub keywords: Vec<String>,
    /// Per-keyword, per-run item cap.
    pub limit: usize,
    /// Total attempts per provider.
    pub retries: u32,
    /// Base backoff delay in seconds.
    pub delay_secs: f64,
    /// Optional cap on a single backoff sleep.
    pub max_delay_secs: Option<f64>,
    pub cache_dir: String,
    /// Parallel keyword tasks.
    pub max_concurrent: usize,
    /// Optional whole-run deadline.
    pub overall_deadline_secs: Option<u64>,
    pub providers: ProviderConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            limit: 50,
            retries: 3,
            delay_secs: 1.0,
            max_delay_secs: None,
            cache_dir: "cache".to_string(),
            max_concurrent: 4,
            overall_deadline_secs: None,
            providers: ProviderConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Load from an explicit TOML path.
    pub fn from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: HarvestConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $HARVESTER_CONFIG_PATH
    /// 2) config/harvester.toml
    /// 3) built-in defaults (env credential overrides still apply)
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = std::path::PathBuf::from(p);
            if pb.exists() {
                return Self::from_toml(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default = std::path::PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::from_toml(&default);
        }
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Env credentials take precedence over whatever the TOML carried.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var(ENV_CLIENT_ID) {
            if !id.trim().is_empty() {
                self.providers.official.client_id = Some(id);
            }
        }
        if let Ok(secret) = std::env::var(ENV_CLIENT_SECRET) {
            if !secret.trim().is_empty() {
                self.providers.official.client_secret = Some(secret);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retries == 0 {
            return Err(anyhow!("retries must be at least 1"));
        }
        if self.delay_secs <= 0.0 {
            return Err(anyhow!("delay_secs must be positive"));
        }
        if self.limit == 0 {
            return Err(anyhow!("limit must be positive"));
        }
        if self.max_concurrent == 0 {
            return Err(anyhow!("max_concurrent must be positive"));
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(anyhow!("keywords must be non-empty strings"));
        }
        Ok(())
    }

    /// Keywords trimmed, de-blanked, first occurrence kept in order.
    pub fn cleaned_keywords(&self) -> Vec<String> {
        let mut seen = std::collections::BTreeSet::new();
        self.keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect()
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs)
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay_secs.map(Duration::from_secs_f64)
    }
}
