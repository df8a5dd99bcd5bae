// src/acquire/types.rs
use std::collections::BTreeMap;

use anyhow::Result;

/// Which external source produced an item. Order is the fallback priority:
/// richest first, most reliable last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum SourceKind {
    Browser,
    Scraper,
    Mirror,
    Official,
}

impl SourceKind {
    /// Label used in store file names and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Browser => "browser",
            SourceKind::Scraper => "scraper",
            SourceKind::Mirror => "mirror",
            SourceKind::Official => "official",
        }
    }

    /// All kinds in fallback-priority order.
    pub fn all() -> [SourceKind; 4] {
        [
            SourceKind::Browser,
            SourceKind::Scraper,
            SourceKind::Mirror,
            SourceKind::Official,
        ]
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One post as a provider returned it, before normalization.
///
/// `natural_key` is the provider-assigned identifier (post ID or canonical
/// URL) and must be stable across repeated fetches of the same post; the
/// store deduplicates on it. Optional source fields land in `attributes`
/// with empty-string defaults.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawItem {
    pub source_kind: SourceKind,
    pub natural_key: String,
    pub content: String,
    pub attributes: BTreeMap<String, String>,
}

impl RawItem {
    pub fn new(source_kind: SourceKind, natural_key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source_kind,
            natural_key: natural_key.into(),
            content: content.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }
}

/// Result of one provider attempt (or of a whole chain).
///
/// Invariant: `succeeded == false` implies `items` is empty, and an empty
/// item list is never a success. Empty-but-ok provider responses are
/// deliberately folded into failure so the fallback chain keeps moving.
/// Fields are private so the constructors are the only way to build one;
/// the invariant cannot be bypassed from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOutcome {
    succeeded: bool,
    items: Vec<RawItem>,
}

impl ProviderOutcome {
    pub fn from_items(items: Vec<RawItem>) -> Self {
        if items.is_empty() {
            Self::failure()
        } else {
            Self {
                succeeded: true,
                items,
            }
        }
    }

    pub fn failure() -> Self {
        Self {
            succeeded: false,
            items: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn items(&self) -> &[RawItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<RawItem> {
        self.items
    }
}

/// One external data source.
///
/// Ordinary operational failure (network error, timeout, rate limit,
/// malformed payload, missing optional runtime capability such as an
/// uninstalled scraper binary) is an `Err` — never a panic. The retry
/// executor collapses `Err` and empty `Ok` into a failed outcome.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawItem>>;
    fn name(&self) -> &'static str;
    fn kind(&self) -> SourceKind;
}
