// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod acquire;
pub mod config;
pub mod normalize;

// ---- Re-exports for stable public API ----
pub use crate::acquire::store::DeduplicatedStore;
pub use crate::acquire::types::{Provider, ProviderOutcome, RawItem, SourceKind};
pub use crate::acquire::{AcquisitionService, KeywordReport, KeywordState};
pub use crate::config::HarvestConfig;
pub use crate::normalize::normalize_text;
