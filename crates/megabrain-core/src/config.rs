//! Search-time tuning knobs: boosts, merge weights, and the deadlines and
//! overscan factor `SearchOrchestrator` applies on each query.
//!
//! Grounded on `crates/context-harness/src/config.rs`'s `RetrievalConfig`:
//! a plain struct of weights/limits with a `Default` impl, loaded and
//! validated by the app layer (`megabrain::config`) rather than here — this
//! struct has no knowledge of TOML or the filesystem.

use std::time::Duration;

use crate::keyword::KeywordBoosts;
use crate::merge::MergeWeights;

/// All tuning knobs `SearchOrchestrator::search` consults. Field names
/// mirror `spec.md` §6's configuration key table (`boost.*` ->
/// `keyword_boosts`, `merge.weight.*` -> `merge_weights`, etc.).
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub keyword_boosts: KeywordBoosts,
    pub merge_weights: MergeWeights,
    /// Minimum cosine similarity (`vector.threshold`) to include a vector hit.
    pub vector_threshold: Option<f32>,
    /// Fixed embedding dimensionality (`vector.dim`).
    pub vector_dim: usize,
    /// Multiplier over `limit` applied to keyword/vector candidate counts
    /// (`search.overscan_factor`). Never applied to graph closures.
    pub overscan_factor: usize,
    /// Transitive traversal depth used when a request omits `depth`
    /// (`search.default_depth`).
    pub default_depth: u32,
    /// Upper bound a requested depth is clamped to (`search.max_depth`).
    pub max_depth: u32,
    pub keyword_deadline: Duration,
    pub vector_deadline: Duration,
    pub graph_deadline: Duration,
    /// Ingestion commit batch size (`batch.size`).
    pub batch_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            keyword_boosts: KeywordBoosts::default(),
            merge_weights: MergeWeights::default(),
            vector_threshold: None,
            vector_dim: 384,
            overscan_factor: 3,
            default_depth: 3,
            max_depth: 10,
            keyword_deadline: Duration::from_secs(2),
            vector_deadline: Duration::from_secs(2),
            graph_deadline: Duration::from_secs(3),
            batch_size: 1000,
        }
    }
}
