//! Configuration parsing and validation.
//!
//! MegaBrain is configured via a TOML file (default: `config/megabrain.toml`).
//! The config defines the database path, server bind address, and the search
//! tuning knobs enumerated in the configuration key table: keyword boosts,
//! merge weights, vector threshold/dimension, overscan factor, transitive
//! depth bounds, per-backend deadlines, and the ingestion batch size.
//!
//! Structure and validation style grounded on the teacher's `src/config.rs`
//! (`anyhow::bail!` checks after a `toml::from_str` parse, `serde(default =
//! ...)` per field rather than a single blanket `Default` derive).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use megabrain_core::{KeywordBoosts, MergeWeights, SearchConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub boost: BoostConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7420".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BoostConfig {
    #[serde(default = "default_boost_entity_name")]
    pub entity_name: f64,
    #[serde(default = "default_boost_doc_summary")]
    pub doc_summary: f64,
    #[serde(default = "default_boost_content")]
    pub content: f64,
    #[serde(default = "default_boost_signature")]
    pub signature: f64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        BoostConfig {
            entity_name: default_boost_entity_name(),
            doc_summary: default_boost_doc_summary(),
            content: default_boost_content(),
            signature: default_boost_signature(),
        }
    }
}

fn default_boost_entity_name() -> f64 {
    4.0
}
fn default_boost_doc_summary() -> f64 {
    2.0
}
fn default_boost_content() -> f64 {
    1.0
}
fn default_boost_signature() -> f64 {
    1.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct MergeConfig {
    #[serde(default)]
    pub weight: MergeWeightConfig,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            weight: MergeWeightConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MergeWeightConfig {
    #[serde(default = "default_weight_keyword")]
    pub keyword: f64,
    #[serde(default = "default_weight_vector")]
    pub vector: f64,
    #[serde(default = "default_weight_graph")]
    pub graph: f64,
}

impl Default for MergeWeightConfig {
    fn default() -> Self {
        MergeWeightConfig {
            keyword: default_weight_keyword(),
            vector: default_weight_vector(),
            graph: default_weight_graph(),
        }
    }
}

fn default_weight_keyword() -> f64 {
    1.0
}
fn default_weight_vector() -> f64 {
    0.8
}
fn default_weight_graph() -> f64 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorConfig {
    /// Minimum cosine similarity to include a vector hit. Absent disables
    /// threshold filtering entirely.
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default = "default_vector_dim")]
    pub dim: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        VectorConfig {
            threshold: None,
            dim: default_vector_dim(),
        }
    }
}

fn default_vector_dim() -> usize {
    384
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchSection {
    #[serde(default = "default_overscan_factor")]
    pub overscan_factor: usize,
    #[serde(default = "default_default_depth")]
    pub default_depth: u32,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default)]
    pub deadline: DeadlineConfig,
}

impl Default for SearchSection {
    fn default() -> Self {
        SearchSection {
            overscan_factor: default_overscan_factor(),
            default_depth: default_default_depth(),
            max_depth: default_max_depth(),
            deadline: DeadlineConfig::default(),
        }
    }
}

fn default_overscan_factor() -> usize {
    3
}
fn default_default_depth() -> u32 {
    3
}
fn default_max_depth() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeadlineConfig {
    #[serde(default = "default_keyword_deadline_ms")]
    pub keyword_ms: u64,
    #[serde(default = "default_vector_deadline_ms")]
    pub vector_ms: u64,
    #[serde(default = "default_graph_deadline_ms")]
    pub graph_ms: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        DeadlineConfig {
            keyword_ms: default_keyword_deadline_ms(),
            vector_ms: default_vector_deadline_ms(),
            graph_ms: default_graph_deadline_ms(),
        }
    }
}

fn default_keyword_deadline_ms() -> u64 {
    2000
}
fn default_vector_deadline_ms() -> u64 {
    2000
}
fn default_graph_deadline_ms() -> u64 {
    3000
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    #[serde(default = "default_batch_size")]
    pub size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig { size: default_batch_size() }
    }
}

fn default_batch_size() -> usize {
    1000
}

impl Config {
    /// Project this TOML configuration into the pure `SearchConfig` the
    /// orchestrator consumes.
    pub fn to_search_config(&self) -> SearchConfig {
        SearchConfig {
            keyword_boosts: KeywordBoosts {
                entity_name: self.boost.entity_name,
                doc_summary: self.boost.doc_summary,
                content: self.boost.content,
                signature_attribute: self.boost.signature,
            },
            merge_weights: MergeWeights {
                keyword: self.merge.weight.keyword,
                vector: self.merge.weight.vector,
                graph: self.merge.weight.graph,
            },
            vector_threshold: self.vector.threshold,
            vector_dim: self.vector.dim,
            overscan_factor: self.search.overscan_factor,
            default_depth: self.search.default_depth,
            max_depth: self.search.max_depth,
            keyword_deadline: Duration::from_millis(self.search.deadline.keyword_ms),
            vector_deadline: Duration::from_millis(self.search.deadline.vector_ms),
            graph_deadline: Duration::from_millis(self.search.deadline.graph_ms),
            batch_size: self.batch.size,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.search.max_depth < 1 {
        anyhow::bail!("search.max_depth must be >= 1");
    }
    if config.search.default_depth < 1 || config.search.default_depth > config.search.max_depth {
        anyhow::bail!("search.default_depth must be in [1, search.max_depth]");
    }
    if config.search.overscan_factor < 1 {
        anyhow::bail!("search.overscan_factor must be >= 1");
    }
    if config.vector.dim == 0 {
        anyhow::bail!("vector.dim must be > 0");
    }
    if config.batch.size == 0 {
        anyhow::bail!("batch.size must be > 0");
    }
    if let Some(threshold) = config.vector.threshold {
        if !(-1.0..=1.0).contains(&threshold) {
            anyhow::bail!("vector.threshold must be in [-1.0, 1.0]");
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_config_fills_in_defaults() {
        let file = write_config("[db]\npath = \"data/megabrain.sqlite\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.search.overscan_factor, 3);
        assert_eq!(config.vector.dim, 384);
        assert_eq!(config.server.bind, "127.0.0.1:7420");
    }

    #[test]
    fn rejects_default_depth_above_max_depth() {
        let file = write_config(
            "[db]\npath = \"x.sqlite\"\n[search]\ndefault_depth = 20\nmax_depth = 10\n",
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_zero_vector_dim() {
        let file = write_config("[db]\npath = \"x.sqlite\"\n[vector]\ndim = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn to_search_config_carries_overrides_through() {
        let file = write_config(
            r#"
            [db]
            path = "x.sqlite"
            [merge.weight]
            keyword = 2.0
            vector = 1.0
            graph = 0.1
            "#,
        );
        let config = load_config(file.path()).unwrap();
        let search_config = config.to_search_config();
        assert_eq!(search_config.merge_weights.keyword, 2.0);
        assert_eq!(search_config.merge_weights.graph, 0.1);
    }
}
