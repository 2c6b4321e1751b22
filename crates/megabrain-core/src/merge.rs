//! `ResultMerger`: dedup-by-id, per-source normalize-then-weight, stable sort.
//!
//! Directly grounded on `crates/context-harness-core/src/search.rs`'s
//! `normalize_scores` + weighted-merge + deterministic sort pipeline,
//! generalized from a binary (keyword/vector) merge to a ternary
//! (keyword/vector/graph) merge with an added provenance/path-carrying
//! third source. Score normalization mandated by `spec.md` §4.6 rule 2 is
//! the fix flagged in `spec.md` §9 for the source's un-normalized additive
//! hybrid score.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::chunk::Chunk;

/// Weights applied to each source's normalized score before summing.
/// Defaults per `spec.md` §4.6 rule 1.
#[derive(Debug, Clone, Copy)]
pub struct MergeWeights {
    pub keyword: f64,
    pub vector: f64,
    pub graph: f64,
}

impl Default for MergeWeights {
    fn default() -> Self {
        MergeWeights {
            keyword: 1.0,
            vector: 0.8,
            graph: 0.5,
        }
    }
}

/// A single ranked, de-duplicated, provenance-carrying search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f64,
    pub is_transitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_path: Option<Vec<String>>,
    pub matched_fields: BTreeSet<String>,
}

/// Min-max normalize a slice of raw scores to `[0.0, 1.0]`. A source with
/// at most one *distinct* value (including the empty slice — vacuously)
/// normalizes every entry to `1.0`, per `spec.md` §4.6 rule 2.
fn normalize(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| (s - min) / (max - min)).collect()
}

struct Entry {
    chunk: Chunk,
    keyword_score: f64,
    vector_score: f64,
    graph_score: f64,
    matched_fields: BTreeSet<String>,
    is_transitive: bool,
    relationship_path: Option<Vec<String>>,
}

impl Entry {
    fn blank(chunk: Chunk) -> Self {
        Entry {
            chunk,
            keyword_score: 0.0,
            vector_score: 0.0,
            graph_score: 0.0,
            matched_fields: BTreeSet::new(),
            is_transitive: false,
            relationship_path: None,
        }
    }
}

/// Merge keyword, vector, and graph contributions into one ranked list.
///
/// `keyword_results` carry `(chunk, raw_score, matched_fields)`;
/// `vector_results` carry `(chunk, raw_cosine_similarity)`; `graph_results`
/// carry `(chunk, relationship_path)` — graph hits are pure membership, so
/// every one is assigned a raw score of `1.0` before normalization (see
/// `DESIGN.md` Open Question 7).
pub fn merge(
    keyword_results: Vec<(Chunk, f64, BTreeSet<String>)>,
    vector_results: Vec<(Chunk, f64)>,
    graph_results: Vec<(Chunk, Vec<String>)>,
    weights: MergeWeights,
) -> Vec<SearchResult> {
    let keyword_raw: Vec<f64> = keyword_results.iter().map(|(_, s, _)| *s).collect();
    let keyword_norm = normalize(&keyword_raw);
    let vector_raw: Vec<f64> = vector_results.iter().map(|(_, s)| *s).collect();
    let vector_norm = normalize(&vector_raw);
    let graph_raw: Vec<f64> = vec![1.0; graph_results.len()];
    let graph_norm = normalize(&graph_raw);

    let mut by_id: HashMap<String, Entry> = HashMap::new();

    for ((chunk, _, matched_fields), score) in keyword_results.into_iter().zip(keyword_norm) {
        let id = chunk.id.clone();
        let entry = by_id.entry(id).or_insert_with(|| Entry::blank(chunk));
        entry.keyword_score = score;
        entry.matched_fields.extend(matched_fields);
    }

    for ((chunk, _), score) in vector_results.into_iter().zip(vector_norm) {
        let id = chunk.id.clone();
        let entry = by_id.entry(id).or_insert_with(|| Entry::blank(chunk));
        entry.vector_score = score;
    }

    for ((chunk, path), score) in graph_results.into_iter().zip(graph_norm) {
        let id = chunk.id.clone();
        let entry = by_id.entry(id).or_insert_with(|| Entry::blank(chunk));
        entry.graph_score = score;
        entry.is_transitive = true;
        entry.relationship_path = Some(path);
    }

    let mut results: Vec<SearchResult> = by_id
        .into_values()
        .map(|e| {
            let final_score =
                weights.keyword * e.keyword_score + weights.vector * e.vector_score + weights.graph * e.graph_score;
            SearchResult {
                chunk: e.chunk,
                score: final_score,
                is_transitive: e.is_transitive,
                relationship_path: e.relationship_path,
                matched_fields: e.matched_fields,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });

    results
}
