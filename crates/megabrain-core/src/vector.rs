//! `VectorIndex`: cosine-similarity retrieval over embedding vectors.
//!
//! `cosine_similarity` is carried over near-verbatim from the teacher's
//! `crates/context-harness-core/src/embedding.rs`. `InMemoryVectorIndex` is
//! grounded on `InMemoryStore::vector_search`
//! (`crates/context-harness-core/src/store/memory.rs`): brute-force scan of
//! a `RwLock`-guarded vector table, nothing approximate.
//!
//! A deployment with no vector backend configured is represented at the
//! orchestrator boundary as `Option<Arc<dyn VectorIndex>>` rather than by a
//! "null object" implementation, so callers can distinguish "not configured"
//! from "configured but timed out" (see `spec.md` Design Note on interfaces
//! with a runtime-selected implementation).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::SearchError;

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty or
/// mismatched-length vectors rather than panicking.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Fixed embedding dimensionality this index was constructed for.
    fn dims(&self) -> usize;

    /// Top-`k` chunk ids by cosine similarity to `query_vec`, optionally
    /// filtered to similarities `>= threshold`. Must never return an id
    /// whose vector has been deleted.
    async fn query(
        &self,
        query_vec: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<(String, f32)>, SearchError>;

    async fn upsert_batch(&self, entries: Vec<(String, Vec<f32>)>) -> Result<(), SearchError>;

    async fn delete(&self, id: &str) -> Result<(), SearchError>;
}

pub struct InMemoryVectorIndex {
    dims: usize,
    vectors: RwLock<HashMap<String, Vec<f32>>>,
}

impl InMemoryVectorIndex {
    pub fn new(dims: usize) -> Self {
        InMemoryVectorIndex {
            dims,
            vectors: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn query(
        &self,
        query_vec: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<(String, f32)>, SearchError> {
        if query_vec.len() != self.dims {
            return Err(SearchError::InvalidArgument(format!(
                "query vector has {} dims, index expects {}",
                query_vec.len(),
                self.dims
            )));
        }

        let vectors = self
            .vectors
            .read()
            .map_err(|_| SearchError::InternalInvariantViolation("vector index lock poisoned".into()))?;

        let mut scored: Vec<(String, f32)> = vectors
            .iter()
            .map(|(id, vec)| (id.clone(), cosine_similarity(query_vec, vec)))
            .filter(|(_, sim)| threshold.map(|t| *sim >= t).unwrap_or(true))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    async fn upsert_batch(&self, entries: Vec<(String, Vec<f32>)>) -> Result<(), SearchError> {
        for (_, vec) in &entries {
            if vec.len() != self.dims {
                return Err(SearchError::InvalidArgument(format!(
                    "embedding has {} dims, index expects {}",
                    vec.len(),
                    self.dims
                )));
            }
        }
        let mut guard = self
            .vectors
            .write()
            .map_err(|_| SearchError::InternalInvariantViolation("vector index lock poisoned".into()))?;
        for (id, vec) in entries {
            guard.insert(id, vec);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SearchError> {
        let mut guard = self
            .vectors
            .write()
            .map_err(|_| SearchError::InternalInvariantViolation("vector index lock poisoned".into()))?;
        guard.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors_is_one() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors_is_negative_one() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn cosine_empty_or_mismatched_is_zero() {
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[tokio::test]
    async fn query_ranks_by_similarity_descending() {
        let index = InMemoryVectorIndex::new(2);
        index
            .upsert_batch(vec![
                ("a".to_string(), vec![1.0, 0.0]),
                ("b".to_string(), vec![0.0, 1.0]),
                ("c".to_string(), vec![0.9, 0.1]),
            ])
            .await
            .unwrap();

        let results = index.query(&[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(results[0].0, "a");
        assert_eq!(results[1].0, "c");
        assert_eq!(results[2].0, "b");
    }

    #[tokio::test]
    async fn threshold_filters_out_low_similarity_matches() {
        let index = InMemoryVectorIndex::new(2);
        index
            .upsert_batch(vec![("a".to_string(), vec![1.0, 0.0]), ("b".to_string(), vec![0.0, 1.0])])
            .await
            .unwrap();

        let results = index.query(&[1.0, 0.0], 10, Some(0.5)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "a");
    }

    #[tokio::test]
    async fn deleted_vectors_never_reappear() {
        let index = InMemoryVectorIndex::new(2);
        index.upsert_batch(vec![("a".to_string(), vec![1.0, 0.0])]).await.unwrap();
        index.delete("a").await.unwrap();

        let results = index.query(&[1.0, 0.0], 10, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn mismatched_query_dims_is_invalid_argument() {
        let index = InMemoryVectorIndex::new(3);
        let err = index.query(&[1.0, 0.0], 10, None).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)));
    }
}
