//! Chunk ingestion coordinator.
//!
//! The teacher's own `ingest.rs` is connector-driven (filesystem/git/s3
//! walking, checkpointing per source) and out of scope here — chunk
//! production itself is an external collaborator. What stays in scope is
//! the batching and commit-ordering contract `IndexStateStore`'s invariants
//! depend on: upsert a batch into `KeywordIndex`, then record progress only
//! once that batch has durably committed, never the reverse.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use megabrain_core::{Chunk, IndexStateStore, KeywordIndex, RepositoryIndexState, SearchError};

#[async_trait]
pub trait ChunkIngestionSink: Send + Sync {
    /// Commit `chunks` for `(repository_url, commit_sha)` in batches,
    /// recording `IndexStateStore` progress after each batch durably
    /// commits. Returns the number of chunks committed.
    async fn ingest_batch(
        &self,
        repository_url: &str,
        commit_sha: &str,
        chunks: Vec<Chunk>,
    ) -> Result<usize, SearchError>;
}

pub struct IngestionCoordinator {
    keyword_index: Arc<dyn KeywordIndex>,
    state_store: Arc<dyn IndexStateStore>,
    batch_size: usize,
}

impl IngestionCoordinator {
    pub fn new(keyword_index: Arc<dyn KeywordIndex>, state_store: Arc<dyn IndexStateStore>, batch_size: usize) -> Self {
        IngestionCoordinator {
            keyword_index,
            state_store,
            batch_size,
        }
    }
}

#[async_trait]
impl ChunkIngestionSink for IngestionCoordinator {
    async fn ingest_batch(
        &self,
        repository_url: &str,
        commit_sha: &str,
        chunks: Vec<Chunk>,
    ) -> Result<usize, SearchError> {
        let batch_size = self.batch_size.max(1);
        let mut committed = 0usize;

        for batch in chunks.chunks(batch_size) {
            self.keyword_index.upsert_batch(batch.to_vec()).await?;
            committed += batch.len();

            self.state_store
                .save(RepositoryIndexState {
                    repository_url: repository_url.to_string(),
                    last_indexed_commit_sha: commit_sha.to_string(),
                    last_indexed_at: Utc::now(),
                })
                .await?;
        }

        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use megabrain_core::{EntityType, InMemoryIndexStateStore, InMemoryKeywordIndex, KeywordBoosts, Language};
    use std::collections::HashMap;

    fn chunk(entity_name: &str, byte_seed: u64) -> Chunk {
        Chunk::new(
            "body".to_string(),
            Language::Rust,
            EntityType::Function,
            entity_name.to_string(),
            "src/lib.rs".to_string(),
            1,
            10,
            byte_seed,
            byte_seed + 10,
            "sha1",
            HashMap::new(),
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn commits_in_batches_and_records_state_after_each() {
        let keyword_index: Arc<dyn KeywordIndex> = Arc::new(InMemoryKeywordIndex::new(KeywordBoosts::default()));
        let state_store: Arc<dyn IndexStateStore> = Arc::new(InMemoryIndexStateStore::new());
        let coordinator = IngestionCoordinator::new(keyword_index.clone(), state_store.clone(), 2);

        let chunks = vec![chunk("a", 0), chunk("b", 20), chunk("c", 40)];
        let committed = coordinator.ingest_batch("github.com/acme/widget", "sha1", chunks).await.unwrap();

        assert_eq!(committed, 3);
        let state = state_store.find("github.com/acme/widget").await.unwrap().unwrap();
        assert_eq!(state.last_indexed_commit_sha, "sha1");

        let found = keyword_index.get_by_id(&chunk("a", 0).id).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn empty_batch_records_no_state() {
        let keyword_index: Arc<dyn KeywordIndex> = Arc::new(InMemoryKeywordIndex::new(KeywordBoosts::default()));
        let state_store: Arc<dyn IndexStateStore> = Arc::new(InMemoryIndexStateStore::new());
        let coordinator = IngestionCoordinator::new(keyword_index, state_store.clone(), 100);

        let committed = coordinator.ingest_batch("r", "sha1", Vec::new()).await.unwrap();
        assert_eq!(committed, 0);
        assert!(state_store.find("r").await.unwrap().is_none());
    }
}
