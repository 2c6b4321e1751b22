//! `IndexStateStore`: per-repository last-indexed commit marker, used to
//! gate incremental ingestion.
//!
//! Trait shape grounded on `crates/context-harness-core/src/store/mod.rs`'s
//! `Store` trait (async-trait, `Send + Sync`). The per-URL fine-grained
//! locking has no teacher analogue — it follows the "mutable shared cache"
//! Design Note in `spec.md` §9 directly: the outer lock only ever hands out
//! by-value snapshots, never a live reference into the map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// `{repository_url, last_indexed_commit_sha, last_indexed_at}`, uniquely
/// keyed by `repository_url`. `repository_url` is stored already normalized
/// (see `normalize_repository_url`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryIndexState {
    pub repository_url: String,
    pub last_indexed_commit_sha: String,
    pub last_indexed_at: DateTime<Utc>,
}

/// Normalize a repository URL the way `IndexStateStore` keys its records:
/// lowercased, scheme stripped, port stripped, trailing `.git` removed.
pub fn normalize_repository_url(url: &str) -> String {
    let mut s = url.trim().to_ascii_lowercase();
    if let Some(stripped) = s.strip_prefix("https://").or_else(|| s.strip_prefix("http://")) {
        s = stripped.to_string();
    } else if let Some(stripped) = s.strip_prefix("git@") {
        s = stripped.replacen(':', "/", 1);
    }
    if let Some(slash) = s.find('/') {
        let (host, rest) = s.split_at(slash);
        if let Some((host_only, _port)) = host.split_once(':') {
            s = format!("{host_only}{rest}");
        }
    } else if let Some((host_only, _port)) = s.split_once(':') {
        s = host_only.to_string();
    }
    s.strip_suffix(".git").map(str::to_string).unwrap_or(s)
}

/// `find(repo_url) -> state?`, `save(state) -> state`, `delete(repo_url) ->
/// bool`, `exists(repo_url) -> bool`. Implementations must be
/// single-writer-safe per `repo_url`; writes to distinct urls may proceed
/// concurrently. `save` with a `last_indexed_at` older than the current
/// record for that url is rejected with `SearchError::StaleWrite`.
#[async_trait]
pub trait IndexStateStore: Send + Sync {
    async fn find(&self, repository_url: &str) -> Result<Option<RepositoryIndexState>, SearchError>;

    async fn save(&self, state: RepositoryIndexState) -> Result<RepositoryIndexState, SearchError>;

    async fn delete(&self, repository_url: &str) -> Result<bool, SearchError>;

    async fn exists(&self, repository_url: &str) -> Result<bool, SearchError> {
        Ok(self.find(repository_url).await?.is_some())
    }
}

/// In-process reference implementation: a `RwLock`-guarded map plus a
/// per-key `Mutex` obtained through an outer lock, so no caller ever holds
/// a lock across another repository's write.
#[derive(Default)]
pub struct InMemoryIndexStateStore {
    records: RwLock<HashMap<String, RepositoryIndexState>>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InMemoryIndexStateStore {
    pub fn new() -> Self {
        InMemoryIndexStateStore::default()
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut key_locks = self.key_locks.lock().unwrap();
        key_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl IndexStateStore for InMemoryIndexStateStore {
    async fn find(&self, repository_url: &str) -> Result<Option<RepositoryIndexState>, SearchError> {
        let key = normalize_repository_url(repository_url);
        let records = self
            .records
            .read()
            .map_err(|_| SearchError::InternalInvariantViolation("index state store lock poisoned".into()))?;
        Ok(records.get(&key).cloned())
    }

    async fn save(&self, state: RepositoryIndexState) -> Result<RepositoryIndexState, SearchError> {
        let key = normalize_repository_url(&state.repository_url);
        let lock = self.lock_for(&key);
        let _guard = lock.lock().unwrap();

        let mut records = self
            .records
            .write()
            .map_err(|_| SearchError::InternalInvariantViolation("index state store lock poisoned".into()))?;

        if let Some(existing) = records.get(&key) {
            if state.last_indexed_at < existing.last_indexed_at {
                return Err(SearchError::StaleWrite { repository_url: key });
            }
        }

        let normalized = RepositoryIndexState {
            repository_url: key.clone(),
            ..state
        };
        records.insert(key, normalized.clone());
        Ok(normalized)
    }

    async fn delete(&self, repository_url: &str) -> Result<bool, SearchError> {
        let key = normalize_repository_url(repository_url);
        let mut records = self
            .records
            .write()
            .map_err(|_| SearchError::InternalInvariantViolation("index state store lock poisoned".into()))?;
        Ok(records.remove(&key).is_some())
    }
}
