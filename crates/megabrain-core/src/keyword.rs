//! `KeywordIndex`: term-overlap retrieval over chunk text fields, plus exact
//! entity-name and id lookups used by `EntityResolver` and the vector
//! resolution step.
//!
//! Grounded on the teacher's `InMemoryStore`
//! (`crates/context-harness-core/src/store/memory.rs`): a `RwLock`-guarded
//! `HashMap` scanned brute-force and scored per field. This is the one
//! index every search touches, so it also plays the role of the "chunk
//! table" other backends resolve ids against (see `Chunk.id` as single join
//! key).

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::chunk::Chunk;
use crate::error::SearchError;
use crate::query::Facets;

/// Field-level boost weights applied when scoring a keyword match.
/// Defaults are grounded on the relative importance the teacher's own
/// hybrid search gives to title-like fields over body text.
#[derive(Debug, Clone, Copy)]
pub struct KeywordBoosts {
    pub entity_name: f64,
    pub doc_summary: f64,
    pub content: f64,
    pub signature_attribute: f64,
}

impl Default for KeywordBoosts {
    fn default() -> Self {
        KeywordBoosts {
            entity_name: 4.0,
            doc_summary: 2.0,
            content: 1.0,
            signature_attribute: 1.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
    pub matched_fields: BTreeSet<String>,
}

#[async_trait]
pub trait KeywordIndex: Send + Sync {
    /// Score and rank chunks against `residual_text` (already stripped of
    /// facets/predicates by `StructuralQueryParser`), filtered by `facets`,
    /// returning at most `limit` results ordered by descending raw score.
    async fn query(
        &self,
        residual_text: &str,
        facets: &Facets,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError>;

    /// Exact, case-sensitive lookup by entity name, filtered by `facets`.
    /// Used by `EntityResolver` to turn graph closure entity names back
    /// into chunks.
    async fn lookup_by_entity_names(
        &self,
        names: &[String],
        facets: &Facets,
    ) -> Result<Vec<Chunk>, SearchError>;

    /// Fetch a single chunk by id, or `None` if it has been deleted or was
    /// never indexed. Used to resolve `VectorIndex` hits (which carry only
    /// an id) back to full chunks.
    async fn get_by_id(&self, id: &str) -> Result<Option<Chunk>, SearchError>;

    async fn upsert_batch(&self, chunks: Vec<Chunk>) -> Result<(), SearchError>;

    async fn delete(&self, id: &str) -> Result<(), SearchError>;
}

pub struct InMemoryKeywordIndex {
    chunks: RwLock<HashMap<String, Chunk>>,
    boosts: KeywordBoosts,
}

impl InMemoryKeywordIndex {
    pub fn new(boosts: KeywordBoosts) -> Self {
        InMemoryKeywordIndex {
            chunks: RwLock::new(HashMap::new()),
            boosts,
        }
    }

    fn matches_facets(chunk: &Chunk, facets: &Facets) -> bool {
        if let Some(language) = facets.language {
            if chunk.language != language {
                return false;
            }
        }
        if let Some(entity_type) = facets.entity_type {
            if chunk.entity_type != entity_type {
                return false;
            }
        }
        if let Some(repository) = &facets.repository {
            if chunk.repository() != Some(repository.as_str()) {
                return false;
            }
        }
        true
    }

    /// Split `residual_text` into lowercase free terms and quoted phrases
    /// (quotes stripped, matched as a literal lowercase substring against
    /// `entity_name` and `content` only).
    fn split_terms(residual_text: &str) -> (Vec<String>, Vec<String>) {
        let mut terms = Vec::new();
        let mut phrases = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;

        for c in residual_text.chars() {
            if c == '"' {
                if in_quotes {
                    if !current.is_empty() {
                        phrases.push(current.to_lowercase());
                        current = String::new();
                    }
                }
                in_quotes = !in_quotes;
            } else if c.is_whitespace() && !in_quotes {
                if !current.is_empty() {
                    terms.push(std::mem::take(&mut current).to_lowercase());
                }
            } else {
                current.push(c);
            }
        }
        if !current.is_empty() {
            if in_quotes {
                phrases.push(current.to_lowercase());
            } else {
                terms.push(current.to_lowercase());
            }
        }
        (terms, phrases)
    }

    fn score_chunk(&self, chunk: &Chunk, terms: &[String], phrases: &[String]) -> (f64, BTreeSet<String>) {
        let mut score = 0.0;
        let mut matched_fields = BTreeSet::new();

        let entity_name_lower = chunk.entity_name.to_lowercase();
        let content_lower = chunk.content.to_lowercase();
        let doc_summary_lower = chunk.doc_summary.as_ref().map(|s| s.to_lowercase());
        let signature_lower = chunk.attributes.get("signature").map(|s| s.to_lowercase());

        for term in terms {
            if term.is_empty() {
                continue;
            }
            let entity_hits = entity_name_lower.matches(term.as_str()).count();
            if entity_hits > 0 {
                score += entity_hits as f64 * self.boosts.entity_name;
                matched_fields.insert("entity_name".to_string());
            }
            let content_hits = content_lower.matches(term.as_str()).count();
            if content_hits > 0 {
                score += content_hits as f64 * self.boosts.content;
                matched_fields.insert("content".to_string());
            }
            if let Some(doc_summary) = &doc_summary_lower {
                let hits = doc_summary.matches(term.as_str()).count();
                if hits > 0 {
                    score += hits as f64 * self.boosts.doc_summary;
                    matched_fields.insert("doc_summary".to_string());
                }
            }
            if let Some(signature) = &signature_lower {
                let hits = signature.matches(term.as_str()).count();
                if hits > 0 {
                    score += hits as f64 * self.boosts.signature_attribute;
                    matched_fields.insert("attributes.signature".to_string());
                }
            }
        }

        for phrase in phrases {
            if phrase.is_empty() {
                continue;
            }
            if entity_name_lower.contains(phrase.as_str()) {
                score += self.boosts.entity_name;
                matched_fields.insert("entity_name".to_string());
            }
            if content_lower.contains(phrase.as_str()) {
                score += self.boosts.content;
                matched_fields.insert("content".to_string());
            }
        }

        (score, matched_fields)
    }
}

#[async_trait]
impl KeywordIndex for InMemoryKeywordIndex {
    async fn query(
        &self,
        residual_text: &str,
        facets: &Facets,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        let (terms, phrases) = Self::split_terms(residual_text);
        let chunks = self
            .chunks
            .read()
            .map_err(|_| SearchError::InternalInvariantViolation("keyword index lock poisoned".into()))?;

        let mut scored: Vec<ScoredChunk> = chunks
            .values()
            .filter(|chunk| Self::matches_facets(chunk, facets))
            .filter_map(|chunk| {
                let (score, matched_fields) = self.score_chunk(chunk, &terms, &phrases);
                if score > 0.0 {
                    Some(ScoredChunk {
                        chunk: chunk.clone(),
                        score,
                        matched_fields,
                    })
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn lookup_by_entity_names(
        &self,
        names: &[String],
        facets: &Facets,
    ) -> Result<Vec<Chunk>, SearchError> {
        let chunks = self
            .chunks
            .read()
            .map_err(|_| SearchError::InternalInvariantViolation("keyword index lock poisoned".into()))?;
        Ok(chunks
            .values()
            .filter(|chunk| names.iter().any(|n| n == &chunk.entity_name))
            .filter(|chunk| Self::matches_facets(chunk, facets))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Chunk>, SearchError> {
        let chunks = self
            .chunks
            .read()
            .map_err(|_| SearchError::InternalInvariantViolation("keyword index lock poisoned".into()))?;
        Ok(chunks.get(id).cloned())
    }

    async fn upsert_batch(&self, chunks: Vec<Chunk>) -> Result<(), SearchError> {
        let mut guard = self
            .chunks
            .write()
            .map_err(|_| SearchError::InternalInvariantViolation("keyword index lock poisoned".into()))?;
        for chunk in chunks {
            guard.insert(chunk.id.clone(), chunk);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SearchError> {
        let mut guard = self
            .chunks
            .write()
            .map_err(|_| SearchError::InternalInvariantViolation("keyword index lock poisoned".into()))?;
        guard.remove(id);
        Ok(())
    }
}
