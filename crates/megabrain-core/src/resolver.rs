//! `EntityResolver`: turns graph closure entity names back into chunks.
//!
//! Thin adapter over `KeywordIndex::lookup_by_entity_names`
//! (`crates/context-harness-core/src/store/mod.rs`'s `get_document_metadata`
//! lookup-by-key shape is the closest teacher analogue — a pure name/id
//! lookup against the one backend that owns the authoritative chunk table).
//! Overloaded names resolve to every matching chunk, each tagged with the
//! same path; unresolved names are dropped, not an error.

use std::collections::HashMap;

use crate::chunk::Chunk;
use crate::error::SearchError;
use crate::keyword::KeywordIndex;
use crate::query::Facets;

/// Resolve `(entity_name, path)` pairs produced by a `GraphClosure` query
/// into `(chunk, path)` pairs via `keyword_index`. Names with no matching
/// chunk are silently dropped.
pub async fn resolve(
    keyword_index: &dyn KeywordIndex,
    closure_results: Vec<(String, Vec<String>)>,
    facets: &Facets,
) -> Result<Vec<(Chunk, Vec<String>)>, SearchError> {
    if closure_results.is_empty() {
        return Ok(Vec::new());
    }

    let names: Vec<String> = closure_results.iter().map(|(name, _)| name.clone()).collect();
    let chunks = keyword_index.lookup_by_entity_names(&names, facets).await?;

    let mut by_name: HashMap<&str, Vec<&Chunk>> = HashMap::new();
    for chunk in &chunks {
        by_name.entry(chunk.entity_name.as_str()).or_default().push(chunk);
    }

    let mut resolved = Vec::new();
    for (name, path) in &closure_results {
        if let Some(matches) = by_name.get(name.as_str()) {
            for chunk in matches {
                resolved.push(((*chunk).clone(), path.clone()));
            }
        }
    }
    Ok(resolved)
}
