//! `SearchOrchestrator`: the one public entry point tying every other module
//! together — parse, fan out to the three backends concurrently, resolve,
//! merge, truncate.
//!
//! The overall `search()` shape (parse -> gather -> merge -> truncate) is
//! grounded on `crates/context-harness-core/src/search.rs`. That teacher
//! function calls its two backends sequentially because both are
//! synchronous SQL queries against the same pool; this orchestrator needs
//! genuine concurrent fan-out across three independent backends with
//! per-backend deadlines, which only the `neur0map-yinx` hybrid searcher in
//! the retrieval pack demonstrates (`tokio::join!` over backend futures,
//! each wrapped in its own `tokio::time::timeout`).

use std::sync::Arc;

use serde::Serialize;
use tokio::time::timeout;

use crate::chunk::{Chunk, EntityType, Language};
use crate::config::SearchConfig;
use crate::error::{BackendKind, SearchError};
use crate::graph::GraphBackend;
use crate::keyword::KeywordIndex;
use crate::merge::{merge, SearchResult};
use crate::query::{self, Facets};
use crate::resolver;
use crate::vector::VectorIndex;

/// A query to `SearchOrchestrator::search`. `language`/`repository`/
/// `entity_type` are request-level facets; when also present as a
/// `language:`/`repository:`/`entity_type:` token inside `query_text`, the
/// request-level field wins (it is the more explicit of the two channels).
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query_text: String,
    pub limit: usize,
    pub language: Option<Language>,
    pub repository: Option<String>,
    pub entity_type: Option<EntityType>,
    pub transitive: bool,
    pub depth: Option<u32>,
    pub embedding: Option<Vec<f32>>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            query_text: String::new(),
            limit: 10,
            language: None,
            repository: None,
            entity_type: None,
            transitive: false,
            depth: None,
            embedding: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub truncated: bool,
    pub degraded: Vec<BackendKind>,
}

/// The three backends a query may call. `graph` carries the `GraphBackend`
/// by value rather than behind a trait object because `GraphBackend` is
/// already a closed, runtime-selected enum (`InMemory | Absent`) — see
/// `graph.rs`.
pub struct SearchOrchestrator {
    pub keyword_index: Arc<dyn KeywordIndex>,
    pub vector_index: Option<Arc<dyn VectorIndex>>,
    pub graph_backend: Arc<GraphBackend>,
    pub config: SearchConfig,
}

impl SearchOrchestrator {
    pub fn new(
        keyword_index: Arc<dyn KeywordIndex>,
        vector_index: Option<Arc<dyn VectorIndex>>,
        graph_backend: Arc<GraphBackend>,
        config: SearchConfig,
    ) -> Self {
        SearchOrchestrator {
            keyword_index,
            vector_index,
            graph_backend,
            config,
        }
    }

    fn validate(&self, request: &SearchRequest) -> Result<(), SearchError> {
        if request.query_text.trim().is_empty() {
            return Err(SearchError::InvalidArgument("query_text must not be empty".into()));
        }
        if !(1..=200).contains(&request.limit) {
            return Err(SearchError::InvalidArgument("limit must be in [1, 200]".into()));
        }
        if let Some(depth) = request.depth {
            if depth < 1 || depth > self.config.max_depth {
                return Err(SearchError::InvalidArgument(format!(
                    "depth must be in [1, {}]",
                    self.config.max_depth
                )));
            }
        }
        if let Some(embedding) = &request.embedding {
            if embedding.len() != self.config.vector_dim {
                return Err(SearchError::InvalidArgument(format!(
                    "embedding has {} dims, expected {}",
                    embedding.len(),
                    self.config.vector_dim
                )));
            }
        }
        Ok(())
    }

    fn resolve_facets(&self, request: &SearchRequest, parsed: &Facets) -> Facets {
        Facets {
            language: request.language.or(parsed.language),
            entity_type: request.entity_type.or(parsed.entity_type),
            repository: request.repository.clone().or_else(|| parsed.repository.clone()),
        }
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        self.validate(&request)?;

        let parsed = query::parse(&request.query_text);
        let facets = self.resolve_facets(&request, &parsed.facets);
        let overscan_limit = request.limit * self.config.overscan_factor;

        let mut degraded: Vec<BackendKind> = Vec::new();
        let mut attempted = 0usize;
        let mut failed = 0usize;

        // Keyword: always attempted.
        attempted += 1;
        let keyword_future = timeout(
            self.config.keyword_deadline,
            self.keyword_index.query(&parsed.residual_text, &facets, overscan_limit),
        );

        // Vector: attempted iff an embedding was supplied and a backend is wired in.
        let vector_future = async {
            match (&request.embedding, &self.vector_index) {
                (Some(embedding), Some(index)) => Some(
                    timeout(
                        self.config.vector_deadline,
                        index.query(embedding, overscan_limit, self.config.vector_threshold),
                    )
                    .await,
                ),
                _ => None,
            }
        };

        // Graph: attempted iff transitive was requested and a structural predicate parsed.
        let graph_future = async {
            match (request.transitive, &parsed.structural_predicate) {
                (true, Some(predicate)) => {
                    let depth = crate::graph::clamp_depth(
                        request.depth.unwrap_or(self.config.default_depth),
                        self.config.max_depth,
                    );
                    Some(
                        timeout(self.config.graph_deadline, async {
                            Ok::<_, SearchError>(self.graph_backend.closure_for(predicate, depth))
                        })
                        .await,
                    )
                }
                _ => None,
            }
        };

        let (keyword_outcome, vector_outcome, graph_outcome) =
            tokio::join!(keyword_future, vector_future, graph_future);

        let keyword_results = match keyword_outcome {
            Ok(Ok(scored)) => scored
                .into_iter()
                .map(|sc| (sc.chunk, sc.score, sc.matched_fields))
                .collect(),
            Ok(Err(_)) => {
                failed += 1;
                degraded.push(BackendKind::Keyword);
                Vec::new()
            }
            Err(_) => {
                failed += 1;
                degraded.push(BackendKind::Keyword);
                Vec::new()
            }
        };

        let vector_hits: Vec<(String, f32)> = match vector_outcome {
            None => Vec::new(),
            Some(Ok(Ok(hits))) => {
                attempted += 1;
                hits
            }
            Some(Ok(Err(_))) => {
                attempted += 1;
                failed += 1;
                degraded.push(BackendKind::Vector);
                Vec::new()
            }
            Some(Err(_)) => {
                attempted += 1;
                failed += 1;
                degraded.push(BackendKind::Vector);
                Vec::new()
            }
        };

        let mut vector_results: Vec<(Chunk, f64)> = Vec::new();
        for (id, similarity) in vector_hits {
            if let Some(chunk) = self.keyword_index.get_by_id(&id).await? {
                vector_results.push((chunk, similarity as f64));
            }
        }

        let graph_closure: Vec<(String, Vec<String>)> = match graph_outcome {
            None => Vec::new(),
            Some(Ok(Ok(closure))) => {
                attempted += 1;
                closure
            }
            Some(Ok(Err(_))) => {
                attempted += 1;
                failed += 1;
                degraded.push(BackendKind::Graph);
                Vec::new()
            }
            Some(Err(_)) => {
                attempted += 1;
                failed += 1;
                degraded.push(BackendKind::Graph);
                Vec::new()
            }
        };

        let graph_results = resolver::resolve(self.keyword_index.as_ref(), graph_closure, &facets).await?;

        if attempted > 0 && failed == attempted {
            return Err(SearchError::AllBackendsFailed);
        }

        let merged = merge(keyword_results, vector_results, graph_results, self.config.merge_weights);
        let truncated = merged.len() > request.limit;
        let mut results = merged;
        results.truncate(request.limit);

        Ok(SearchResponse {
            results,
            truncated,
            degraded,
        })
    }
}
