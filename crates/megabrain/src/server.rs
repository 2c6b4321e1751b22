//! HTTP server.
//!
//! Exposes `SearchOrchestrator::search` as a JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/search` | Run a query through the search orchestrator |
//! | `GET` | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_argument", "message": "..." } }
//! ```
//!
//! Error codes: `invalid_argument` (400), `all_backends_failed` (503),
//! `internal` (500). Pattern grounded on the teacher's `src/server.rs`
//! `AppState`/`AppError`/`ErrorBody` shape, generalized to the error codes
//! this crate needs.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted, matching the teacher's
//! server.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use megabrain_core::{EntityType, Language, SearchError, SearchOrchestrator, SearchRequest, SearchResponse};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<SearchOrchestrator>,
}

pub async fn run_server(bind_addr: &str, orchestrator: Arc<SearchOrchestrator>) -> anyhow::Result<()> {
    let state = AppState { orchestrator };

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app = Router::new()
        .route("/search", post(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("megabrain listening on http://{bind_addr}");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidArgument(message) => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "invalid_argument".to_string(),
                message,
            },
            SearchError::AllBackendsFailed => AppError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code: "all_backends_failed".to_string(),
                message: err.to_string(),
            },
            other => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal".to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[derive(Deserialize)]
struct HttpSearchRequest {
    query_text: String,
    #[serde(default = "default_limit")]
    limit: usize,
    language: Option<String>,
    repository: Option<String>,
    entity_type: Option<String>,
    #[serde(default)]
    transitive: bool,
    depth: Option<u32>,
    embedding: Option<Vec<f32>>,
}

fn default_limit() -> usize {
    10
}

impl TryFrom<HttpSearchRequest> for SearchRequest {
    type Error = AppError;

    fn try_from(req: HttpSearchRequest) -> Result<Self, Self::Error> {
        Ok(SearchRequest {
            query_text: req.query_text,
            limit: req.limit,
            language: req
                .language
                .as_deref()
                .map(Language::from_str)
                .transpose()
                .expect("Language::from_str is infallible"),
            repository: req.repository,
            entity_type: req
                .entity_type
                .as_deref()
                .map(EntityType::from_str)
                .transpose()
                .expect("EntityType::from_str is infallible"),
            transitive: req.transitive,
            depth: req.depth,
            embedding: req.embedding,
        })
    }
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<HttpSearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let request: SearchRequest = req.try_into()?;
    let response = state.orchestrator.search(request).await?;
    Ok(Json(response))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
