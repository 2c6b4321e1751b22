use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use megabrain::{config, db, migrate, server, state_store};
use megabrain_core::{
    EntityType, GraphBackend, InMemoryKeywordIndex, InMemoryVectorIndex, KeywordIndex, Language, SearchOrchestrator,
    SearchRequest, VectorIndex,
};
use state_store::SqliteIndexStateStore;

#[derive(Parser)]
#[command(name = "megabrain", about = "MegaBrain — code-knowledge search orchestration", version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./config/megabrain.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema
    Init,

    /// Run a search query against a freshly constructed index
    Search {
        /// Search query text
        query_text: String,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        repository: Option<String>,

        #[arg(long = "entity-type")]
        entity_type: Option<String>,

        #[arg(long)]
        transitive: bool,

        #[arg(long)]
        depth: Option<u32>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Inspect or clear persisted per-repository indexing state
    IngestState {
        #[command(subcommand)]
        action: IngestStateAction,
    },

    /// Start the HTTP server
    Serve,
}

#[derive(Subcommand)]
enum IngestStateAction {
    /// Show the persisted index state for a repository
    Show {
        /// Repository URL
        repository_url: String,
    },
    /// Delete the persisted index state for a repository
    Delete {
        /// Repository URL
        repository_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Search {
            query_text,
            language,
            repository,
            entity_type,
            transitive,
            depth,
            limit,
        } => {
            run_search(&cfg, query_text, language, repository, entity_type, transitive, depth, limit).await?;
        }
        Commands::IngestState { action } => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            let store = SqliteIndexStateStore::new(pool);
            run_ingest_state(&store, action).await?;
        }
        Commands::Serve => {
            let orchestrator = build_orchestrator(&cfg);
            server::run_server(&cfg.server.bind, Arc::new(orchestrator)).await?;
        }
    }

    Ok(())
}

fn build_orchestrator(cfg: &config::Config) -> SearchOrchestrator {
    let keyword_index: Arc<dyn KeywordIndex> = Arc::new(InMemoryKeywordIndex::new(
        cfg.to_search_config().keyword_boosts,
    ));
    let vector_index: Arc<dyn VectorIndex> = Arc::new(InMemoryVectorIndex::new(cfg.vector.dim));
    SearchOrchestrator::new(
        keyword_index,
        Some(vector_index),
        Arc::new(GraphBackend::Absent),
        cfg.to_search_config(),
    )
}

#[allow(clippy::too_many_arguments)]
async fn run_search(
    cfg: &config::Config,
    query_text: String,
    language: Option<String>,
    repository: Option<String>,
    entity_type: Option<String>,
    transitive: bool,
    depth: Option<u32>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    use std::str::FromStr;

    let orchestrator = build_orchestrator(cfg);
    let request = SearchRequest {
        query_text,
        limit: limit.unwrap_or(10),
        language: language
            .as_deref()
            .map(Language::from_str)
            .transpose()
            .expect("Language::from_str is infallible"),
        repository,
        entity_type: entity_type
            .as_deref()
            .map(EntityType::from_str)
            .transpose()
            .expect("EntityType::from_str is infallible"),
        transitive,
        depth,
        embedding: None,
    };

    let response = orchestrator.search(request).await?;

    for (rank, result) in response.results.iter().enumerate() {
        println!(
            "{:>3}  {:.4}  {}  {}  [{}]",
            rank + 1,
            result.score,
            result.chunk.id,
            result.chunk.entity_name,
            result
                .matched_fields
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(",")
        );
    }
    if response.truncated {
        println!("(truncated)");
    }
    if !response.degraded.is_empty() {
        println!(
            "degraded backends: {}",
            response
                .degraded
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}

async fn run_ingest_state(store: &SqliteIndexStateStore, action: IngestStateAction) -> anyhow::Result<()> {
    use megabrain_core::IndexStateStore;

    match action {
        IngestStateAction::Show { repository_url } => match store.find(&repository_url).await? {
            Some(state) => println!(
                "{} -> commit {} at {}",
                state.repository_url, state.last_indexed_commit_sha, state.last_indexed_at
            ),
            None => println!("no index state for {repository_url}"),
        },
        IngestStateAction::Delete { repository_url } => {
            let deleted = store.delete(&repository_url).await?;
            if deleted {
                println!("deleted index state for {repository_url}");
            } else {
                println!("no index state for {repository_url}");
            }
        }
    }
    Ok(())
}
