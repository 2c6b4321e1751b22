//! MegaBrain app crate: TOML configuration, SQLite-backed `IndexStateStore`,
//! the chunk ingestion coordinator, and the HTTP server — all built on top
//! of the pure `megabrain-core` orchestration crate.

pub mod config;
pub mod db;
pub mod ingest;
pub mod migrate;
pub mod server;
pub mod state_store;
