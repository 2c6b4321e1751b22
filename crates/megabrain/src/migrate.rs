//! Database schema migrations.
//!
//! Creates the `repository_index_state` table used by
//! `SqliteIndexStateStore`. Idempotent, designed to be run via `megabrain
//! init`. Structure grounded on the teacher's `src/migrate.rs`
//! (`CREATE TABLE IF NOT EXISTS` plus explicit indexes, run once against a
//! freshly connected pool).

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS repository_index_state (
            repository_url TEXT PRIMARY KEY,
            last_indexed_commit_sha TEXT NOT NULL,
            last_indexed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
