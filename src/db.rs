use std::str::FromStr as _;

use anyhow::Context as _;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};

/// The application-wide database handle.
pub type Db = sqlx::SqlitePool;

/// Open (creating if missing) the SQLite database and bring the schema up
/// to date.
pub async fn connect(url: &str) -> anyhow::Result<Db> {
    let opts = SqliteConnectOptions::from_str(url)
        .context("failed to parse database options")?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let db = sqlx::SqlitePool::connect_with(opts)
        .await
        .context("failed to open database")?;

    sqlx::migrate!()
        .run(&db)
        .await
        .context("failed to apply migrations")?;

    Ok(db)
}

/// Clamp caller-provided page sizes. Listing endpoints default to 20 rows
/// and never return more than 100 at once.
pub fn page_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, 100)
}
