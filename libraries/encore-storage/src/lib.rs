//! Encore Storage
//!
//! `SQLite` persistence layer for the Encore media library.
//!
//! This crate provides the three logical tables of the library — media rows,
//! CD-audio rows, and deduplicated artwork blobs — as vertical slices that
//! each own their queries, plus versioned schema maintenance.
//!
//! # Example
//!
//! ```rust,no_run
//! use encore_storage::{create_pool, schema};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://encore.db").await?;
//! schema::ensure(&pool).await?;
//!
//! let all = encore_storage::media::get_all(&pool).await?;
//! # Ok(())
//! # }
//! ```

mod error;

// Vertical slices
pub mod artwork;
pub mod cdda;
pub mod media;

// Schema maintenance
pub mod schema;

pub use error::StorageError;

use sqlx::sqlite::SqlitePool;

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://encore.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::debug!("connected to {}", database_url);

    Ok(pool)
}

/// Create an in-memory pool (for testing)
///
/// Capped at one connection: each `SQLite` in-memory connection is its own
/// database, so a larger pool would scatter the tables.
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}
