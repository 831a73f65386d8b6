//! Artwork blob storage
//!
//! Deduplicated images keyed by a content identifier. Blobs are immutable
//! once written; a changed image gets a new identifier.

use encore_core::error::Result;
use sqlx::{Row, SqlitePool};

/// Insert an artwork blob under the given content identifier
pub async fn insert(pool: &SqlitePool, id: &str, image: &[u8]) -> Result<()> {
    sqlx::query("INSERT INTO artwork (id, image) VALUES (?, ?)")
        .bind(id)
        .bind(image)
        .execute(pool)
        .await?;

    Ok(())
}

/// Get the image bytes for a content identifier
pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<Vec<u8>>> {
    let row = sqlx::query("SELECT image FROM artwork WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| row.get("image")))
}

/// Whether a stored blob with this identifier byte-matches the given image
///
/// Returns `None` when no blob exists under the identifier, `Some(true)` on
/// an exact byte match, and `Some(false)` on an identifier collision.
pub async fn find_match(pool: &SqlitePool, id: &str, image: &[u8]) -> Result<Option<bool>> {
    Ok(get(pool, id).await?.map(|stored| stored == image))
}

/// The number of stored artwork blobs
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artwork")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
