//! Versioned schema maintenance
//!
//! The schema version lives in `PRAGMA user_version`; zero means the
//! database needs full initialization. [`ensure`] runs once at library
//! construction, before any other storage call, and either creates the
//! current tables or applies the in-place upgrades from an older version.

use crate::error::StorageError;
use sqlx::SqlitePool;

/// The schema version this build reads and writes
pub const SCHEMA_VERSION: i64 = 2;

struct Table {
    name: &'static str,
    create: &'static str,
    indices: &'static [&'static str],
}

const MEDIA_TABLE: Table = Table {
    name: "media",
    create: "CREATE TABLE IF NOT EXISTS media (
        filename TEXT PRIMARY KEY NOT NULL,
        filetime INTEGER,
        filesize INTEGER,
        duration REAL,
        samplerate INTEGER,
        bitspersample INTEGER,
        channels INTEGER,
        artist TEXT,
        title TEXT,
        album TEXT,
        genre TEXT,
        year INTEGER,
        comment TEXT,
        track INTEGER,
        version TEXT,
        gain_track REAL,
        gain_album REAL,
        artwork TEXT,
        source TEXT NOT NULL DEFAULT 'file',
        bitrate REAL
    );",
    indices: &[
        "CREATE INDEX IF NOT EXISTS media_artist_index ON media (artist);",
        "CREATE INDEX IF NOT EXISTS media_album_index ON media (album);",
        "CREATE INDEX IF NOT EXISTS media_genre_index ON media (genre);",
        "CREATE INDEX IF NOT EXISTS media_year_index ON media (year);",
        "CREATE INDEX IF NOT EXISTS media_source_index ON media (source);",
    ],
};

const CDDA_TABLE: Table = Table {
    name: "cdda",
    create: "CREATE TABLE IF NOT EXISTS cdda (
        cddb INTEGER NOT NULL,
        track INTEGER NOT NULL,
        filename TEXT NOT NULL,
        filetime INTEGER,
        filesize INTEGER,
        duration REAL,
        samplerate INTEGER,
        bitspersample INTEGER,
        channels INTEGER,
        artist TEXT,
        title TEXT,
        album TEXT,
        genre TEXT,
        year INTEGER,
        comment TEXT,
        version TEXT,
        gain_track REAL,
        gain_album REAL,
        artwork TEXT,
        bitrate REAL,
        PRIMARY KEY (cddb, track)
    );",
    indices: &["CREATE INDEX IF NOT EXISTS cdda_album_index ON cdda (album);"],
};

const ARTWORK_TABLE: Table = Table {
    name: "artwork",
    create: "CREATE TABLE IF NOT EXISTS artwork (
        id TEXT PRIMARY KEY NOT NULL,
        image BLOB NOT NULL
    );",
    indices: &[],
};

const TABLES: &[Table] = &[MEDIA_TABLE, CDDA_TABLE, ARTWORK_TABLE];

/// Columns added by the v1 -> v2 upgrade
const V2_UPGRADE: &[&str] = &[
    "ALTER TABLE media ADD COLUMN bitrate REAL;",
    "ALTER TABLE cdda ADD COLUMN bitrate REAL;",
];

/// Bring the database schema to the current version
///
/// Idempotent: a database already at [`SCHEMA_VERSION`] is left untouched.
///
/// # Errors
///
/// Returns an error if the stored version is newer than this build supports
/// or if any migration statement fails; a failed migration is fatal to
/// library construction.
pub async fn ensure(pool: &SqlitePool) -> Result<(), StorageError> {
    let version = current_version(pool).await?;

    if version == SCHEMA_VERSION {
        return Ok(());
    }
    if version > SCHEMA_VERSION {
        return Err(StorageError::Migration(format!(
            "database schema v{version} is newer than supported v{SCHEMA_VERSION}"
        )));
    }

    if version == 0 {
        tracing::info!("initializing schema at v{}", SCHEMA_VERSION);
        for table in TABLES {
            sqlx::query(table.create)
                .execute(pool)
                .await
                .map_err(|e| migration_error(table.name, &e))?;
        }
    } else {
        tracing::info!("upgrading schema v{} -> v{}", version, SCHEMA_VERSION);
        if version < 2 {
            for statement in V2_UPGRADE {
                sqlx::query(statement)
                    .execute(pool)
                    .await
                    .map_err(|e| migration_error("v2 upgrade", &e))?;
            }
        }
    }

    for table in TABLES {
        for statement in table.indices {
            sqlx::query(statement)
                .execute(pool)
                .await
                .map_err(|e| migration_error(table.name, &e))?;
        }
    }

    // PRAGMA does not accept bind parameters
    sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
        .execute(pool)
        .await
        .map_err(|e| migration_error("user_version", &e))?;

    Ok(())
}

/// Read the stored schema version
pub async fn current_version(pool: &SqlitePool) -> Result<i64, StorageError> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

fn migration_error(context: &str, err: &sqlx::Error) -> StorageError {
    StorageError::Migration(format!("{context}: {err}"))
}
