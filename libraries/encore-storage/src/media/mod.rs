//! Media row storage
//!
//! One row per distinct file path or stream URL. Each query here follows the
//! set semantics of the library surface: DISTINCT string/year sets carry no
//! duplicates, media lists are ordered by filename for determinism.

use encore_core::{
    columns::column_for_tag, error::Result, Column, MediaInfo, MediaSource, Tag, Tags,
};
use sqlx::{Row, SqlitePool};

const MEDIA_FIELDS: &str = "filename, filetime, filesize, duration, samplerate, bitspersample,
     channels, artist, title, album, genre, year, comment, track, version,
     gain_track, gain_album, artwork, source, bitrate";

/// Get a media row by filename
pub async fn get(pool: &SqlitePool, filename: &str) -> Result<Option<MediaInfo>> {
    let row = sqlx::query(&format!(
        "SELECT {MEDIA_FIELDS} FROM media WHERE filename = ?"
    ))
    .bind(filename)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| media_from_row(&row)))
}

/// Insert or replace a media row
pub async fn upsert(pool: &SqlitePool, media: &MediaInfo) -> Result<()> {
    sqlx::query(
        "INSERT INTO media (filename, filetime, filesize, duration, samplerate, bitspersample,
            channels, artist, title, album, genre, year, comment, track, version,
            gain_track, gain_album, artwork, source, bitrate)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(filename) DO UPDATE SET
            filetime = excluded.filetime,
            filesize = excluded.filesize,
            duration = excluded.duration,
            samplerate = excluded.samplerate,
            bitspersample = excluded.bitspersample,
            channels = excluded.channels,
            artist = excluded.artist,
            title = excluded.title,
            album = excluded.album,
            genre = excluded.genre,
            year = excluded.year,
            comment = excluded.comment,
            track = excluded.track,
            version = excluded.version,
            gain_track = excluded.gain_track,
            gain_album = excluded.gain_album,
            artwork = excluded.artwork,
            source = excluded.source,
            bitrate = excluded.bitrate",
    )
    .bind(&media.filename)
    .bind(media.filetime)
    .bind(media.filesize)
    .bind(media.duration)
    .bind(media.sample_rate.map(i64::from))
    .bind(media.bits_per_sample.map(i64::from))
    .bind(media.channels.map(i64::from))
    .bind(&media.artist)
    .bind(&media.title)
    .bind(&media.album)
    .bind(&media.genre)
    .bind(media.year.map(i64::from))
    .bind(&media.comment)
    .bind(media.track_number.map(i64::from))
    .bind(&media.version)
    .bind(media.gain_track)
    .bind(media.gain_album)
    .bind(&media.artwork_id)
    .bind(format_source(media.source))
    .bind(media.bitrate)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a media row
///
/// Returns whether a row was actually removed.
pub async fn remove(pool: &SqlitePool, filename: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM media WHERE filename = ?")
        .bind(filename)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Get all media rows
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<MediaInfo>> {
    let rows = sqlx::query(&format!(
        "SELECT {MEDIA_FIELDS} FROM media ORDER BY filename"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(media_from_row).collect())
}

/// Get all network stream rows
pub async fn get_streams(pool: &SqlitePool) -> Result<Vec<MediaInfo>> {
    let rows = sqlx::query(&format!(
        "SELECT {MEDIA_FIELDS} FROM media WHERE source = 'stream' ORDER BY filename"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(media_from_row).collect())
}

/// Update only the columns named by the given tag set
///
/// The artwork reference is managed through [`set_artwork`] and is skipped
/// here even if present in the set.
pub async fn update_tag_columns(pool: &SqlitePool, filename: &str, tags: &Tags) -> Result<()> {
    let (assignments, values) = tag_assignments(tags);
    if assignments.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "UPDATE media SET {} WHERE filename = ?",
        assignments.join(", ")
    );
    let mut query = sqlx::query(&sql);
    for value in values {
        query = match value {
            ColumnValue::Text(text) => query.bind(text),
            ColumnValue::Integer(int) => query.bind(int),
            ColumnValue::Real(real) => query.bind(real),
        };
    }
    query.bind(filename).execute(pool).await?;

    Ok(())
}

/// Set the replay gain columns
pub async fn set_gain(
    pool: &SqlitePool,
    filename: &str,
    gain_track: Option<f64>,
    gain_album: Option<f64>,
) -> Result<()> {
    sqlx::query("UPDATE media SET gain_track = ?, gain_album = ? WHERE filename = ?")
        .bind(gain_track)
        .bind(gain_album)
        .bind(filename)
        .execute(pool)
        .await?;

    Ok(())
}

/// Set the artwork reference
pub async fn set_artwork(
    pool: &SqlitePool,
    filename: &str,
    artwork_id: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE media SET artwork = ? WHERE filename = ?")
        .bind(artwork_id)
        .bind(filename)
        .execute(pool)
        .await?;

    Ok(())
}

/// Set the stored file attributes
pub async fn set_file_attributes(
    pool: &SqlitePool,
    filename: &str,
    filetime: Option<i64>,
    filesize: Option<i64>,
) -> Result<()> {
    sqlx::query("UPDATE media SET filetime = ?, filesize = ? WHERE filename = ?")
        .bind(filetime)
        .bind(filesize)
        .bind(filename)
        .execute(pool)
        .await?;

    Ok(())
}

/// The distinct artists in the library
pub async fn artists(pool: &SqlitePool) -> Result<Vec<String>> {
    distinct_strings(pool, Column::Artist).await
}

/// The distinct albums in the library
pub async fn albums(pool: &SqlitePool) -> Result<Vec<String>> {
    distinct_strings(pool, Column::Album).await
}

/// The distinct albums by one artist
pub async fn albums_by_artist(pool: &SqlitePool, artist: &str) -> Result<Vec<String>> {
    let rows = sqlx::query_scalar(
        "SELECT DISTINCT album FROM media
         WHERE artist = ? AND album IS NOT NULL AND album <> ''
         ORDER BY album",
    )
    .bind(artist)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The distinct genres in the library
pub async fn genres(pool: &SqlitePool) -> Result<Vec<String>> {
    distinct_strings(pool, Column::Genre).await
}

/// The distinct years in the library
pub async fn years(pool: &SqlitePool) -> Result<Vec<i32>> {
    let rows: Vec<i64> = sqlx::query_scalar(
        "SELECT DISTINCT year FROM media WHERE year IS NOT NULL ORDER BY year",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|year| year as i32).collect())
}

/// Media rows by artist
pub async fn by_artist(pool: &SqlitePool, artist: &str) -> Result<Vec<MediaInfo>> {
    filtered(pool, "artist = ?", artist).await
}

/// Media rows by album
pub async fn by_album(pool: &SqlitePool, album: &str) -> Result<Vec<MediaInfo>> {
    filtered(pool, "album = ?", album).await
}

/// Media rows by artist and album
pub async fn by_artist_and_album(
    pool: &SqlitePool,
    artist: &str,
    album: &str,
) -> Result<Vec<MediaInfo>> {
    let rows = sqlx::query(&format!(
        "SELECT {MEDIA_FIELDS} FROM media WHERE artist = ? AND album = ? ORDER BY filename"
    ))
    .bind(artist)
    .bind(album)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(media_from_row).collect())
}

/// Media rows by genre
pub async fn by_genre(pool: &SqlitePool, genre: &str) -> Result<Vec<MediaInfo>> {
    filtered(pool, "genre = ?", genre).await
}

/// Media rows by year
pub async fn by_year(pool: &SqlitePool, year: i32) -> Result<Vec<MediaInfo>> {
    let rows = sqlx::query(&format!(
        "SELECT {MEDIA_FIELDS} FROM media WHERE year = ? ORDER BY filename"
    ))
    .bind(i64::from(year))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(media_from_row).collect())
}

/// Whether the artist exists in the library
pub async fn artist_exists(pool: &SqlitePool, artist: &str) -> Result<bool> {
    exists(pool, "SELECT EXISTS(SELECT 1 FROM media WHERE artist = ?)", artist).await
}

/// Whether the album exists in the library
pub async fn album_exists(pool: &SqlitePool, album: &str) -> Result<bool> {
    exists(pool, "SELECT EXISTS(SELECT 1 FROM media WHERE album = ?)", album).await
}

/// Whether the artist & album pair exists in the library
pub async fn artist_and_album_exists(
    pool: &SqlitePool,
    artist: &str,
    album: &str,
) -> Result<bool> {
    let found: i64 = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM media WHERE artist = ? AND album = ?)",
    )
    .bind(artist)
    .bind(album)
    .fetch_one(pool)
    .await?;

    Ok(found != 0)
}

/// Whether the genre exists in the library
pub async fn genre_exists(pool: &SqlitePool, genre: &str) -> Result<bool> {
    exists(pool, "SELECT EXISTS(SELECT 1 FROM media WHERE genre = ?)", genre).await
}

/// Whether the year exists in the library
pub async fn year_exists(pool: &SqlitePool, year: i32) -> Result<bool> {
    let found: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM media WHERE year = ?)")
        .bind(i64::from(year))
        .fetch_one(pool)
        .await?;

    Ok(found != 0)
}

// Helper functions

async fn distinct_strings(pool: &SqlitePool, column: Column) -> Result<Vec<String>> {
    let name = column.name();
    let rows = sqlx::query_scalar(&format!(
        "SELECT DISTINCT {name} FROM media WHERE {name} IS NOT NULL AND {name} <> '' ORDER BY {name}"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

async fn filtered(pool: &SqlitePool, predicate: &str, value: &str) -> Result<Vec<MediaInfo>> {
    let rows = sqlx::query(&format!(
        "SELECT {MEDIA_FIELDS} FROM media WHERE {predicate} ORDER BY filename"
    ))
    .bind(value)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(media_from_row).collect())
}

async fn exists(pool: &SqlitePool, sql: &str, value: &str) -> Result<bool> {
    let found: i64 = sqlx::query_scalar(sql).bind(value).fetch_one(pool).await?;
    Ok(found != 0)
}

fn media_from_row(row: &sqlx::sqlite::SqliteRow) -> MediaInfo {
    MediaInfo {
        filename: row.get("filename"),
        filetime: row.get("filetime"),
        filesize: row.get("filesize"),
        duration: row.get("duration"),
        sample_rate: row.get::<Option<i64>, _>("samplerate").map(|v| v as u32),
        bits_per_sample: row
            .get::<Option<i64>, _>("bitspersample")
            .map(|v| v as u32),
        channels: row.get::<Option<i64>, _>("channels").map(|v| v as u32),
        artist: row.get("artist"),
        title: row.get("title"),
        album: row.get("album"),
        genre: row.get("genre"),
        year: row.get::<Option<i64>, _>("year").map(|v| v as i32),
        comment: row.get("comment"),
        track_number: row.get::<Option<i64>, _>("track").map(|v| v as i32),
        version: row.get("version"),
        gain_track: row.get("gain_track"),
        gain_album: row.get("gain_album"),
        artwork_id: row.get("artwork"),
        source: parse_source(&row.get::<String, _>("source")),
        bitrate: row.get("bitrate"),
    }
}

fn parse_source(s: &str) -> MediaSource {
    match s {
        "stream" => MediaSource::Stream,
        _ => MediaSource::File,
    }
}

fn format_source(source: MediaSource) -> &'static str {
    match source {
        MediaSource::Stream => "stream",
        // CD-audio rows live in the cdda table; a media row never carries it
        MediaSource::File | MediaSource::CdAudio { .. } => "file",
    }
}

/// A typed value bound into a dynamic UPDATE
pub(crate) enum ColumnValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Real(Option<f64>),
}

/// Build `column = ?` assignments and their typed values from a tag set
pub(crate) fn tag_assignments(tags: &Tags) -> (Vec<String>, Vec<ColumnValue>) {
    let mut assignments = Vec::new();
    let mut values = Vec::new();
    for (tag, value) in tags {
        if *tag == Tag::Artwork {
            continue;
        }
        assignments.push(format!("{} = ?", column_for_tag(*tag).name()));
        values.push(column_value(*tag, value));
    }
    (assignments, values)
}

fn column_value(tag: Tag, value: &str) -> ColumnValue {
    match tag {
        Tag::Year | Tag::Track => ColumnValue::Integer(value.parse().ok()),
        Tag::GainTrack | Tag::GainAlbum => ColumnValue::Real(value.parse().ok()),
        _ => ColumnValue::Text((!value.is_empty()).then(|| value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_memory_pool, schema};

    async fn test_pool() -> SqlitePool {
        let pool = create_memory_pool().await.unwrap();
        schema::ensure(&pool).await.unwrap();
        pool
    }

    fn sample(filename: &str, artist: &str, album: &str) -> MediaInfo {
        let mut media = MediaInfo::new(filename);
        media.artist = Some(artist.to_string());
        media.album = Some(album.to_string());
        media.title = Some("Song".to_string());
        media.year = Some(2001);
        media.genre = Some("Rock".to_string());
        media
    }

    #[tokio::test]
    async fn upsert_and_get_round_trip() {
        let pool = test_pool().await;
        let mut media = sample("/music/a.flac", "Band", "First");
        media.duration = Some(123.5);
        media.sample_rate = Some(44_100);
        media.gain_track = Some(-3.25);

        upsert(&pool, &media).await.unwrap();
        let stored = get(&pool, "/music/a.flac").await.unwrap().unwrap();
        assert_eq!(stored, media);

        // Upsert replaces in place
        media.title = Some("Renamed".to_string());
        upsert(&pool, &media).await.unwrap();
        let stored = get(&pool, "/music/a.flac").await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Renamed"));
    }

    #[tokio::test]
    async fn remove_reports_whether_a_row_was_deleted() {
        let pool = test_pool().await;
        upsert(&pool, &sample("/music/a.flac", "Band", "First"))
            .await
            .unwrap();

        assert!(remove(&pool, "/music/a.flac").await.unwrap());
        assert!(!remove(&pool, "/music/a.flac").await.unwrap());
    }

    #[tokio::test]
    async fn distinct_sets_skip_missing_values() {
        let pool = test_pool().await;
        upsert(&pool, &sample("/a.flac", "Band", "First")).await.unwrap();
        upsert(&pool, &sample("/b.flac", "Band", "Second")).await.unwrap();
        let mut untagged = MediaInfo::new("/c.flac");
        untagged.artist = Some(String::new());
        upsert(&pool, &untagged).await.unwrap();

        assert_eq!(artists(&pool).await.unwrap(), vec!["Band".to_string()]);
        assert_eq!(albums(&pool).await.unwrap().len(), 2);
        assert_eq!(
            albums_by_artist(&pool, "Band").await.unwrap(),
            vec!["First".to_string(), "Second".to_string()]
        );
        assert_eq!(years(&pool).await.unwrap(), vec![2001]);
    }

    #[tokio::test]
    async fn existence_checks() {
        let pool = test_pool().await;
        upsert(&pool, &sample("/a.flac", "Band", "First")).await.unwrap();

        assert!(artist_exists(&pool, "Band").await.unwrap());
        assert!(!artist_exists(&pool, "Nobody").await.unwrap());
        assert!(artist_and_album_exists(&pool, "Band", "First").await.unwrap());
        assert!(!artist_and_album_exists(&pool, "Band", "Second").await.unwrap());
        assert!(genre_exists(&pool, "Rock").await.unwrap());
        assert!(year_exists(&pool, 2001).await.unwrap());
        assert!(!year_exists(&pool, 1968).await.unwrap());
    }

    #[tokio::test]
    async fn update_tag_columns_writes_and_clears() {
        let pool = test_pool().await;
        upsert(&pool, &sample("/a.flac", "Band", "First")).await.unwrap();

        let mut tags = Tags::new();
        tags.insert(Tag::Title, "Other".to_string());
        tags.insert(Tag::Genre, String::new());
        tags.insert(Tag::Year, "1999".to_string());
        update_tag_columns(&pool, "/a.flac", &tags).await.unwrap();

        let stored = get(&pool, "/a.flac").await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Other"));
        assert_eq!(stored.genre, None);
        assert_eq!(stored.year, Some(1999));
        // Untouched fields survive
        assert_eq!(stored.artist.as_deref(), Some("Band"));
    }

    #[tokio::test]
    async fn streams_are_filtered_by_source() {
        let pool = test_pool().await;
        upsert(&pool, &sample("/a.flac", "Band", "First")).await.unwrap();
        upsert(&pool, &MediaInfo::stream("http://radio.example/live"))
            .await
            .unwrap();

        let streams = get_streams(&pool).await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].filename, "http://radio.example/live");
        assert!(streams[0].source.is_stream());
        assert_eq!(get_all(&pool).await.unwrap().len(), 2);
    }
}
