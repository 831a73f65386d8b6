//! CD-audio row storage
//!
//! Disc/track metadata for optical media, keyed by `(cddb, track)`.

use crate::media::tag_assignments;
use crate::media::ColumnValue;
use encore_core::{error::Result, MediaInfo, MediaSource, Tags};
use sqlx::{Row, SqlitePool};

const CDDA_FIELDS: &str = "cddb, track, filename, filetime, filesize, duration, samplerate,
     bitspersample, channels, artist, title, album, genre, year, comment, version,
     gain_track, gain_album, artwork, bitrate";

/// Get a CD-audio row by disc identifier and track number
pub async fn get(pool: &SqlitePool, cddb_id: i64, track: i32) -> Result<Option<MediaInfo>> {
    let row = sqlx::query(&format!(
        "SELECT {CDDA_FIELDS} FROM cdda WHERE cddb = ? AND track = ?"
    ))
    .bind(cddb_id)
    .bind(i64::from(track))
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| cdda_from_row(&row)))
}

/// Insert or replace a CD-audio row
///
/// The record's track number is part of the key and must be set.
pub async fn upsert(pool: &SqlitePool, cddb_id: i64, media: &MediaInfo) -> Result<()> {
    let track = media.track_number.unwrap_or(0);

    sqlx::query(
        "INSERT INTO cdda (cddb, track, filename, filetime, filesize, duration, samplerate,
            bitspersample, channels, artist, title, album, genre, year, comment, version,
            gain_track, gain_album, artwork, bitrate)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(cddb, track) DO UPDATE SET
            filename = excluded.filename,
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
            version = excluded.version,
            gain_track = excluded.gain_track,
            gain_album = excluded.gain_album,
            artwork = excluded.artwork,
            bitrate = excluded.bitrate",
    )
    .bind(cddb_id)
    .bind(i64::from(track))
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
    .bind(&media.version)
    .bind(media.gain_track)
    .bind(media.gain_album)
    .bind(&media.artwork_id)
    .bind(media.bitrate)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a CD-audio row
///
/// Returns whether a row was actually removed.
pub async fn remove(pool: &SqlitePool, cddb_id: i64, track: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM cdda WHERE cddb = ? AND track = ?")
        .bind(cddb_id)
        .bind(i64::from(track))
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Get all rows for one disc, in track order
pub async fn tracks_for_disc(pool: &SqlitePool, cddb_id: i64) -> Result<Vec<MediaInfo>> {
    let rows = sqlx::query(&format!(
        "SELECT {CDDA_FIELDS} FROM cdda WHERE cddb = ? ORDER BY track"
    ))
    .bind(cddb_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(cdda_from_row).collect())
}

/// Update only the columns named by the given tag set
pub async fn update_tag_columns(
    pool: &SqlitePool,
    cddb_id: i64,
    track: i32,
    tags: &Tags,
) -> Result<()> {
    let (assignments, values) = tag_assignments(tags);
    if assignments.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "UPDATE cdda SET {} WHERE cddb = ? AND track = ?",
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
    query
        .bind(cddb_id)
        .bind(i64::from(track))
        .execute(pool)
        .await?;

    Ok(())
}

/// Set the replay gain columns
pub async fn set_gain(
    pool: &SqlitePool,
    cddb_id: i64,
    track: i32,
    gain_track: Option<f64>,
    gain_album: Option<f64>,
) -> Result<()> {
    sqlx::query("UPDATE cdda SET gain_track = ?, gain_album = ? WHERE cddb = ? AND track = ?")
        .bind(gain_track)
        .bind(gain_album)
        .bind(cddb_id)
        .bind(i64::from(track))
        .execute(pool)
        .await?;

    Ok(())
}

/// Set the artwork reference
pub async fn set_artwork(
    pool: &SqlitePool,
    cddb_id: i64,
    track: i32,
    artwork_id: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE cdda SET artwork = ? WHERE cddb = ? AND track = ?")
        .bind(artwork_id)
        .bind(cddb_id)
        .bind(i64::from(track))
        .execute(pool)
        .await?;

    Ok(())
}

fn cdda_from_row(row: &sqlx::sqlite::SqliteRow) -> MediaInfo {
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
        track_number: Some(row.get::<i64, _>("track") as i32),
        version: row.get("version"),
        gain_track: row.get("gain_track"),
        gain_album: row.get("gain_album"),
        artwork_id: row.get("artwork"),
        source: MediaSource::CdAudio {
            cddb_id: row.get("cddb"),
        },
        bitrate: row.get("bitrate"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_memory_pool, schema};

    #[tokio::test]
    async fn disc_tracks_round_trip() {
        let pool = create_memory_pool().await.unwrap();
        schema::ensure(&pool).await.unwrap();

        let mut track_two = MediaInfo::cd_audio(0xbadc0de, 2);
        track_two.title = Some("Second".to_string());
        let mut track_one = MediaInfo::cd_audio(0xbadc0de, 1);
        track_one.title = Some("First".to_string());

        upsert(&pool, 0xbadc0de, &track_two).await.unwrap();
        upsert(&pool, 0xbadc0de, &track_one).await.unwrap();

        let tracks = tracks_for_disc(&pool, 0xbadc0de).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title.as_deref(), Some("First"));
        assert_eq!(tracks[0].source, MediaSource::CdAudio { cddb_id: 0xbadc0de });

        let stored = get(&pool, 0xbadc0de, 2).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Second"));

        assert!(remove(&pool, 0xbadc0de, 1).await.unwrap());
        assert!(!remove(&pool, 0xbadc0de, 1).await.unwrap());
    }

    #[tokio::test]
    async fn tag_update_touches_only_named_columns() {
        let pool = create_memory_pool().await.unwrap();
        schema::ensure(&pool).await.unwrap();

        let mut track = MediaInfo::cd_audio(42, 1);
        track.artist = Some("Band".to_string());
        track.title = Some("Song".to_string());
        upsert(&pool, 42, &track).await.unwrap();

        let mut tags = Tags::new();
        tags.insert(encore_core::Tag::Title, "Live".to_string());
        update_tag_columns(&pool, 42, 1, &tags).await.unwrap();

        let stored = get(&pool, 42, 1).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Live"));
        assert_eq!(stored.artist.as_deref(), Some("Band"));
    }
}
