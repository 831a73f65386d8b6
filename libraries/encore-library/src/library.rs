//! The media library orchestrator
//!
//! Composes the metadata store, the filesystem/tag/decoder backends, the
//! pending tag write queue, and artwork deduplication. The store is the
//! serialization point for all persisted state; the per-path write-attempt
//! map is the only other synchronized structure consulted from concurrent
//! contexts.

use crate::pending::{lock, PendingTagWrites, DEFAULT_TAG_WRITE_DEBOUNCE};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use encore_core::{
    diff_tags, DecoderProbe, FileProbe, LibraryEvent, MediaInfo, MediaSource, Result,
    StreamProperties, Tag, TagCodec, Tags,
};
use lru::LruCache;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Read-only library configuration, built once at construction
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Minimum interval between tag write attempts for one filename
    pub tag_write_debounce: Duration,
    /// Number of artwork images held in the in-memory read cache
    pub artwork_cache_entries: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            tag_write_debounce: DEFAULT_TAG_WRITE_DEBOUNCE,
            artwork_cache_entries: 64,
        }
    }
}

/// Flags controlling a [`Library::get_media_info`] lookup
#[derive(Debug, Clone, Copy)]
pub struct LookupOptions {
    /// Check whether the stored time/size still matches the real file
    pub check_file_attributes: bool,
    /// Rescan the file when the record is stale or absent
    pub scan_media: bool,
    /// Emit change events for records this lookup creates or rebuilds
    pub notify: bool,
    /// Remove the record when the file cannot be opened at all
    pub remove_missing: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            check_file_attributes: true,
            scan_media: true,
            notify: true,
            remove_missing: false,
        }
    }
}

/// A successful lookup result
#[derive(Debug, Clone)]
pub struct MediaLookup {
    /// The record
    pub media: MediaInfo,
    /// Whether the record is known to match the file on disk
    ///
    /// `false` means the file could not be verified (or re-scanned) and the
    /// stored values are being returned as a best effort.
    pub current: bool,
}

/// The media library
///
/// All persisted reads and writes go through the owned `SQLite` pool.
/// Callers from multiple contexts may share one instance behind an `Arc`.
pub struct Library {
    pool: SqlitePool,
    file_probe: Arc<dyn FileProbe>,
    tag_codec: Arc<dyn TagCodec>,
    decoder_probe: Arc<dyn DecoderProbe>,
    pending: PendingTagWrites,
    artwork_cache: Mutex<LruCache<String, Vec<u8>>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<LibraryEvent>>>,
}

impl Library {
    /// Create a library over the given pool and backends
    ///
    /// Runs schema maintenance synchronously; no other method is reachable
    /// before it completes.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be brought to the current
    /// version.
    pub async fn new(
        pool: SqlitePool,
        file_probe: Arc<dyn FileProbe>,
        tag_codec: Arc<dyn TagCodec>,
        decoder_probe: Arc<dyn DecoderProbe>,
    ) -> Result<Self> {
        Self::with_config(
            pool,
            file_probe,
            tag_codec,
            decoder_probe,
            LibraryConfig::default(),
        )
        .await
    }

    /// Create a library with explicit configuration
    ///
    /// # Errors
    /// Returns an error if the schema cannot be brought to the current
    /// version.
    pub async fn with_config(
        pool: SqlitePool,
        file_probe: Arc<dyn FileProbe>,
        tag_codec: Arc<dyn TagCodec>,
        decoder_probe: Arc<dyn DecoderProbe>,
        config: LibraryConfig,
    ) -> Result<Self> {
        encore_storage::schema::ensure(&pool).await?;

        let cache_entries =
            NonZeroUsize::new(config.artwork_cache_entries.max(1)).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            pool,
            file_probe,
            tag_codec,
            decoder_probe,
            pending: PendingTagWrites::new(config.tag_write_debounce),
            artwork_cache: Mutex::new(LruCache::new(cache_entries)),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Create a library with the default filesystem/lofty/symphonia backends
    ///
    /// # Errors
    /// Returns an error if the schema cannot be brought to the current
    /// version.
    pub async fn with_defaults(pool: SqlitePool) -> Result<Self> {
        Self::new(
            pool,
            Arc::new(encore_metadata::FsFileProbe::new()),
            Arc::new(encore_metadata::LoftyTagCodec::new()),
            Arc::new(encore_metadata::SymphoniaDecoderProbe::new()),
        )
        .await
    }

    /// The underlying pool (for maintenance tooling and tests)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Subscribe to change notifications
    ///
    /// Delivery is at-least-once; events for distinct paths carry no
    /// ordering guarantee. Dropped receivers are pruned on the next send.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LibraryEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    fn notify(&self, event: &LibraryEvent) {
        lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    // === Media information ===

    /// Look up (and reconcile) the record for `query.filename`
    ///
    /// Returns `Ok(None)` when no usable record can be produced: the path is
    /// unknown and scanning is disabled or fails, or the file is missing and
    /// `remove_missing` removed its record. Re-calling on an unchanged file
    /// performs no store writes.
    ///
    /// # Errors
    /// Returns an error only for store failures; probe and codec failures
    /// are absorbed into the result.
    pub async fn get_media_info(
        &self,
        query: &MediaInfo,
        options: &LookupOptions,
    ) -> Result<Option<MediaLookup>> {
        if let MediaSource::CdAudio { cddb_id } = query.source {
            let stored = encore_storage::cdda::get(
                &self.pool,
                cddb_id,
                query.track_number.unwrap_or(0),
            )
            .await?;
            return Ok(stored.map(|media| MediaLookup {
                media,
                current: true,
            }));
        }

        let stored = encore_storage::media::get(&self.pool, &query.filename).await?;

        let Some(stored) = stored else {
            // Unseen path: build a record from the file itself
            if !options.scan_media || query.source.is_stream() {
                return Ok(None);
            }
            let scanned = self.scan_file(&query.filename, None, options.notify).await?;
            return Ok(scanned.map(|media| MediaLookup {
                media,
                current: true,
            }));
        };

        if stored.source.is_stream() || !options.check_file_attributes {
            return Ok(Some(MediaLookup {
                media: stored,
                current: true,
            }));
        }

        match self.file_probe.probe(Path::new(&stored.filename)) {
            Some(attrs) if stored.file_attributes_match(&attrs) => Ok(Some(MediaLookup {
                media: stored,
                current: true,
            })),
            Some(_) => {
                // Stale: the file changed underneath the record
                if !options.scan_media {
                    return Ok(Some(MediaLookup {
                        media: stored,
                        current: false,
                    }));
                }
                debug!("rescanning stale record for {}", stored.filename);
                match self
                    .scan_file(&stored.filename, Some(&stored), options.notify)
                    .await?
                {
                    Some(media) => Ok(Some(MediaLookup {
                        media,
                        current: true,
                    })),
                    // The file vanished between the probe and the scan
                    None => self.handle_missing(stored, options).await,
                }
            }
            None => self.handle_missing(stored, options).await,
        }
    }

    async fn handle_missing(
        &self,
        stored: MediaInfo,
        options: &LookupOptions,
    ) -> Result<Option<MediaLookup>> {
        if !options.remove_missing {
            return Ok(Some(MediaLookup {
                media: stored,
                current: false,
            }));
        }

        info!("removing missing file from library: {}", stored.filename);
        let removed = encore_storage::media::remove(&self.pool, &stored.filename).await?;
        if removed && options.notify {
            self.notify(&LibraryEvent::Removed { media: stored });
        }
        Ok(None)
    }

    /// Rebuild a record from the file: decoder properties, then tags
    ///
    /// Returns `Ok(None)` when the file cannot be opened by any decoder;
    /// nothing is written in that case.
    async fn scan_file(
        &self,
        filename: &str,
        previous: Option<&MediaInfo>,
        notify: bool,
    ) -> Result<Option<MediaInfo>> {
        let path = Path::new(filename);
        let Some(attrs) = self.file_probe.probe(path) else {
            return Ok(None);
        };
        let properties = match self.decoder_probe.open(path) {
            Ok(properties) => properties,
            Err(err) => {
                debug!("no decoder for {}: {}", filename, err);
                return Ok(None);
            }
        };

        let mut media = previous
            .cloned()
            .unwrap_or_else(|| MediaInfo::new(filename));
        media.source = MediaSource::File;
        media.filetime = Some(attrs.modified);
        media.filesize = Some(attrs.size);
        media.bitrate = None;
        media.apply_stream_properties(&properties);

        match self.tag_codec.read(path) {
            Ok(tags) => {
                media.apply_tags(&tags);
                if let Some(encoded) = tags.get(&Tag::Artwork) {
                    match STANDARD.decode(encoded) {
                        Ok(image) if !image.is_empty() => {
                            media.artwork_id = Some(self.add_artwork(&image).await?);
                        }
                        _ => {}
                    }
                }
            }
            Err(err) => debug!("no readable tags in {}: {}", filename, err),
        }
        media.refresh_bitrate();

        encore_storage::media::upsert(&self.pool, &media).await?;
        if notify {
            self.notify(&LibraryEvent::Updated {
                previous: previous.cloned(),
                current: media.clone(),
            });
        }

        Ok(Some(media))
    }

    /// Apply a tag edit: store row, then write-back into the file
    ///
    /// Only the changed fields are written. A failed (or debounced) file
    /// write never fails the operation; the diff stays queued for retry and
    /// the attempt time is recorded either way.
    ///
    /// # Errors
    /// Returns an error only for store failures.
    pub async fn update_media_tags(
        &self,
        previous: &MediaInfo,
        updated: &MediaInfo,
    ) -> Result<()> {
        let changed = diff_tags(&previous.to_tags(), &updated.to_tags());
        let artwork_changed = previous.artwork_id != updated.artwork_id;
        if changed.is_empty() && !artwork_changed {
            return Ok(());
        }

        match previous.source {
            MediaSource::CdAudio { cddb_id } => {
                let track = previous.track_number.unwrap_or(0);
                encore_storage::cdda::update_tag_columns(&self.pool, cddb_id, track, &changed)
                    .await?;
                if artwork_changed {
                    encore_storage::cdda::set_artwork(
                        &self.pool,
                        cddb_id,
                        track,
                        updated.artwork_id.as_deref(),
                    )
                    .await?;
                }
            }
            MediaSource::File | MediaSource::Stream => {
                encore_storage::media::update_tag_columns(
                    &self.pool,
                    &previous.filename,
                    &changed,
                )
                .await?;
                if artwork_changed {
                    encore_storage::media::set_artwork(
                        &self.pool,
                        &previous.filename,
                        updated.artwork_id.as_deref(),
                    )
                    .await?;
                }
            }
        }

        if previous.source.is_file() {
            let mut file_tags = changed.clone();
            if artwork_changed {
                file_tags.insert(Tag::Artwork, self.encoded_artwork(updated).await?);
            }
            self.write_file_tags(&previous.filename, file_tags);
        }

        self.notify(&LibraryEvent::Updated {
            previous: Some(previous.clone()),
            current: updated.clone(),
        });

        Ok(())
    }

    /// Persist new gain values when they differ from the previous record
    ///
    /// Returns whether the library was updated.
    ///
    /// # Errors
    /// Returns an error only for store failures.
    pub async fn update_track_gain(
        &self,
        previous: &MediaInfo,
        updated: &MediaInfo,
        notify: bool,
    ) -> Result<bool> {
        if previous.gain_track == updated.gain_track && previous.gain_album == updated.gain_album
        {
            return Ok(false);
        }

        match previous.source {
            MediaSource::CdAudio { cddb_id } => {
                encore_storage::cdda::set_gain(
                    &self.pool,
                    cddb_id,
                    previous.track_number.unwrap_or(0),
                    updated.gain_track,
                    updated.gain_album,
                )
                .await?;
            }
            MediaSource::File | MediaSource::Stream => {
                encore_storage::media::set_gain(
                    &self.pool,
                    &previous.filename,
                    updated.gain_track,
                    updated.gain_album,
                )
                .await?;
            }
        }

        if notify {
            self.notify(&LibraryEvent::Updated {
                previous: Some(previous.clone()),
                current: updated.clone(),
            });
        }
        Ok(true)
    }

    /// Merge decoder-reported properties into a record and persist them
    ///
    /// Used when a file or stream lacks authoritative tag data. Returns
    /// whether the library was updated.
    ///
    /// # Errors
    /// Returns an error only for store failures.
    pub async fn update_media_info_from_decoder(
        &self,
        media: &mut MediaInfo,
        properties: &StreamProperties,
        notify: bool,
    ) -> Result<bool> {
        let previous = media.clone();
        if !media.apply_stream_properties(properties) {
            return Ok(false);
        }

        match media.source {
            MediaSource::CdAudio { cddb_id } => {
                encore_storage::cdda::upsert(&self.pool, cddb_id, media).await?;
            }
            MediaSource::File | MediaSource::Stream => {
                encore_storage::media::upsert(&self.pool, media).await?;
            }
        }

        if notify {
            self.notify(&LibraryEvent::Updated {
                previous: Some(previous),
                current: media.clone(),
            });
        }
        Ok(true)
    }

    // === Artwork ===

    /// Store an artwork image, deduplicated by content
    ///
    /// Byte-identical images always yield the same identifier and at most
    /// one stored row, regardless of how many records reference them.
    ///
    /// # Errors
    /// Returns an error for store failures.
    pub async fn add_artwork(&self, image: &[u8]) -> Result<String> {
        let id = hex::encode(Sha256::digest(image));
        match self.find_artwork(&id, image).await? {
            Some(existing) => Ok(existing),
            None => {
                debug!("storing new artwork {} ({} bytes)", id, image.len());
                encore_storage::artwork::insert(&self.pool, &id, image).await?;
                Ok(id)
            }
        }
    }

    /// Search stored blobs for an exact byte match under an identifier
    ///
    /// Guards against identifier collisions: a blob stored under `id` whose
    /// bytes differ falls through to a derived identifier.
    async fn find_artwork(&self, id: &str, image: &[u8]) -> Result<Option<String>> {
        match encore_storage::artwork::find_match(&self.pool, id, image).await? {
            Some(true) => Ok(Some(id.to_string())),
            Some(false) => {
                warn!("artwork identifier collision on {}", id);
                let fallback = format!("{id}-{}", image.len());
                match encore_storage::artwork::find_match(&self.pool, &fallback, image).await? {
                    Some(true) => Ok(Some(fallback)),
                    Some(false) => Err(encore_core::CoreError::storage(format!(
                        "unresolvable artwork identifier collision on {id}"
                    ))),
                    None => {
                        encore_storage::artwork::insert(&self.pool, &fallback, image).await?;
                        Ok(Some(fallback))
                    }
                }
            }
            None => Ok(None),
        }
    }

    /// The artwork bytes for a record, or empty if it has none
    ///
    /// # Errors
    /// Returns an error for store failures.
    pub async fn get_media_artwork(&self, media: &MediaInfo) -> Result<Vec<u8>> {
        let Some(id) = &media.artwork_id else {
            return Ok(Vec::new());
        };
        Ok(self.artwork_bytes(id).await?.unwrap_or_default())
    }

    async fn artwork_bytes(&self, id: &str) -> Result<Option<Vec<u8>>> {
        if let Some(bytes) = lock(&self.artwork_cache).get(id) {
            return Ok(Some(bytes.clone()));
        }
        let fetched = encore_storage::artwork::get(&self.pool, id).await?;
        if let Some(bytes) = &fetched {
            lock(&self.artwork_cache).put(id.to_string(), bytes.clone());
        }
        Ok(fetched)
    }

    async fn encoded_artwork(&self, media: &MediaInfo) -> Result<String> {
        let bytes = self.get_media_artwork(media).await?;
        if bytes.is_empty() {
            Ok(String::new())
        } else {
            Ok(STANDARD.encode(bytes))
        }
    }

    /// The record rendered as a writable tag set, artwork included
    ///
    /// # Errors
    /// Returns an error for store failures while resolving artwork.
    pub async fn get_tags(&self, media: &MediaInfo) -> Result<Tags> {
        let mut tags = media.to_tags();
        if media.artwork_id.is_some() {
            let encoded = self.encoded_artwork(media).await?;
            if !encoded.is_empty() {
                tags.insert(Tag::Artwork, encoded);
            }
        }
        Ok(tags)
    }

    // === Pending tag writes ===

    /// Queue tags for a filename, to be written at the next opportunity
    pub fn add_pending_tags(&self, filename: &str, tags: &Tags) {
        self.pending.add(filename, tags);
    }

    /// The queued tags for a filename, if any
    pub fn get_pending_tags(&self, filename: &str) -> Option<Tags> {
        self.pending.get(filename)
    }

    /// Whether a tag write for this filename was attempted recently
    pub fn has_recently_written_tag(&self, filename: &str) -> bool {
        self.pending.has_recent_attempt(filename)
    }

    /// Record the time of a tag write attempt for this filename
    pub fn set_recently_written_tag(&self, filename: &str) {
        self.pending.mark_attempt(filename);
    }

    /// Try to flush the queued tags for one filename
    ///
    /// A drain point for the write-back path, typically called before
    /// playback of the file ends or at shutdown. Does nothing inside the
    /// debounce window.
    pub fn flush_pending_tags(&self, filename: &str) {
        if self.pending.has_recent_attempt(filename) {
            return;
        }
        let Some(tags) = self.pending.take(filename) else {
            return;
        };
        self.pending.mark_attempt(filename);
        if let Err(err) = self.tag_codec.write(Path::new(filename), &tags) {
            warn!("tag write for {} failed, re-queued: {}", filename, err);
            self.pending.add(filename, &tags);
        }
    }

    /// Try to flush every queued tag set (shutdown drain)
    pub fn flush_all_pending_tags(&self) {
        for filename in self.pending.files() {
            self.flush_pending_tags(&filename);
        }
    }

    /// Write tags into the file, queueing them instead when debounced, and
    /// re-queueing on failure; the attempt time is recorded regardless
    fn write_file_tags(&self, filename: &str, tags: Tags) {
        // Fold in anything already queued so a retry carries the full edit
        let mut merged = self.pending.take(filename).unwrap_or_default();
        for (tag, value) in tags {
            merged.insert(tag, value);
        }
        if merged.is_empty() {
            return;
        }

        if self.pending.has_recent_attempt(filename) {
            self.pending.add(filename, &merged);
            return;
        }

        self.pending.mark_attempt(filename);
        match self.tag_codec.write(Path::new(filename), &merged) {
            Ok(()) => debug!("wrote {} tag field(s) to {}", merged.len(), filename),
            Err(err) => {
                warn!("tag write for {} failed, queued for retry: {}", filename, err);
                self.pending.add(filename, &merged);
            }
        }
    }

    // === Query surface ===

    /// The artists contained in the library
    pub async fn get_artists(&self) -> Result<Vec<String>> {
        encore_storage::media::artists(&self.pool).await
    }

    /// The albums contained in the library
    pub async fn get_albums(&self) -> Result<Vec<String>> {
        encore_storage::media::albums(&self.pool).await
    }

    /// The albums by one artist
    pub async fn get_albums_by_artist(&self, artist: &str) -> Result<Vec<String>> {
        encore_storage::media::albums_by_artist(&self.pool, artist).await
    }

    /// The genres contained in the library
    pub async fn get_genres(&self) -> Result<Vec<String>> {
        encore_storage::media::genres(&self.pool).await
    }

    /// The years contained in the library
    pub async fn get_years(&self) -> Result<Vec<i32>> {
        encore_storage::media::years(&self.pool).await
    }

    /// Media by artist
    pub async fn get_media_by_artist(&self, artist: &str) -> Result<Vec<MediaInfo>> {
        encore_storage::media::by_artist(&self.pool, artist).await
    }

    /// Media by album
    pub async fn get_media_by_album(&self, album: &str) -> Result<Vec<MediaInfo>> {
        encore_storage::media::by_album(&self.pool, album).await
    }

    /// Media by artist & album
    pub async fn get_media_by_artist_and_album(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Vec<MediaInfo>> {
        encore_storage::media::by_artist_and_album(&self.pool, artist, album).await
    }

    /// Media by genre
    pub async fn get_media_by_genre(&self, genre: &str) -> Result<Vec<MediaInfo>> {
        encore_storage::media::by_genre(&self.pool, genre).await
    }

    /// Media by year
    pub async fn get_media_by_year(&self, year: i32) -> Result<Vec<MediaInfo>> {
        encore_storage::media::by_year(&self.pool, year).await
    }

    /// All media in the library
    pub async fn get_all_media(&self) -> Result<Vec<MediaInfo>> {
        encore_storage::media::get_all(&self.pool).await
    }

    /// All network streams in the library
    pub async fn get_streams(&self) -> Result<Vec<MediaInfo>> {
        encore_storage::media::get_streams(&self.pool).await
    }

    /// Whether the artist exists in the library
    pub async fn artist_exists(&self, artist: &str) -> Result<bool> {
        encore_storage::media::artist_exists(&self.pool, artist).await
    }

    /// Whether the album exists in the library
    pub async fn album_exists(&self, album: &str) -> Result<bool> {
        encore_storage::media::album_exists(&self.pool, album).await
    }

    /// Whether the artist & album pair exists in the library
    pub async fn artist_and_album_exists(&self, artist: &str, album: &str) -> Result<bool> {
        encore_storage::media::artist_and_album_exists(&self.pool, artist, album).await
    }

    /// Whether the genre exists in the library
    pub async fn genre_exists(&self, genre: &str) -> Result<bool> {
        encore_storage::media::genre_exists(&self.pool, genre).await
    }

    /// Whether the year exists in the library
    pub async fn year_exists(&self, year: i32) -> Result<bool> {
        encore_storage::media::year_exists(&self.pool, year).await
    }

    /// Remove a record from the library
    ///
    /// Returns whether a row was actually removed; a missing record is not
    /// an error.
    ///
    /// # Errors
    /// Returns an error for store failures.
    pub async fn remove_from_library(&self, media: &MediaInfo) -> Result<bool> {
        let removed = match media.source {
            MediaSource::CdAudio { cddb_id } => {
                encore_storage::cdda::remove(
                    &self.pool,
                    cddb_id,
                    media.track_number.unwrap_or(0),
                )
                .await?
            }
            MediaSource::File | MediaSource::Stream => {
                encore_storage::media::remove(&self.pool, &media.filename).await?
            }
        };

        if removed {
            self.notify(&LibraryEvent::Removed {
                media: media.clone(),
            });
        }
        Ok(removed)
    }

    /// The file extensions supported by the decoder backends, lowercase
    pub fn supported_file_extensions(&self) -> BTreeSet<String> {
        self.decoder_probe
            .supported_extensions()
            .into_iter()
            .map(|ext| ext.to_lowercase())
            .collect()
    }
}
