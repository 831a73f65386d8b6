//! End-to-end library behavior against an in-memory database
//!
//! The filesystem, tag codec, and decoder backends are replaced with
//! programmable stubs so staleness, write-back, and notification behavior
//! can be driven precisely.

use encore_core::{
    CoreError, FileAttributes, FileProbe, LibraryEvent, MediaInfo, StreamProperties, Tag,
    TagCodec, Tags,
};
use encore_library::{Library, LookupOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct StubFileProbe {
    attrs: Mutex<HashMap<String, FileAttributes>>,
    calls: AtomicUsize,
}

impl StubFileProbe {
    fn set(&self, path: &str, modified: i64, size: i64) {
        self.attrs
            .lock()
            .unwrap()
            .insert(path.to_string(), FileAttributes { modified, size });
    }

    fn unset(&self, path: &str) {
        self.attrs.lock().unwrap().remove(path);
    }
}

impl FileProbe for StubFileProbe {
    fn probe(&self, path: &Path) -> Option<FileAttributes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.attrs
            .lock()
            .unwrap()
            .get(&path.display().to_string())
            .copied()
    }
}

#[derive(Default)]
struct StubTagCodec {
    tags: Mutex<HashMap<String, Tags>>,
    writes: Mutex<Vec<(String, Tags)>>,
    fail_writes: AtomicBool,
}

impl StubTagCodec {
    fn set(&self, path: &str, tags: Tags) {
        self.tags.lock().unwrap().insert(path.to_string(), tags);
    }

    fn written(&self) -> Vec<(String, Tags)> {
        self.writes.lock().unwrap().clone()
    }
}

impl TagCodec for StubTagCodec {
    fn read(&self, path: &Path) -> encore_core::Result<Tags> {
        self.tags
            .lock()
            .unwrap()
            .get(&path.display().to_string())
            .cloned()
            .ok_or_else(|| CoreError::metadata("no tags"))
    }

    fn write(&self, path: &Path, tags: &Tags) -> encore_core::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::metadata("file is locked"));
        }
        self.writes
            .lock()
            .unwrap()
            .push((path.display().to_string(), tags.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct StubDecoderProbe {
    properties: Mutex<HashMap<String, StreamProperties>>,
    calls: AtomicUsize,
}

impl StubDecoderProbe {
    fn set(&self, path: &str, properties: StreamProperties) {
        self.properties
            .lock()
            .unwrap()
            .insert(path.to_string(), properties);
    }
}

impl encore_core::DecoderProbe for StubDecoderProbe {
    fn open(&self, path: &Path) -> encore_core::Result<StreamProperties> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.properties
            .lock()
            .unwrap()
            .get(&path.display().to_string())
            .copied()
            .ok_or_else(|| CoreError::decoder("unsupported"))
    }

    fn supported_extensions(&self) -> Vec<String> {
        vec!["FLAC".to_string(), "mp3".to_string(), "flac".to_string()]
    }
}

struct Fixture {
    library: Library,
    probe: Arc<StubFileProbe>,
    codec: Arc<StubTagCodec>,
    decoder: Arc<StubDecoderProbe>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn fixture() -> Fixture {
    init_tracing();
    let pool = encore_storage::create_memory_pool().await.unwrap();
    fixture_with_pool(pool).await
}

async fn fixture_with_pool(pool: SqlitePool) -> Fixture {
    let probe = Arc::new(StubFileProbe::default());
    let codec = Arc::new(StubTagCodec::default());
    let decoder = Arc::new(StubDecoderProbe::default());
    let library = Library::new(pool, probe.clone(), codec.clone(), decoder.clone())
        .await
        .unwrap();
    Fixture {
        library,
        probe,
        codec,
        decoder,
    }
}

fn default_properties() -> StreamProperties {
    StreamProperties {
        duration: Some(180.0),
        sample_rate: Some(44_100),
        bits_per_sample: Some(16),
        channels: Some(2),
        bitrate: None,
    }
}

fn tag_set(entries: &[(Tag, &str)]) -> Tags {
    entries
        .iter()
        .map(|(tag, value)| (*tag, (*value).to_string()))
        .collect()
}

async fn total_changes(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT total_changes()")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn unseen_path_is_scanned_into_a_record() {
    let fx = fixture().await;
    fx.probe.set("/music/a.flac", 1_700_000_000, 9_000_000);
    fx.decoder.set("/music/a.flac", default_properties());
    fx.codec.set(
        "/music/a.flac",
        tag_set(&[(Tag::Artist, "Band"), (Tag::Title, "Song"), (Tag::Year, "2001")]),
    );

    let lookup = fx
        .library
        .get_media_info(&MediaInfo::new("/music/a.flac"), &LookupOptions::default())
        .await
        .unwrap()
        .expect("record should be produced");

    assert!(lookup.current);
    let media = lookup.media;
    assert_eq!(media.filename, "/music/a.flac");
    assert_eq!(media.title.as_deref(), Some("Song"));
    assert_eq!(media.artist.as_deref(), Some("Band"));
    assert_eq!(media.year, Some(2001));
    assert_eq!(media.filetime, Some(1_700_000_000));
    assert_eq!(media.filesize, Some(9_000_000));
    assert_eq!(media.duration, Some(180.0));
    assert_eq!(media.sample_rate, Some(44_100));
    // Bitrate computed from size and duration
    assert!(media.bitrate.unwrap() > 0.0);

    // The record is persisted
    assert_eq!(fx.library.get_all_media().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unopenable_path_yields_no_record() {
    let fx = fixture().await;
    // No probe entry: the file is inaccessible

    let result = fx
        .library
        .get_media_info(&MediaInfo::new("/music/gone.flac"), &LookupOptions::default())
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(fx.decoder.calls.load(Ordering::SeqCst), 0);
    assert!(fx.library.get_all_media().await.unwrap().is_empty());
}

#[tokio::test]
async fn undecodable_file_yields_no_record() {
    let fx = fixture().await;
    fx.probe.set("/music/notes.txt", 1_700_000_000, 100);
    // No decoder entry: nothing can open it

    let result = fx
        .library
        .get_media_info(&MediaInfo::new("/music/notes.txt"), &LookupOptions::default())
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(fx.library.get_all_media().await.unwrap().is_empty());
}

#[tokio::test]
async fn fast_path_on_unchanged_file_writes_nothing() {
    let fx = fixture().await;
    fx.probe.set("/music/a.flac", 1_700_000_000, 9_000_000);
    fx.decoder.set("/music/a.flac", default_properties());
    fx.codec
        .set("/music/a.flac", tag_set(&[(Tag::Title, "Song")]));

    let query = MediaInfo::new("/music/a.flac");
    let options = LookupOptions::default();
    fx.library.get_media_info(&query, &options).await.unwrap().unwrap();
    assert_eq!(fx.decoder.calls.load(Ordering::SeqCst), 1);

    let changes_before = total_changes(fx.library.pool()).await;
    let first = fx.library.get_media_info(&query, &options).await.unwrap().unwrap();
    let second = fx.library.get_media_info(&query, &options).await.unwrap().unwrap();
    let changes_after = total_changes(fx.library.pool()).await;

    // No decoder re-open, no store writes, identical results
    assert_eq!(fx.decoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(changes_before, changes_after);
    assert!(first.current && second.current);
    assert_eq!(first.media, second.media);
}

#[tokio::test]
async fn changed_file_is_rescanned_with_notification() {
    let fx = fixture().await;
    fx.probe.set("/music/a.flac", 1_700_000_000, 9_000_000);
    fx.decoder.set("/music/a.flac", default_properties());
    fx.codec
        .set("/music/a.flac", tag_set(&[(Tag::Title, "Old Title")]));

    let query = MediaInfo::new("/music/a.flac");
    let options = LookupOptions::default();
    fx.library.get_media_info(&query, &options).await.unwrap().unwrap();

    let mut events = fx.library.subscribe();

    // The file is re-tagged and touched on disk
    fx.probe.set("/music/a.flac", 1_700_000_500, 9_000_123);
    fx.codec
        .set("/music/a.flac", tag_set(&[(Tag::Title, "New Title")]));

    let lookup = fx.library.get_media_info(&query, &options).await.unwrap().unwrap();
    assert!(lookup.current);
    assert_eq!(lookup.media.title.as_deref(), Some("New Title"));
    assert_eq!(lookup.media.filetime, Some(1_700_000_500));

    match events.try_recv().unwrap() {
        LibraryEvent::Updated { previous, current } => {
            assert_eq!(previous.unwrap().title.as_deref(), Some("Old Title"));
            assert_eq!(current.title.as_deref(), Some("New Title"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn stale_record_without_scan_is_returned_as_not_current() {
    let fx = fixture().await;
    fx.probe.set("/music/a.flac", 1_700_000_000, 9_000_000);
    fx.decoder.set("/music/a.flac", default_properties());
    fx.codec
        .set("/music/a.flac", tag_set(&[(Tag::Title, "Song")]));

    let query = MediaInfo::new("/music/a.flac");
    fx.library
        .get_media_info(&query, &LookupOptions::default())
        .await
        .unwrap()
        .unwrap();

    fx.probe.set("/music/a.flac", 1_700_000_500, 9_000_123);
    let options = LookupOptions {
        scan_media: false,
        ..LookupOptions::default()
    };
    let lookup = fx.library.get_media_info(&query, &options).await.unwrap().unwrap();

    assert!(!lookup.current);
    // The stored values were not touched
    assert_eq!(lookup.media.filetime, Some(1_700_000_000));
}

#[tokio::test]
async fn missing_file_is_kept_unless_removal_requested() {
    let fx = fixture().await;
    fx.probe.set("/music/a.flac", 1_700_000_000, 9_000_000);
    fx.decoder.set("/music/a.flac", default_properties());
    fx.codec
        .set("/music/a.flac", tag_set(&[(Tag::Title, "Song")]));

    let query = MediaInfo::new("/music/a.flac");
    fx.library
        .get_media_info(&query, &LookupOptions::default())
        .await
        .unwrap()
        .unwrap();

    // The file disappears
    fx.probe.unset("/music/a.flac");

    let kept = fx
        .library
        .get_media_info(&query, &LookupOptions::default())
        .await
        .unwrap()
        .expect("stale record should still be returned");
    assert!(!kept.current);
    assert_eq!(fx.library.get_all_media().await.unwrap().len(), 1);

    let mut events = fx.library.subscribe();
    let options = LookupOptions {
        remove_missing: true,
        ..LookupOptions::default()
    };
    let removed = fx.library.get_media_info(&query, &options).await.unwrap();
    assert!(removed.is_none());
    assert!(fx.library.get_all_media().await.unwrap().is_empty());
    assert!(matches!(
        events.try_recv().unwrap(),
        LibraryEvent::Removed { .. }
    ));
}

#[tokio::test]
async fn editing_tags_updates_store_and_writes_the_diff_once() {
    let fx = fixture().await;
    fx.probe.set("/music/Track 1.mp3", 1_700_000_000, 4_000_000);
    fx.decoder.set("/music/Track 1.mp3", default_properties());
    // No readable tags: the display title falls back to the file stem

    let query = MediaInfo::new("/music/Track 1.mp3");
    let options = LookupOptions::default();
    let created = fx.library.get_media_info(&query, &options).await.unwrap().unwrap();
    assert_eq!(created.media.title, None);
    assert_eq!(created.media.title_or_filename(), "Track 1");

    let mut updated = created.media.clone();
    updated.title = Some("Song".to_string());
    fx.library
        .update_media_tags(&created.media, &updated)
        .await
        .unwrap();

    // The store reflects the edit, all other fields untouched
    let fetched = fx.library.get_media_info(&query, &options).await.unwrap().unwrap();
    assert_eq!(fetched.media.title.as_deref(), Some("Song"));
    assert_eq!(fetched.media.artist, created.media.artist);
    assert_eq!(fetched.media.duration, created.media.duration);

    // Exactly one file write, carrying only the changed field
    let writes = fx.codec.written();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "/music/Track 1.mp3");
    assert_eq!(writes[0].1, tag_set(&[(Tag::Title, "Song")]));
    assert!(fx.library.has_recently_written_tag("/music/Track 1.mp3"));
    assert!(fx.library.get_pending_tags("/music/Track 1.mp3").is_none());
}

#[tokio::test]
async fn failed_file_write_keeps_the_edit_queued() {
    let fx = fixture().await;
    fx.probe.set("/music/a.mp3", 1_700_000_000, 4_000_000);
    fx.decoder.set("/music/a.mp3", default_properties());
    fx.codec.set("/music/a.mp3", tag_set(&[(Tag::Title, "Song")]));

    let query = MediaInfo::new("/music/a.mp3");
    let options = LookupOptions::default();
    let created = fx.library.get_media_info(&query, &options).await.unwrap().unwrap();

    fx.codec.fail_writes.store(true, Ordering::SeqCst);
    let mut updated = created.media.clone();
    updated.title = Some("Renamed".to_string());
    fx.library
        .update_media_tags(&created.media, &updated)
        .await
        .unwrap();

    // The database update went through despite the failed file write
    let fetched = fx.library.get_media_info(&query, &options).await.unwrap().unwrap();
    assert_eq!(fetched.media.title.as_deref(), Some("Renamed"));

    // The edit is queued and the attempt is debounced
    let pending = fx.library.get_pending_tags("/music/a.mp3").unwrap();
    assert_eq!(pending.get(&Tag::Title), Some(&"Renamed".to_string()));
    assert!(fx.library.has_recently_written_tag("/music/a.mp3"));

    // Inside the debounce window a flush does not retry
    fx.codec.fail_writes.store(false, Ordering::SeqCst);
    fx.library.flush_pending_tags("/music/a.mp3");
    assert!(fx.library.get_pending_tags("/music/a.mp3").is_some());
    assert!(fx.codec.written().is_empty());
}

#[tokio::test]
async fn recently_written_flag_follows_attempts() {
    let fx = fixture().await;
    assert!(!fx.library.has_recently_written_tag("/music/a.mp3"));
    fx.library.set_recently_written_tag("/music/a.mp3");
    assert!(fx.library.has_recently_written_tag("/music/a.mp3"));
    // Independent per path
    assert!(!fx.library.has_recently_written_tag("/music/b.mp3"));
}

#[tokio::test]
async fn identical_artwork_is_stored_once() {
    let fx = fixture().await;
    let image = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4];

    let first = fx.library.add_artwork(&image).await.unwrap();
    let second = fx.library.add_artwork(&image).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        encore_storage::artwork::count(fx.library.pool()).await.unwrap(),
        1
    );

    let other = fx.library.add_artwork(&[9, 9, 9]).await.unwrap();
    assert_ne!(first, other);
    assert_eq!(
        encore_storage::artwork::count(fx.library.pool()).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn artwork_resolves_through_records() {
    let fx = fixture().await;
    let image = vec![1, 2, 3, 4, 5];
    let id = fx.library.add_artwork(&image).await.unwrap();

    let mut media = MediaInfo::new("/music/a.flac");
    assert!(fx.library.get_media_artwork(&media).await.unwrap().is_empty());

    media.artwork_id = Some(id);
    assert_eq!(fx.library.get_media_artwork(&media).await.unwrap(), image);
    // Second read comes from the cache with the same bytes
    assert_eq!(fx.library.get_media_artwork(&media).await.unwrap(), image);

    let tags = fx.library.get_tags(&media).await.unwrap();
    let encoded = tags.get(&Tag::Artwork).unwrap();
    use base64::Engine as _;
    assert_eq!(
        base64::engine::general_purpose::STANDARD.decode(encoded).unwrap(),
        image
    );
}

#[tokio::test]
async fn embedded_artwork_is_deduplicated_during_scans() {
    let fx = fixture().await;
    use base64::Engine as _;
    let image = vec![7u8; 128];
    let encoded = base64::engine::general_purpose::STANDARD.encode(&image);

    for path in ["/music/a.flac", "/music/b.flac"] {
        fx.probe.set(path, 1_700_000_000, 9_000_000);
        fx.decoder.set(path, default_properties());
        let mut tags = tag_set(&[(Tag::Album, "Shared")]);
        tags.insert(Tag::Artwork, encoded.clone());
        fx.codec.set(path, tags);
        fx.library
            .get_media_info(&MediaInfo::new(path), &LookupOptions::default())
            .await
            .unwrap()
            .unwrap();
    }

    // Two records, one stored blob
    let records = fx.library.get_media_by_album("Shared").await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].artwork_id, records[1].artwork_id);
    assert_eq!(
        encore_storage::artwork::count(fx.library.pool()).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn gain_is_persisted_only_on_change() {
    let fx = fixture().await;
    fx.probe.set("/music/a.flac", 1_700_000_000, 9_000_000);
    fx.decoder.set("/music/a.flac", default_properties());
    fx.codec.set("/music/a.flac", tag_set(&[(Tag::Title, "Song")]));

    let query = MediaInfo::new("/music/a.flac");
    let options = LookupOptions::default();
    let created = fx.library.get_media_info(&query, &options).await.unwrap().unwrap();

    // Unchanged gain: no update, no event
    let mut events = fx.library.subscribe();
    let same = created.media.clone();
    assert!(!fx
        .library
        .update_track_gain(&created.media, &same, true)
        .await
        .unwrap());
    assert!(events.try_recv().is_err());

    let mut gained = created.media.clone();
    gained.gain_track = Some(-6.5);
    gained.gain_album = Some(-4.25);
    assert!(fx
        .library
        .update_track_gain(&created.media, &gained, true)
        .await
        .unwrap());

    let fetched = fx.library.get_media_info(&query, &options).await.unwrap().unwrap();
    assert_eq!(fetched.media.gain_track, Some(-6.5));
    assert_eq!(fetched.media.gain_album, Some(-4.25));
    assert!(matches!(
        events.try_recv().unwrap(),
        LibraryEvent::Updated { .. }
    ));
}

#[tokio::test]
async fn decoder_merge_creates_and_updates_stream_records() {
    let fx = fixture().await;
    let mut stream = MediaInfo::stream("http://radio.example/live");
    stream.title = Some("Radio".to_string());

    let properties = StreamProperties {
        duration: None,
        sample_rate: Some(48_000),
        bits_per_sample: None,
        channels: Some(2),
        bitrate: Some(128.0),
    };
    assert!(fx
        .library
        .update_media_info_from_decoder(&mut stream, &properties, true)
        .await
        .unwrap());

    let streams = fx.library.get_streams().await.unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].sample_rate, Some(48_000));
    assert_eq!(streams[0].bitrate, Some(128.0));

    // Identical properties change nothing
    assert!(!fx
        .library
        .update_media_info_from_decoder(&mut stream, &properties, true)
        .await
        .unwrap());

    // Stream lookups skip the file probe
    let lookup = fx
        .library
        .get_media_info(&stream, &LookupOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert!(lookup.current);
    assert_eq!(fx.probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn query_surface_reflects_stored_rows() {
    let fx = fixture().await;
    for (path, artist, album, genre, year) in [
        ("/music/a.flac", "Band", "First", "Rock", 2001),
        ("/music/b.flac", "Band", "Second", "Rock", 2003),
        ("/music/c.flac", "Solo", "Third", "Jazz", 2001),
    ] {
        fx.probe.set(path, 1_700_000_000, 9_000_000);
        fx.decoder.set(path, default_properties());
        fx.codec.set(
            path,
            tag_set(&[
                (Tag::Artist, artist),
                (Tag::Album, album),
                (Tag::Genre, genre),
                (Tag::Year, &year.to_string()),
            ]),
        );
        fx.library
            .get_media_info(&MediaInfo::new(path), &LookupOptions::default())
            .await
            .unwrap()
            .unwrap();
    }

    assert_eq!(fx.library.get_artists().await.unwrap(), vec!["Band", "Solo"]);
    assert_eq!(fx.library.get_albums().await.unwrap().len(), 3);
    assert_eq!(
        fx.library.get_albums_by_artist("Band").await.unwrap(),
        vec!["First", "Second"]
    );
    assert_eq!(fx.library.get_genres().await.unwrap(), vec!["Jazz", "Rock"]);
    assert_eq!(fx.library.get_years().await.unwrap(), vec![2001, 2003]);
    assert_eq!(fx.library.get_media_by_artist("Band").await.unwrap().len(), 2);
    assert_eq!(fx.library.get_media_by_genre("Jazz").await.unwrap().len(), 1);
    assert_eq!(fx.library.get_media_by_year(2001).await.unwrap().len(), 2);
    assert_eq!(
        fx.library
            .get_media_by_artist_and_album("Band", "Second")
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(fx.library.artist_exists("Band").await.unwrap());
    assert!(!fx.library.artist_exists("Nobody").await.unwrap());
    assert!(fx.library.artist_and_album_exists("Solo", "Third").await.unwrap());
    assert!(!fx.library.artist_and_album_exists("Solo", "First").await.unwrap());
    assert!(fx.library.genre_exists("Rock").await.unwrap());
    assert!(fx.library.year_exists(2003).await.unwrap());
    assert!(!fx.library.year_exists(1968).await.unwrap());
}

#[tokio::test]
async fn removal_reports_whether_a_row_was_deleted() {
    let fx = fixture().await;
    fx.probe.set("/music/a.flac", 1_700_000_000, 9_000_000);
    fx.decoder.set("/music/a.flac", default_properties());
    fx.codec.set("/music/a.flac", tag_set(&[(Tag::Title, "Song")]));

    let created = fx
        .library
        .get_media_info(&MediaInfo::new("/music/a.flac"), &LookupOptions::default())
        .await
        .unwrap()
        .unwrap();

    let ghost = MediaInfo::new("/music/ghost.flac");
    assert!(!fx.library.remove_from_library(&ghost).await.unwrap());
    assert_eq!(fx.library.get_all_media().await.unwrap().len(), 1);

    assert!(fx.library.remove_from_library(&created.media).await.unwrap());
    assert!(fx.library.get_all_media().await.unwrap().is_empty());
    assert!(!fx.library.remove_from_library(&created.media).await.unwrap());
}

#[tokio::test]
async fn supported_extensions_are_lowercase_and_deduplicated() {
    let fx = fixture().await;
    let extensions = fx.library.supported_file_extensions();
    assert_eq!(
        extensions.into_iter().collect::<Vec<_>>(),
        vec!["flac".to_string(), "mp3".to_string()]
    );
}
