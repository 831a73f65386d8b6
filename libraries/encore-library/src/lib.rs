//! Encore Library
//!
//! The caching/reconciliation engine of the Encore media library: decides
//! when stored metadata is stale, when to re-scan a file through a decoder,
//! how to deduplicate artwork, and how to coalesce and rate-limit tag writes
//! back to disk.
//!
//! # Example
//!
//! ```rust,no_run
//! use encore_library::{Library, LookupOptions};
//! use encore_core::MediaInfo;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = encore_storage::create_pool("sqlite://encore.db").await?;
//! let library = Library::with_defaults(pool).await?;
//!
//! let query = MediaInfo::new("/music/song.flac");
//! if let Some(lookup) = library.get_media_info(&query, &LookupOptions::default()).await? {
//!     println!("{}", lookup.media.title_or_filename());
//! }
//! # Ok(())
//! # }
//! ```

mod library;
mod pending;

pub use library::{Library, LibraryConfig, LookupOptions, MediaLookup};
pub use pending::DEFAULT_TAG_WRITE_DEBOUNCE;

// Re-export the event type consumers subscribe to
pub use encore_core::LibraryEvent;
