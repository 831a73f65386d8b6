//! Encore Core
//!
//! Platform-agnostic domain types, traits, and error handling for the Encore
//! media library.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `MediaInfo`, `Tags`, `Column`, `MediaSource`
//! - **Consumed Interfaces**: `FileProbe`, `TagCodec`, `DecoderProbe`
//! - **Events**: `LibraryEvent` change notifications
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use encore_core::types::{MediaInfo, MediaSource};
//!
//! let mut media = MediaInfo::new("/music/song.flac");
//! media.title = Some("My Favorite Song".to_string());
//! assert_eq!(media.source, MediaSource::File);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use events::LibraryEvent;
pub use traits::{DecoderProbe, FileProbe, TagCodec};

// Export all types
pub use types::{
    columns, diff_tags, Column, FileAttributes, MediaInfo, MediaSource, StreamProperties, Tag,
    Tags,
};
