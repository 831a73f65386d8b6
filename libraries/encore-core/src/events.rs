//! Library change events
//!
//! Emitted when a record is rebuilt, edited, or removed so consumers (list
//! views, now-playing displays) can re-render. Delivery is at-least-once;
//! no ordering is guaranteed across distinct paths.

use crate::types::MediaInfo;
use serde::{Deserialize, Serialize};

/// Events emitted by the library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LibraryEvent {
    /// A record was created or its stored values changed
    Updated {
        /// The record as previously stored, if it existed
        previous: Option<MediaInfo>,
        /// The record as now stored
        current: MediaInfo,
    },

    /// A record was removed from the library
    Removed {
        /// The removed record
        media: MediaInfo,
    },
}
