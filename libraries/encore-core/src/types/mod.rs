pub mod columns;
mod media;
mod tags;

pub use columns::Column;
pub use media::{FileAttributes, MediaInfo, MediaSource, StreamProperties};
pub use tags::{diff_tags, Tag, Tags};
