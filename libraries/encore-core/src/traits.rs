/// Consumed interfaces for the Encore library
///
/// The library core treats the filesystem, tag backends, and decoders as
/// opaque capabilities behind these traits. Helper-level failures are
/// absorbed by the library; only storage failures surface to callers.
use crate::error::Result;
use crate::types::{FileAttributes, StreamProperties, Tags};
use std::path::Path;

/// Filesystem attribute probe
pub trait FileProbe: Send + Sync {
    /// Get the last-modified time and size of a file
    ///
    /// Returns `None` if the file cannot be accessed.
    fn probe(&self, path: &Path) -> Option<FileAttributes>;
}

/// Tag reader/writer
pub trait TagCodec: Send + Sync {
    /// Read the normalized tag set from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    fn read(&self, path: &Path) -> Result<Tags>;

    /// Write the given tag fields into a file
    ///
    /// An empty value removes the corresponding tag frame.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written (permissions,
    /// unsupported format, file in use)
    fn write(&self, path: &Path, tags: &Tags) -> Result<()>;
}

/// Decoder-backed stream property probe
pub trait DecoderProbe: Send + Sync {
    /// Open a stream and report its intrinsic properties
    ///
    /// # Errors
    /// Returns an error if no decoder can open the path
    fn open(&self, path: &Path) -> Result<StreamProperties>;

    /// File extensions this probe can open, lowercase without the dot
    fn supported_extensions(&self) -> Vec<String> {
        Vec::new()
    }
}
