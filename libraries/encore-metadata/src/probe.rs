/// Filesystem attribute probe
use encore_core::{FileAttributes, FileProbe};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// File probe backed by `std::fs::metadata`
#[derive(Debug, Default)]
pub struct FsFileProbe;

impl FsFileProbe {
    /// Create a new probe
    pub fn new() -> Self {
        Self
    }
}

impl FileProbe for FsFileProbe {
    fn probe(&self, path: &Path) -> Option<FileAttributes> {
        let meta = std::fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        let modified = meta
            .modified()
            .ok()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Some(FileAttributes {
            modified,
            size: meta.len() as i64,
        })
    }
}
