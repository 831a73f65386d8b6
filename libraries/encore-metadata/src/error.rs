use std::path::PathBuf;
use thiserror::Error;

/// Errors from the default metadata backends
#[derive(Debug, Error)]
pub enum MetadataError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Lofty tag error
    #[error("Tag error: {0}")]
    Tag(#[from] lofty::error::LoftyError),

    /// No decoder could open the stream
    #[error("Unsupported stream: {0}")]
    Unsupported(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<MetadataError> for encore_core::CoreError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Unsupported(msg) => encore_core::CoreError::Decoder(msg),
            other => encore_core::CoreError::metadata(other.to_string()),
        }
    }
}
