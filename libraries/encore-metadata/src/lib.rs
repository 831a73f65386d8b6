//! Encore Metadata
//!
//! Default implementations of the library's consumed interfaces:
//!
//! - [`FsFileProbe`] — file attributes via `std::fs::metadata`
//! - [`LoftyTagCodec`] — tag reading/writing via lofty
//! - [`SymphoniaDecoderProbe`] — intrinsic stream properties via symphonia
//!
//! The library absorbs failures from these backends into `Option`/`bool`
//! results; only storage failures surface to its callers.

mod codec;
mod decoder;
mod error;
mod probe;

pub use codec::LoftyTagCodec;
pub use decoder::SymphoniaDecoderProbe;
pub use error::MetadataError;
pub use probe::FsFileProbe;
