/// Media record domain types
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Discriminator for where a media record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaSource {
    /// An ordinary file on disk
    File,
    /// A CD-audio track, keyed by `(cddb_id, track_number)`
    CdAudio {
        /// CDDB disc identifier
        cddb_id: i64,
    },
    /// A network stream URL
    Stream,
}

impl MediaSource {
    /// Whether this record refers to an ordinary file on disk
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File)
    }

    /// Whether this record refers to a network stream
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream)
    }

    /// Whether this record refers to a CD-audio track
    pub fn is_cd_audio(&self) -> bool {
        matches!(self, Self::CdAudio { .. })
    }
}

/// Filesystem attributes used for staleness detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttributes {
    /// Last-modified time (unix seconds)
    pub modified: i64,
    /// File size in bytes
    pub size: i64,
}

/// Intrinsic stream properties reported by a decoder probe
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamProperties {
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Sample rate in Hz
    pub sample_rate: Option<u32>,
    /// Bits per sample
    pub bits_per_sample: Option<u32>,
    /// Number of channels
    pub channels: Option<u32>,
    /// Bitrate in kbps, if the decoder reports one
    pub bitrate: Option<f64>,
}

/// A media library record
///
/// One record per distinct file path or stream URL. All fields other than
/// the filename are optional; a record is considered fresh when its stored
/// `(filetime, filesize)` pair matches the real file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Absolute file path or stream URL (unique key)
    pub filename: String,

    /// Last-modified time of the file (unix seconds)
    pub filetime: Option<i64>,

    /// File size in bytes
    pub filesize: Option<i64>,

    /// Duration in seconds
    pub duration: Option<f64>,

    /// Sample rate in Hz
    pub sample_rate: Option<u32>,

    /// Bits per sample
    pub bits_per_sample: Option<u32>,

    /// Number of channels
    pub channels: Option<u32>,

    /// Artist name
    pub artist: Option<String>,

    /// Track title
    pub title: Option<String>,

    /// Album name
    pub album: Option<String>,

    /// Genre
    pub genre: Option<String>,

    /// Release year
    pub year: Option<i32>,

    /// Free-form comment
    pub comment: Option<String>,

    /// Track number
    pub track_number: Option<i32>,

    /// Version/remix description
    pub version: Option<String>,

    /// Replay gain for the track, in dB
    pub gain_track: Option<f64>,

    /// Replay gain for the album, in dB
    pub gain_album: Option<f64>,

    /// Content identifier of the associated artwork, if any
    pub artwork_id: Option<String>,

    /// Source kind
    pub source: MediaSource,

    /// Bitrate in kbps (reported by the decoder, or computed)
    pub bitrate: Option<f64>,
}

impl MediaInfo {
    /// Create an empty record for a file path
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            filetime: None,
            filesize: None,
            duration: None,
            sample_rate: None,
            bits_per_sample: None,
            channels: None,
            artist: None,
            title: None,
            album: None,
            genre: None,
            year: None,
            comment: None,
            track_number: None,
            version: None,
            gain_track: None,
            gain_album: None,
            artwork_id: None,
            source: MediaSource::File,
            bitrate: None,
        }
    }

    /// Create an empty record for a stream URL
    pub fn stream(url: impl Into<String>) -> Self {
        let mut media = Self::new(url);
        media.source = MediaSource::Stream;
        media
    }

    /// Create an empty record for a CD-audio track
    pub fn cd_audio(cddb_id: i64, track_number: i32) -> Self {
        let mut media = Self::new(format!("cdda://{cddb_id}/{track_number}"));
        media.source = MediaSource::CdAudio { cddb_id };
        media.track_number = Some(track_number);
        media
    }

    /// The display title: the tagged title, falling back to the file stem
    pub fn title_or_filename(&self) -> String {
        if let Some(title) = &self.title {
            if !title.is_empty() {
                return title.clone();
            }
        }
        let name = Path::new(&self.filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.filename);
        name.to_string()
    }

    /// Whether the stored file attributes match the given probe result
    pub fn file_attributes_match(&self, attrs: &FileAttributes) -> bool {
        self.filetime == Some(attrs.modified) && self.filesize == Some(attrs.size)
    }

    /// Get the duration as a `Duration`
    pub fn duration(&self) -> Option<Duration> {
        self.duration.map(Duration::from_secs_f64)
    }

    /// Merge decoder-reported properties into this record
    ///
    /// Returns whether any field changed.
    pub fn apply_stream_properties(&mut self, properties: &StreamProperties) -> bool {
        let before = self.clone();

        if properties.duration.is_some() {
            self.duration = properties.duration;
        }
        if properties.sample_rate.is_some() {
            self.sample_rate = properties.sample_rate;
        }
        if properties.bits_per_sample.is_some() {
            self.bits_per_sample = properties.bits_per_sample;
        }
        if properties.channels.is_some() {
            self.channels = properties.channels;
        }
        if properties.bitrate.is_some() {
            self.bitrate = properties.bitrate;
        }
        self.refresh_bitrate();

        *self != before
    }

    /// Fill in the bitrate from file size and duration when not reported
    pub fn refresh_bitrate(&mut self) {
        if self.bitrate.is_none() {
            self.bitrate = self.computed_bitrate();
        }
    }

    /// Bitrate in kbps: the stored value, or `filesize * 8 / duration`
    pub fn computed_bitrate(&self) -> Option<f64> {
        if self.bitrate.is_some() {
            return self.bitrate;
        }
        match (self.filesize, self.duration) {
            (Some(size), Some(duration)) if duration > 0.0 => {
                Some((size as f64) * 8.0 / duration / 1000.0)
            }
            _ => None,
        }
    }
}
