/// Decoder probe implementation using symphonia
use crate::error::MetadataError;
use encore_core::{DecoderProbe, Result, StreamProperties};
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Stream property probe backed by symphonia
#[derive(Debug, Default)]
pub struct SymphoniaDecoderProbe;

impl SymphoniaDecoderProbe {
    /// Create a new probe
    pub fn new() -> Self {
        Self
    }
}

impl DecoderProbe for SymphoniaDecoderProbe {
    fn open(&self, path: &Path) -> Result<StreamProperties> {
        if !path.exists() {
            return Err(MetadataError::FileNotFound(path.to_path_buf()).into());
        }

        let file = std::fs::File::open(path).map_err(MetadataError::Io)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // A hint from the extension helps the format registry guess
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                MetadataError::Unsupported(format!("failed to probe {}: {e}", path.display()))
            })?;

        let format = probed.format;
        let track = format.default_track().ok_or_else(|| {
            MetadataError::Unsupported(format!("no audio tracks in {}", path.display()))
        })?;

        let params = &track.codec_params;
        let sample_rate = params.sample_rate;
        let channels = params.channels.map(|c| c.count() as u32);
        let bits_per_sample = params.bits_per_sample;

        let duration = match (params.n_frames, params.time_base) {
            (Some(n_frames), Some(time_base)) => {
                let time = time_base.calc_time(n_frames);
                Some(time.seconds as f64 + time.frac)
            }
            (Some(n_frames), None) => sample_rate
                .filter(|rate| *rate > 0)
                .map(|rate| n_frames as f64 / f64::from(rate)),
            _ => None,
        };

        Ok(StreamProperties {
            duration,
            sample_rate,
            bits_per_sample,
            channels,
            bitrate: None,
        })
    }

    fn supported_extensions(&self) -> Vec<String> {
        [
            "aac", "adpcm", "aiff", "alac", "caf", "flac", "m4a", "mkv", "mp1", "mp2", "mp3",
            "mp4", "oga", "ogg", "opus", "wav", "webm",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }
}
