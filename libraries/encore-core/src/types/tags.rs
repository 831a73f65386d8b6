/// Tag set types and diffing
///
/// Tags are carried as a map keyed by the `Tag` enum with string values, the
/// common denominator between database columns and file tag frames. An empty
/// string value means "clear this field". Artwork travels through the map as
/// base64-encoded image bytes.
use crate::types::media::MediaInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tag field kind
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Tag {
    /// Artist name
    Artist,
    /// Track title
    Title,
    /// Album name
    Album,
    /// Genre
    Genre,
    /// Release year
    Year,
    /// Free-form comment
    Comment,
    /// Track number
    Track,
    /// Version/remix description
    Version,
    /// Replay gain for the track, in dB
    GainTrack,
    /// Replay gain for the album, in dB
    GainAlbum,
    /// Artwork image bytes, base64 encoded
    Artwork,
}

/// A set of tag values keyed by field kind
pub type Tags = BTreeMap<Tag, String>;

/// Compute the fields of `updated` that differ from `previous`
///
/// The result contains one entry per changed field, carrying the updated
/// value; a field present in `previous` but absent from `updated` maps to an
/// empty string (clear).
pub fn diff_tags(previous: &Tags, updated: &Tags) -> Tags {
    let mut changed = Tags::new();
    for (tag, value) in updated {
        if previous.get(tag) != Some(value) {
            changed.insert(*tag, value.clone());
        }
    }
    for tag in previous.keys() {
        if !updated.contains_key(tag) {
            changed.insert(*tag, String::new());
        }
    }
    changed
}

fn format_gain(gain: f64) -> String {
    format!("{gain:.2}")
}

impl MediaInfo {
    /// Render this record's editable fields as a tag set
    ///
    /// Artwork is referenced by id only; the library layer substitutes the
    /// base64 image bytes when building tags for a file write.
    pub fn to_tags(&self) -> Tags {
        let mut tags = Tags::new();
        let text_fields = [
            (Tag::Artist, &self.artist),
            (Tag::Title, &self.title),
            (Tag::Album, &self.album),
            (Tag::Genre, &self.genre),
            (Tag::Comment, &self.comment),
            (Tag::Version, &self.version),
        ];
        for (tag, value) in text_fields {
            if let Some(value) = value {
                if !value.is_empty() {
                    tags.insert(tag, value.clone());
                }
            }
        }
        if let Some(year) = self.year {
            tags.insert(Tag::Year, year.to_string());
        }
        if let Some(track) = self.track_number {
            tags.insert(Tag::Track, track.to_string());
        }
        if let Some(gain) = self.gain_track {
            tags.insert(Tag::GainTrack, format_gain(gain));
        }
        if let Some(gain) = self.gain_album {
            tags.insert(Tag::GainAlbum, format_gain(gain));
        }
        tags
    }

    /// Update this record from a tag set
    ///
    /// An empty value clears the field. The `Artwork` entry is ignored here;
    /// image bytes are resolved against the artwork store by the library.
    pub fn apply_tags(&mut self, tags: &Tags) {
        for (tag, value) in tags {
            let text = (!value.is_empty()).then(|| value.clone());
            match tag {
                Tag::Artist => self.artist = text,
                Tag::Title => self.title = text,
                Tag::Album => self.album = text,
                Tag::Genre => self.genre = text,
                Tag::Comment => self.comment = text,
                Tag::Version => self.version = text,
                Tag::Year => self.year = value.parse().ok(),
                Tag::Track => self.track_number = value.parse().ok(),
                Tag::GainTrack => self.gain_track = value.parse().ok(),
                Tag::GainAlbum => self.gain_album = value.parse().ok(),
                Tag::Artwork => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_reports_only_changes() {
        let mut previous = Tags::new();
        previous.insert(Tag::Title, "Old".to_string());
        previous.insert(Tag::Artist, "Band".to_string());

        let mut updated = previous.clone();
        updated.insert(Tag::Title, "New".to_string());

        let changed = diff_tags(&previous, &updated);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed.get(&Tag::Title), Some(&"New".to_string()));
    }

    #[test]
    fn diff_marks_removed_fields_as_cleared() {
        let mut previous = Tags::new();
        previous.insert(Tag::Comment, "temp".to_string());

        let changed = diff_tags(&previous, &Tags::new());
        assert_eq!(changed.get(&Tag::Comment), Some(&String::new()));
    }

    #[test]
    fn tags_round_trip_through_media_info() {
        let mut media = MediaInfo::new("/music/a.flac");
        media.artist = Some("Band".to_string());
        media.title = Some("Song".to_string());
        media.year = Some(1997);
        media.track_number = Some(3);
        media.gain_track = Some(-6.5);

        let tags = media.to_tags();
        assert_eq!(tags.get(&Tag::Year), Some(&"1997".to_string()));
        assert_eq!(tags.get(&Tag::GainTrack), Some(&"-6.50".to_string()));

        let mut other = MediaInfo::new("/music/a.flac");
        other.apply_tags(&tags);
        assert_eq!(other.artist, media.artist);
        assert_eq!(other.year, media.year);
        assert_eq!(other.gain_track, Some(-6.5));
    }

    #[test]
    fn empty_value_clears_a_field() {
        let mut media = MediaInfo::new("/music/a.flac");
        media.comment = Some("noisy".to_string());

        let mut tags = Tags::new();
        tags.insert(Tag::Comment, String::new());
        media.apply_tags(&tags);
        assert_eq!(media.comment, None);
    }
}
