/// Tag codec implementation using lofty
use crate::error::MetadataError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use encore_core::{Result, Tag, TagCodec, Tags};
use lofty::{ItemKey, MimeType, Picture, PictureType, TagExt, TaggedFileExt};
use std::path::Path;

/// Embedded images above this size are ignored
const MAX_ARTWORK_SIZE: usize = 10 * 1024 * 1024;

/// Tag reader/writer backed by the lofty library
#[derive(Debug, Default)]
pub struct LoftyTagCodec;

impl LoftyTagCodec {
    /// Create a new codec
    pub fn new() -> Self {
        Self
    }

    fn extract_text_items(tag: &lofty::Tag, tags: &mut Tags) {
        for item in tag.items() {
            let Some(text) = item.value().text() else {
                continue;
            };
            match item.key() {
                ItemKey::TrackArtist => {
                    tags.insert(Tag::Artist, text.to_string());
                }
                ItemKey::TrackTitle => {
                    tags.insert(Tag::Title, text.to_string());
                }
                ItemKey::AlbumTitle => {
                    tags.insert(Tag::Album, text.to_string());
                }
                ItemKey::Genre => {
                    tags.insert(Tag::Genre, text.to_string());
                }
                ItemKey::Comment => {
                    tags.insert(Tag::Comment, text.to_string());
                }
                ItemKey::TrackSubtitle => {
                    tags.insert(Tag::Version, text.to_string());
                }
                ItemKey::TrackNumber => {
                    tags.insert(Tag::Track, text.to_string());
                }
                ItemKey::Year => {
                    tags.insert(Tag::Year, text.to_string());
                }
                ItemKey::RecordingDate => {
                    // Prefer an explicit year frame; dates fall back to the year part
                    if !tags.contains_key(&Tag::Year) {
                        if let Some(year) = parse_year(text) {
                            tags.insert(Tag::Year, year);
                        }
                    }
                }
                ItemKey::ReplayGainTrackGain => {
                    tags.insert(Tag::GainTrack, parse_gain(text));
                }
                ItemKey::ReplayGainAlbumGain => {
                    tags.insert(Tag::GainAlbum, parse_gain(text));
                }
                _ => {}
            }
        }
    }

    fn extract_artwork(tag: &lofty::Tag, tags: &mut Tags) {
        let pictures = tag.pictures();
        let picture = pictures
            .iter()
            .find(|p| matches!(p.pic_type(), PictureType::CoverFront))
            .or_else(|| pictures.first());
        let Some(picture) = picture else {
            return;
        };

        let data = picture.data();
        if data.is_empty() {
            return;
        }
        if data.len() > MAX_ARTWORK_SIZE {
            tracing::warn!("skipping oversized embedded artwork ({} bytes)", data.len());
            return;
        }
        tags.insert(Tag::Artwork, STANDARD.encode(data));
    }
}

impl TagCodec for LoftyTagCodec {
    fn read(&self, path: &Path) -> Result<Tags> {
        if !path.exists() {
            return Err(MetadataError::FileNotFound(path.to_path_buf()).into());
        }

        let tagged_file = lofty::read_from_path(path).map_err(MetadataError::Tag)?;

        let mut tags = Tags::new();
        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            return Ok(tags);
        };

        Self::extract_text_items(tag, &mut tags);
        Self::extract_artwork(tag, &mut tags);

        Ok(tags)
    }

    fn write(&self, path: &Path, tags: &Tags) -> Result<()> {
        if !path.exists() {
            return Err(MetadataError::FileNotFound(path.to_path_buf()).into());
        }

        let mut tagged_file = lofty::read_from_path(path).map_err(MetadataError::Tag)?;
        if tagged_file.primary_tag_mut().is_none() {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(lofty::Tag::new(tag_type));
        }
        let Some(tag) = tagged_file.primary_tag_mut() else {
            return Err(MetadataError::Unsupported(format!(
                "no writable tag for {}",
                path.display()
            ))
            .into());
        };

        for (field, value) in tags {
            match field {
                Tag::Artwork => {
                    tag.remove_picture_type(PictureType::CoverFront);
                    if !value.is_empty() {
                        if let Ok(image) = STANDARD.decode(value) {
                            tag.push_picture(Picture::new_unchecked(
                                PictureType::CoverFront,
                                Some(sniff_mime(&image)),
                                None,
                                image,
                            ));
                        }
                    }
                }
                _ => {
                    let key = item_key(*field);
                    if value.is_empty() {
                        tag.remove_key(&key);
                    } else {
                        let text = match field {
                            Tag::GainTrack | Tag::GainAlbum => format!("{value} dB"),
                            _ => value.clone(),
                        };
                        tag.insert_text(key, text);
                    }
                }
            }
        }

        tag.save_to_path(path).map_err(MetadataError::Tag)?;
        Ok(())
    }
}

fn item_key(field: Tag) -> ItemKey {
    match field {
        Tag::Artist => ItemKey::TrackArtist,
        Tag::Title => ItemKey::TrackTitle,
        Tag::Album => ItemKey::AlbumTitle,
        Tag::Genre => ItemKey::Genre,
        Tag::Comment => ItemKey::Comment,
        Tag::Version => ItemKey::TrackSubtitle,
        Tag::Track => ItemKey::TrackNumber,
        Tag::Year => ItemKey::Year,
        Tag::GainTrack => ItemKey::ReplayGainTrackGain,
        Tag::GainAlbum => ItemKey::ReplayGainAlbumGain,
        // Handled through the picture API
        Tag::Artwork => ItemKey::Unknown(String::new()),
    }
}

/// Strip the conventional " dB" suffix from a replay gain value
fn parse_gain(text: &str) -> String {
    text.trim().trim_end_matches("dB").trim().to_string()
}

/// The year part of a date value like "1997-05-12"
fn parse_year(text: &str) -> Option<String> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    (digits.len() == 4).then_some(digits)
}

fn sniff_mime(image: &[u8]) -> MimeType {
    if image.starts_with(&[0x89, b'P', b'N', b'G']) {
        MimeType::Png
    } else {
        MimeType::Jpeg
    }
}
