/// Media library column identifiers
///
/// The fixed enumeration of physical columns, and the static per-source
/// tables declaring which of them exist for ordinary media rows versus
/// CD-audio rows. The tables are read-only configuration built once.
use crate::types::media::MediaSource;

/// A physical column of the media/cdda tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Filename,
    Filetime,
    Filesize,
    Duration,
    SampleRate,
    BitsPerSample,
    Channels,
    Artist,
    Title,
    Album,
    Genre,
    Year,
    Comment,
    Track,
    Version,
    GainTrack,
    GainAlbum,
    Artwork,
    Cddb,
    Bitrate,
}

impl Column {
    /// The SQL column name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Filename => "filename",
            Self::Filetime => "filetime",
            Self::Filesize => "filesize",
            Self::Duration => "duration",
            Self::SampleRate => "samplerate",
            Self::BitsPerSample => "bitspersample",
            Self::Channels => "channels",
            Self::Artist => "artist",
            Self::Title => "title",
            Self::Album => "album",
            Self::Genre => "genre",
            Self::Year => "year",
            Self::Comment => "comment",
            Self::Track => "track",
            Self::Version => "version",
            Self::GainTrack => "gain_track",
            Self::GainAlbum => "gain_album",
            Self::Artwork => "artwork",
            Self::Cddb => "cddb",
            Self::Bitrate => "bitrate",
        }
    }
}

/// Columns of the media table
pub const MEDIA_COLUMNS: &[Column] = &[
    Column::Filename,
    Column::Filetime,
    Column::Filesize,
    Column::Duration,
    Column::SampleRate,
    Column::BitsPerSample,
    Column::Channels,
    Column::Artist,
    Column::Title,
    Column::Album,
    Column::Genre,
    Column::Year,
    Column::Comment,
    Column::Track,
    Column::Version,
    Column::GainTrack,
    Column::GainAlbum,
    Column::Artwork,
    Column::Bitrate,
];

/// Columns of the cdda table
pub const CDDA_COLUMNS: &[Column] = &[
    Column::Cddb,
    Column::Track,
    Column::Filename,
    Column::Filetime,
    Column::Filesize,
    Column::Duration,
    Column::SampleRate,
    Column::BitsPerSample,
    Column::Channels,
    Column::Artist,
    Column::Title,
    Column::Album,
    Column::Genre,
    Column::Year,
    Column::Comment,
    Column::Version,
    Column::GainTrack,
    Column::GainAlbum,
    Column::Artwork,
    Column::Bitrate,
];

/// The column table for a source kind
pub fn columns_for(source: MediaSource) -> &'static [Column] {
    match source {
        MediaSource::CdAudio { .. } => CDDA_COLUMNS,
        MediaSource::File | MediaSource::Stream => MEDIA_COLUMNS,
    }
}

/// The physical column a tag field is stored in
pub fn column_for_tag(tag: crate::types::Tag) -> Column {
    use crate::types::Tag;
    match tag {
        Tag::Artist => Column::Artist,
        Tag::Title => Column::Title,
        Tag::Album => Column::Album,
        Tag::Genre => Column::Genre,
        Tag::Year => Column::Year,
        Tag::Comment => Column::Comment,
        Tag::Track => Column::Track,
        Tag::Version => Column::Version,
        Tag::GainTrack => Column::GainTrack,
        Tag::GainAlbum => Column::GainAlbum,
        Tag::Artwork => Column::Artwork,
    }
}
