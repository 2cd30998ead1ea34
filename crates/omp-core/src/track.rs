//! Track and metadata value types
//!
//! Queue entries, metadata library entries and the resolved display view
//! shared by the controller, the cover resolver and the media session.

use serde::{ Deserialize, Serialize };


/// Media type assumed for embedded covers that carry none.
pub const DEFAULT_COVER_TYPE: &str = "image/png";


/// A playable entry in a queue.
///
/// `path` is the unique key within a queue. Tracks are never mutated once
/// they are placed in a queue.
#[derive( Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize )]
pub struct Track {
    pub path: String,
    pub title: String,
    pub size: u64,
}


impl Track {
    pub fn new( path: impl Into<String>, title: impl Into<String>, size: u64 ) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            size,
        }
    }
}


/// Raw embedded artwork.
#[derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize )]
pub struct Picture {
    #[serde( default = "default_cover_type" )]
    pub media_type: String,
    pub data: Vec<u8>,
}


fn default_cover_type() -> String {
    DEFAULT_COVER_TYPE.to_string()
}


impl Picture {
    pub fn new( media_type: impl Into<String>, data: Vec<u8> ) -> Self {
        Self { media_type: media_type.into(), data }
    }
}


/// One entry of the external metadata library, keyed by path.
#[derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize )]
pub struct MetadataEntry {
    pub path: String,
    pub title: String,
    pub artist: String,
    #[serde( default, skip_serializing_if = "Option::is_none" )]
    pub album: Option<String>,
    #[serde( default, skip_serializing_if = "Option::is_none" )]
    pub cover: Option<Picture>,
}


/// The resolved, UI-facing description of a track.
///
/// Derived from a [`Track`] and the metadata library; recomputed rather than
/// mutated whenever either changes.
#[derive( Debug, Clone, PartialEq, Eq, Serialize )]
pub struct DisplayMetadata {
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover: Option<Picture>,
    pub size: Option<u64>,
}


impl DisplayMetadata {
    /// Builds the display view from a single matching entry.
    pub fn from_entry( entry: &MetadataEntry, size: u64 ) -> Self {
        Self {
            path: entry.path.clone(),
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            album: entry.album.clone(),
            cover: entry.cover.clone(),
            size: Some( size ),
        }
    }


    /// Builds the bare filename view used when metadata is missing or ambiguous.
    pub fn fallback( track: &Track ) -> Self {
        Self {
            path: track.path.clone(),
            title: track.title.clone(),
            artist: String::new(),
            album: None,
            cover: None,
            size: None,
        }
    }
}
