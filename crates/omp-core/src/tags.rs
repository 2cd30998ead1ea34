//! Tag reading via Symphonia
//!
//! Extracts title, artist, album, embedded cover and duration from audio
//! files to build metadata library entries.

use std::fs::File;
use std::path::Path;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{ Limit, MetadataOptions, MetadataRevision, StandardTagKey, StandardVisualKey };
use symphonia::core::probe::Hint;
use thiserror::Error;

use crate::track::{ MetadataEntry, Picture };


/// Largest embedded picture that is read into memory.
const MAX_COVER_BYTES: usize = 12 * 1024 * 1024;


/// Errors that can occur while reading tags.
#[derive( Debug, Error )]
pub enum TagError {
    #[error( "Failed to open file: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Unsupported format" )]
    UnsupportedFormat,
}


/// Tags found in a file.
#[derive( Debug, Clone, Default, PartialEq )]
pub struct TagInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub cover: Option<Picture>,
    /// Duration in seconds, if the container reports it.
    pub duration: Option<f64>,
}


impl TagInfo {
    /// Converts the tags into a library entry for `path`.
    ///
    /// Returns None when the file carries no title, artist, album or cover.
    pub fn into_entry( self, path: impl Into<String>, file_name: &str ) -> Option<MetadataEntry> {
        if self.title.is_none() && self.artist.is_none() && self.album.is_none() && self.cover.is_none() {
            return None;
        }

        Some( MetadataEntry {
            path: path.into(),
            title: self.title.unwrap_or_else( || file_name.to_string() ),
            artist: self.artist.unwrap_or_default(),
            album: self.album,
            cover: self.cover,
        })
    }
}


/// Reads the tags of the file at `path`.
pub fn read( path: &Path ) -> Result<TagInfo, TagError> {
    let file = File::open( path )?;
    let mss = MediaSourceStream::new( Box::new( file ), Default::default() );

    let mut hint = Hint::new();
    if let Some( ext ) = path.extension().and_then( |e| e.to_str() ) {
        hint.with_extension( ext );
    }

    let metadata_opts = MetadataOptions {
        limit_visual_bytes: Limit::Maximum( MAX_COVER_BYTES ),
        ..Default::default()
    };

    let mut probed = symphonia::default::get_probe()
        .format( &hint, mss, &FormatOptions::default(), &metadata_opts )
        .map_err( |_| TagError::UnsupportedFormat )?;

    let mut info = TagInfo::default();

    // Probe metadata first (ID3 and friends), then the container's own
    if let Some( metadata_log ) = probed.metadata.get() {
        if let Some( revision ) = metadata_log.current() {
            extract( &mut info, revision );
        }
    }
    if let Some( revision ) = probed.format.metadata().current() {
        extract( &mut info, revision );
    }

    info.duration = probed.format
        .tracks()
        .iter()
        .find( |t| t.codec_params.codec != CODEC_TYPE_NULL )
        .and_then( |t| {
            let frames = t.codec_params.n_frames?;
            let rate = t.codec_params.sample_rate?;
            Some( frames as f64 / rate as f64 )
        });

    Ok( info )
}


fn extract( info: &mut TagInfo, revision: &MetadataRevision ) {
    for tag in revision.tags() {
        let Some( key ) = tag.std_key else {
            continue;
        };
        let value = tag.value.to_string().trim().to_string();
        if value.is_empty() {
            continue;
        }

        let slot = match key {
            StandardTagKey::TrackTitle => &mut info.title,
            StandardTagKey::Artist => &mut info.artist,
            StandardTagKey::Album => &mut info.album,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some( value );
        }
    }

    if info.cover.is_none() {
        let visuals = revision.visuals();
        let chosen = visuals
            .iter()
            .find( |v| v.usage == Some( StandardVisualKey::FrontCover ) )
            .or( visuals.first() );
        if let Some( visual ) = chosen.filter( |v| !v.data.is_empty() ) {
            info.cover = Some( Picture::new( visual.media_type.clone(), visual.data.to_vec() ) );
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    /// One second of 8 kHz mono 16-bit silence.
    fn silent_wav() -> Vec<u8> {
        let data_len: u32 = 16_000;
        let mut wav = Vec::new();
        wav.extend_from_slice( b"RIFF" );
        wav.extend_from_slice( &( 36 + data_len ).to_le_bytes() );
        wav.extend_from_slice( b"WAVEfmt " );
        wav.extend_from_slice( &16u32.to_le_bytes() );
        wav.extend_from_slice( &1u16.to_le_bytes() );
        wav.extend_from_slice( &1u16.to_le_bytes() );
        wav.extend_from_slice( &8_000u32.to_le_bytes() );
        wav.extend_from_slice( &16_000u32.to_le_bytes() );
        wav.extend_from_slice( &2u16.to_le_bytes() );
        wav.extend_from_slice( &16u16.to_le_bytes() );
        wav.extend_from_slice( b"data" );
        wav.extend_from_slice( &data_len.to_le_bytes() );
        wav.resize( wav.len() + data_len as usize, 0 );
        wav
    }


    #[test]
    fn test_read_wav_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "silence.wav" );
        std::fs::write( &path, silent_wav() ).unwrap();

        let info = read( &path ).unwrap();
        let duration = info.duration.unwrap();
        assert!( ( duration - 1.0 ).abs() < 1e-6 );
        assert_eq!( info.title, None );
    }


    #[test]
    fn test_read_garbage_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "noise.mp3" );
        std::fs::write( &path, b"definitely not audio" ).unwrap();

        assert!( matches!( read( &path ), Err( TagError::UnsupportedFormat ) ) );
    }


    #[test]
    fn test_read_missing_file() {
        assert!( matches!( read( Path::new( "/nonexistent/omp.flac" ) ), Err( TagError::Io( _ ) ) ) );
    }


    #[test]
    fn test_into_entry() {
        assert_eq!( TagInfo::default().into_entry( "a.mp3", "a.mp3" ), None );

        let info = TagInfo {
            artist: Some( "Artist".to_string() ),
            ..TagInfo::default()
        };
        let entry = info.into_entry( "dir/a.mp3", "a.mp3" ).unwrap();
        assert_eq!( entry.path, "dir/a.mp3" );
        assert_eq!( entry.title, "a.mp3" );
        assert_eq!( entry.artist, "Artist" );
        assert_eq!( entry.album, None );
    }
}
