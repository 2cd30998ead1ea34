//! Track listings
//!
//! A listing is the file/library source the engine plays from: an ordered
//! set of tracks plus the metadata library for them. Listings come from
//! scanning a local directory or from a JSON file.

use std::fs;
use std::path::{ Path, PathBuf };

use serde::{ Deserialize, Serialize };
use thiserror::Error;

use crate::metadata::MetadataLibrary;
use crate::tags;
use crate::track::Track;


/// Supported media file extensions.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "wav", "m4a", "aac", "opus", "aiff", "alac",
    "mp4", "m4v", "mkv", "webm",
];


/// Errors that can occur while loading or saving a listing.
#[derive( Debug, Error )]
pub enum LibraryError {
    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Invalid listing: {0}" )]
    Json( #[from] serde_json::Error ),

    #[error( "Path not found: {0}" )]
    NotFound( PathBuf ),
}


/// Tracks and their metadata, relative to a root directory.
#[derive( Debug, Clone, Default, Serialize, Deserialize )]
pub struct Listing {
    #[serde( default )]
    pub tracks: Vec<Track>,

    #[serde( default )]
    pub metadata: MetadataLibrary,

    /// Directory track paths are relative to.
    #[serde( skip )]
    pub root: PathBuf,
}


impl Listing {
    /// Scans `root` recursively for media files.
    ///
    /// Track paths are relative to `root` with `/` separators, titles are the
    /// file names. Files whose tags cannot be read get no metadata entry.
    pub fn scan( root: &Path ) -> Result<Self, LibraryError> {
        if !root.is_dir() {
            return Err( LibraryError::NotFound( root.to_path_buf() ) );
        }

        tracing::info!( "Scanning: {:?}", root );
        let mut files = Vec::new();
        scan_recursive( root, &mut files )?;
        files.sort();

        let mut listing = Listing {
            root: root.to_path_buf(),
            ..Listing::default()
        };

        for file in files {
            let Ok( relative ) = file.strip_prefix( root ) else {
                continue;
            };
            let path = relative.to_string_lossy().replace( '\\', "/" );
            let title = file.file_name()
                .map( |n| n.to_string_lossy().into_owned() )
                .unwrap_or_else( || path.clone() );
            let size = fs::metadata( &file ).map( |m| m.len() ).unwrap_or( 0 );

            match tags::read( &file ) {
                Ok( info ) => {
                    if let Some( entry ) = info.into_entry( path.clone(), &title ) {
                        listing.metadata.push( entry );
                    }
                }
                Err( e ) => tracing::debug!( "No tags for {:?}: {}", file, e ),
            }

            listing.tracks.push( Track { path, title, size } );
        }

        tracing::info!( "Found {} tracks, {} with metadata", listing.tracks.len(), listing.metadata.len() );
        Ok( listing )
    }


    /// Loads a JSON listing. Track paths are relative to the file's directory.
    pub fn load( path: &Path ) -> Result<Self, LibraryError> {
        let contents = match fs::read_to_string( path ) {
            Ok( c ) => c,
            Err( e ) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err( LibraryError::NotFound( path.to_path_buf() ) );
            }
            Err( e ) => return Err( LibraryError::Io( e ) ),
        };

        let mut listing: Listing = serde_json::from_str( &contents )?;
        listing.root = path.parent().map( Path::to_path_buf ).unwrap_or_default();
        Ok( listing )
    }


    /// Loads a JSON listing or scans a directory, depending on `path`.
    pub fn open( path: &Path ) -> Result<Self, LibraryError> {
        if path.is_dir() {
            Self::scan( path )
        } else {
            Self::load( path )
        }
    }


    /// Saves the listing as pretty-printed JSON.
    pub fn save( &self, path: &Path ) -> Result<(), LibraryError> {
        if let Some( parent ) = path.parent() {
            fs::create_dir_all( parent )?;
        }
        fs::write( path, serde_json::to_string_pretty( self )? )?;
        Ok(())
    }


    /// Location of `track` on disk.
    pub fn file_path( &self, track: &Track ) -> PathBuf {
        self.root.join( &track.path )
    }
}


fn scan_recursive( dir: &Path, files: &mut Vec<PathBuf> ) -> Result<(), LibraryError> {
    let entries = match fs::read_dir( dir ) {
        Ok( e ) => e,
        Err( e ) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            tracing::warn!( "Access denied: {:?}", dir );
            return Ok(());
        }
        Err( e ) => return Err( LibraryError::Io( e ) ),
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_recursive( &path, files )?;
        } else if is_media_file( &path ) {
            files.push( path );
        }
    }
    Ok(())
}


fn is_media_file( path: &Path ) -> bool {
    path.extension()
        .and_then( |e| e.to_str() )
        .map( |e| SUPPORTED_EXTENSIONS.contains( &e.to_lowercase().as_str() ) )
        .unwrap_or( false )
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_scan_collects_media_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir( dir.path().join( "album" ) ).unwrap();
        fs::write( dir.path().join( "b.MP3" ), b"not really audio" ).unwrap();
        fs::write( dir.path().join( "album" ).join( "x.flac" ), b"12345" ).unwrap();
        fs::write( dir.path().join( "notes.txt" ), b"skip me" ).unwrap();

        let listing = Listing::scan( dir.path() ).unwrap();

        let paths: Vec<_> = listing.tracks.iter().map( |t| t.path.as_str() ).collect();
        assert_eq!( paths, vec![ "album/x.flac", "b.MP3" ] );
        assert_eq!( listing.tracks[ 0 ].title, "x.flac" );
        assert_eq!( listing.tracks[ 0 ].size, 5 );
        assert!( listing.metadata.is_empty() );
        assert_eq!( listing.file_path( &listing.tracks[ 0 ] ), dir.path().join( "album/x.flac" ) );
    }


    #[test]
    fn test_scan_missing_dir() {
        let result = Listing::scan( Path::new( "/nonexistent/omp-music" ) );
        assert!( matches!( result, Err( LibraryError::NotFound( _ ) ) ) );
    }


    #[test]
    fn test_load_json_listing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "listing.json" );
        fs::write( &path, r#"{
            "tracks": [ { "path": "a", "title": "A", "size": 10 } ],
            "metadata": [ {
                "path": "a", "title": "Song A", "artist": "Artist",
                "cover": { "data": [ 137, 80, 78, 71 ] }
            } ]
        }"# ).unwrap();

        let listing = Listing::open( &path ).unwrap();

        assert_eq!( listing.tracks, vec![ Track::new( "a", "A", 10 ) ] );
        let cover = listing.metadata.entries()[ 0 ].cover.clone().unwrap();
        assert_eq!( cover.media_type, "image/png" );
        assert_eq!( cover.data, vec![ 137, 80, 78, 71 ] );
        assert_eq!( listing.root, dir.path() );
    }


    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "out" ).join( "listing.json" );
        let listing = Listing {
            tracks: vec![ Track::new( "a", "A", 1 ), Track::new( "b", "B", 2 ) ],
            ..Listing::default()
        };

        listing.save( &path ).unwrap();
        let loaded = Listing::load( &path ).unwrap();
        assert_eq!( loaded.tracks, listing.tracks );
    }


    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "bad.json" );
        fs::write( &path, "{ nope" ).unwrap();
        assert!( matches!( Listing::load( &path ), Err( LibraryError::Json( _ ) ) ) );
    }
}
