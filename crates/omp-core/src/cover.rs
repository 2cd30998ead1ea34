//! Cover image resources
//!
//! Turns embedded cover bytes into a displayable URL. Each URL handed out is
//! a transient resource; the resolver keeps the most recent one and revokes
//! it as soon as it is superseded so a long session does not accumulate them.

use std::collections::HashMap;
use std::fs;
use std::path::{ Path, PathBuf };

use thiserror::Error;

use crate::track::{ DisplayMetadata, Picture };


/// Cover shown when no track is loaded or the track has no embedded art.
pub const DEFAULT_COVER: &str = "./cd.png";


/// Errors that can occur while creating a cover resource.
#[derive( Debug, Error )]
pub enum CoverError {
    #[error( "IO error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "Cover payload is empty" )]
    Empty,
}


/// Backing store for transient binary-to-URL conversions.
pub trait ResourceStore {
    /// Creates a resource holding `picture` and returns its URL.
    fn create( &mut self, picture: &Picture ) -> Result<String, CoverError>;

    /// Releases a URL returned by [`create`](Self::create). Unknown URLs are ignored.
    fn revoke( &mut self, url: &str );
}


/// Keeps resources in memory under `blob:` style URLs.
#[derive( Debug, Default )]
pub struct MemoryStore {
    next_id: u64,
    resources: HashMap<String, Picture>,
}


impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }


    /// Looks up a live resource.
    pub fn get( &self, url: &str ) -> Option<&Picture> {
        self.resources.get( url )
    }


    /// Number of resources not yet revoked.
    pub fn live( &self ) -> usize {
        self.resources.len()
    }
}


impl ResourceStore for MemoryStore {
    fn create( &mut self, picture: &Picture ) -> Result<String, CoverError> {
        if picture.data.is_empty() {
            return Err( CoverError::Empty );
        }
        self.next_id += 1;
        let url = format!( "blob:omp/{}", self.next_id );
        self.resources.insert( url.clone(), picture.clone() );
        Ok( url )
    }


    fn revoke( &mut self, url: &str ) {
        self.resources.remove( url );
    }
}


/// Writes resources as files in a directory and hands out `file://` URLs.
///
/// Platform media controls can only load artwork from a URL, so this is the
/// store used with a real media session.
#[derive( Debug )]
pub struct TempDirStore {
    dir: PathBuf,
    next_id: u64,
    live: HashMap<String, PathBuf>,
}


impl TempDirStore {
    /// Creates a store writing into `dir`. The directory is created lazily.
    pub fn new( dir: impl Into<PathBuf> ) -> Self {
        Self {
            dir: dir.into(),
            next_id: 0,
            live: HashMap::new(),
        }
    }


    /// The per-user cache directory for covers, or the system temp dir.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else( std::env::temp_dir )
            .join( "omp" )
            .join( "covers" )
    }


    pub fn dir( &self ) -> &Path {
        &self.dir
    }


    /// Number of files not yet revoked.
    pub fn live( &self ) -> usize {
        self.live.len()
    }
}


impl ResourceStore for TempDirStore {
    fn create( &mut self, picture: &Picture ) -> Result<String, CoverError> {
        if picture.data.is_empty() {
            return Err( CoverError::Empty );
        }
        fs::create_dir_all( &self.dir )?;
        // Media controls need an absolute path
        let dir = fs::canonicalize( &self.dir )?;

        self.next_id += 1;
        let name = format!(
            "cover-{}-{}.{}",
            std::process::id(),
            self.next_id,
            extension_for( &picture.media_type )
        );
        let path = dir.join( name );
        fs::write( &path, &picture.data )?;

        let url = path_to_file_url( &path );
        self.live.insert( url.clone(), path );
        Ok( url )
    }


    fn revoke( &mut self, url: &str ) {
        let Some( path ) = self.live.remove( url ) else {
            return;
        };
        if let Err( e ) = fs::remove_file( &path ) {
            tracing::warn!( "Failed to remove cover {:?}: {}", path, e );
        }
    }
}


impl Drop for TempDirStore {
    fn drop( &mut self ) {
        for ( _, path ) in self.live.drain() {
            let _ = fs::remove_file( path );
        }
    }
}


fn extension_for( media_type: &str ) -> &'static str {
    match media_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        _ => "img",
    }
}


/// Converts an absolute file path to a `file://` URL for media-control artwork.
pub fn path_to_file_url( path: &Path ) -> String {
    let path = path.to_string_lossy();

    // canonicalize adds \\?\ on Windows, which souvlaki cannot load
    let path = path.strip_prefix( r"\\?\" ).unwrap_or( &path );
    format!( "file://{}", path )
}


/// Derives the displayable cover for the current track.
///
/// Holds at most one live resource at a time.
#[derive( Debug )]
pub struct CoverResolver<R: ResourceStore> {
    store: R,
    fallback: String,
    current: Option<String>,
}


impl<R: ResourceStore> CoverResolver<R> {
    pub fn new( store: R, fallback: impl Into<String> ) -> Self {
        Self {
            store,
            fallback: fallback.into(),
            current: None,
        }
    }


    /// Returns the cover URL for `display`.
    ///
    /// Without a loaded track or an embedded cover this is the fallback asset.
    /// Otherwise a new resource is created and the previous one released.
    pub fn resolve( &mut self, display: Option<&DisplayMetadata> ) -> String {
        let picture = display
            .and_then( |d| d.cover.as_ref() )
            .filter( |p| !p.data.is_empty() );

        let Some( picture ) = picture else {
            self.release();
            return self.fallback.clone();
        };

        match self.store.create( picture ) {
            Ok( url ) => {
                self.release();
                tracing::debug!( "Cover resource created: {}", url );
                self.current = Some( url.clone() );
                url
            }
            Err( e ) => {
                tracing::warn!( "Failed to create cover resource: {}", e );
                self.release();
                self.fallback.clone()
            }
        }
    }


    /// Releases the live resource, if any.
    pub fn release( &mut self ) {
        if let Some( url ) = self.current.take() {
            self.store.revoke( &url );
        }
    }


    /// The live resource URL, if any.
    pub fn current( &self ) -> Option<&str> {
        self.current.as_deref()
    }


    pub fn fallback( &self ) -> &str {
        &self.fallback
    }


    pub fn store( &self ) -> &R {
        &self.store
    }
}


impl<R: ResourceStore> Drop for CoverResolver<R> {
    fn drop( &mut self ) {
        self.release();
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::track::Track;


    fn with_cover( path: &str, data: Vec<u8> ) -> DisplayMetadata {
        let mut display = DisplayMetadata::fallback( &Track::new( path, path, 1 ) );
        display.cover = Some( Picture::new( "image/png", data ) );
        display
    }


    #[test]
    fn test_no_track_uses_fallback() {
        let mut resolver = CoverResolver::new( MemoryStore::new(), DEFAULT_COVER );
        assert_eq!( resolver.resolve( None ), "./cd.png" );
        assert_eq!( resolver.store().live(), 0 );
    }


    #[test]
    fn test_no_cover_uses_fallback() {
        let mut resolver = CoverResolver::new( MemoryStore::new(), DEFAULT_COVER );
        let display = DisplayMetadata::fallback( &Track::new( "a", "A", 1 ) );
        assert_eq!( resolver.resolve( Some( &display ) ), DEFAULT_COVER );
    }


    #[test]
    fn test_empty_cover_uses_fallback() {
        let mut resolver = CoverResolver::new( MemoryStore::new(), DEFAULT_COVER );
        assert_eq!( resolver.resolve( Some( &with_cover( "a", Vec::new() ) ) ), DEFAULT_COVER );
    }


    #[test]
    fn test_cover_creates_resource() {
        let mut resolver = CoverResolver::new( MemoryStore::new(), DEFAULT_COVER );
        let url = resolver.resolve( Some( &with_cover( "a", vec![ 9, 9 ] ) ) );

        assert!( url.starts_with( "blob:" ) );
        assert_eq!( resolver.current(), Some( url.as_str() ) );
        assert_eq!( resolver.store().get( &url ).map( |p| p.data.clone() ), Some( vec![ 9, 9 ] ) );
    }


    #[test]
    fn test_superseded_resources_are_released() {
        let mut resolver = CoverResolver::new( MemoryStore::new(), DEFAULT_COVER );
        for i in 0..50u8 {
            resolver.resolve( Some( &with_cover( "a", vec![ i + 1 ] ) ) );
        }
        assert_eq!( resolver.store().live(), 1 );

        resolver.resolve( None );
        assert_eq!( resolver.store().live(), 0 );
        assert_eq!( resolver.current(), None );
    }


    #[test]
    fn test_temp_dir_store_writes_and_revokes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TempDirStore::new( dir.path().join( "covers" ) );

        let url = store.create( &Picture::new( "image/jpeg", vec![ 1, 2, 3 ] ) ).unwrap();
        let path = PathBuf::from( url.strip_prefix( "file://" ).unwrap() );
        assert!( path.starts_with( fs::canonicalize( store.dir() ).unwrap() ) );
        assert_eq!( path.extension().and_then( |e| e.to_str() ), Some( "jpg" ) );
        assert_eq!( fs::read( &path ).unwrap(), vec![ 1, 2, 3 ] );

        store.revoke( &url );
        assert!( !path.exists() );
        assert_eq!( store.live(), 0 );

        // Second revoke is harmless
        store.revoke( &url );
    }


    #[test]
    fn test_temp_dir_store_relative_dir_gives_absolute_url() {
        let base = tempfile::Builder::new().prefix( "omp-covers" ).tempdir_in( "." ).unwrap();
        let relative = Path::new( "." ).join( base.path().file_name().unwrap() ).join( "covers" );
        let mut store = TempDirStore::new( &relative );

        let url = store.create( &Picture::new( "image/png", vec![ 4 ] ) ).unwrap();
        let path = PathBuf::from( url.strip_prefix( "file://" ).unwrap() );
        assert!( path.is_absolute() );
        assert!( path.exists() );

        store.revoke( &url );
        assert!( !path.exists() );
    }


    #[test]
    fn test_temp_dir_store_cleans_up_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let mut resolver = CoverResolver::new( TempDirStore::new( dir.path() ), DEFAULT_COVER );
            let url = resolver.resolve( Some( &with_cover( "a", vec![ 7 ] ) ) );
            PathBuf::from( url.strip_prefix( "file://" ).unwrap() )
        };
        assert!( !path.exists() );
    }
}
