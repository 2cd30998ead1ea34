//! Display metadata resolution
//!
//! Matches a track against the metadata library by exact path and produces
//! the best available [`DisplayMetadata`].

use serde::{ Deserialize, Serialize };

use crate::track::{ DisplayMetadata, MetadataEntry, Track };


/// Collection of metadata entries supplied by the library source.
///
/// Usually holds zero or one entry per path, but duplicates are tolerated.
#[derive( Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize )]
#[serde( transparent )]
pub struct MetadataLibrary {
    entries: Vec<MetadataEntry>,
}


impl MetadataLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }


    /// Appends an entry. Existing entries with the same path are kept.
    pub fn push( &mut self, entry: MetadataEntry ) {
        self.entries.push( entry );
    }


    /// Returns every entry whose path equals `path`.
    pub fn matches<'a>( &'a self, path: &'a str ) -> impl Iterator<Item = &'a MetadataEntry> + 'a {
        self.entries.iter().filter( move |e| e.path == path )
    }


    pub fn entries( &self ) -> &[MetadataEntry] {
        &self.entries
    }


    pub fn len( &self ) -> usize {
        self.entries.len()
    }


    pub fn is_empty( &self ) -> bool {
        self.entries.is_empty()
    }
}


impl From<Vec<MetadataEntry>> for MetadataLibrary {
    fn from( entries: Vec<MetadataEntry> ) -> Self {
        Self { entries }
    }
}


impl FromIterator<MetadataEntry> for MetadataLibrary {
    fn from_iter<I: IntoIterator<Item = MetadataEntry>>( iter: I ) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}


/// Resolves the display metadata for `track`.
///
/// Exactly one entry with the same path yields that entry merged with the
/// track's size. Zero or several matches yield the fallback record: the
/// track title, an empty artist and no album or cover.
pub fn resolve( track: &Track, library: &MetadataLibrary ) -> DisplayMetadata {
    let mut matches = library.matches( &track.path );

    match ( matches.next(), matches.next() ) {
        ( Some( entry ), None ) => DisplayMetadata::from_entry( entry, track.size ),
        ( None, _ ) => DisplayMetadata::fallback( track ),
        ( Some( _ ), Some( _ ) ) => {
            tracing::debug!( "Ambiguous metadata for {}, using fallback", track.path );
            DisplayMetadata::fallback( track )
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::track::Picture;


    fn entry( path: &str, title: &str ) -> MetadataEntry {
        MetadataEntry {
            path: path.to_string(),
            title: title.to_string(),
            artist: "Artist".to_string(),
            album: Some( "Album".to_string() ),
            cover: None,
        }
    }


    #[test]
    fn test_single_match_merges_size() {
        let track = Track::new( "a", "A", 10 );
        let library = MetadataLibrary::from( vec![ entry( "a", "Song A" ), entry( "b", "Song B" ) ] );

        let display = resolve( &track, &library );

        assert_eq!( display.title, "Song A" );
        assert_eq!( display.artist, "Artist" );
        assert_eq!( display.album.as_deref(), Some( "Album" ) );
        assert_eq!( display.size, Some( 10 ) );
        assert_eq!( display.path, "a" );
    }


    #[test]
    fn test_single_match_keeps_cover() {
        let mut with_cover = entry( "a", "Song A" );
        with_cover.cover = Some( Picture::new( "image/jpeg", vec![ 1, 2, 3 ] ) );
        let library = MetadataLibrary::from( vec![ with_cover ] );

        let display = resolve( &Track::new( "a", "A", 1 ), &library );
        assert_eq!( display.cover.map( |c| c.data ), Some( vec![ 1, 2, 3 ] ) );
    }


    #[test]
    fn test_missing_entry_falls_back() {
        let track = Track::new( "b", "B", 20 );
        let library = MetadataLibrary::from( vec![ entry( "a", "Song A" ) ] );

        assert_eq!( resolve( &track, &library ), DisplayMetadata::fallback( &track ) );
        assert_eq!( resolve( &track, &library ).artist, "" );
    }


    #[test]
    fn test_duplicate_entries_fall_back() {
        let track = Track::new( "a", "A", 10 );
        let library = MetadataLibrary::from( vec![ entry( "a", "One" ), entry( "a", "Two" ) ] );

        let display = resolve( &track, &library );
        assert_eq!( display.title, "A" );
        assert_eq!( display.album, None );
        assert_eq!( display.cover, None );
        assert_eq!( display.size, None );
    }


    #[test]
    fn test_match_is_exact() {
        let track = Track::new( "music/a.mp3", "a.mp3", 5 );
        let library = MetadataLibrary::from( vec![ entry( "music/A.mp3", "Upper" ), entry( "music/a.mp3 ", "Space" ) ] );

        assert_eq!( resolve( &track, &library ).title, "a.mp3" );
    }
}
