//! Play history
//!
//! The engine reports every track that starts playing to a [`HistorySink`].
//! Reporting is fire-and-forget; persistence is left to the host.

use crate::track::Track;


/// Receives tracks as they start playing.
pub trait HistorySink {
    fn record( &mut self, track: &Track );
}


/// In-memory history, most recent first, one entry per path.
#[derive( Debug, Default, Clone )]
pub struct HistoryLog {
    entries: Vec<Track>,
    limit: Option<usize>,
}


impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }


    /// Creates a log keeping at most `limit` entries.
    pub fn with_limit( limit: usize ) -> Self {
        Self {
            entries: Vec::new(),
            limit: Some( limit ),
        }
    }


    /// Removes the entry for `path`. Returns true if one was removed.
    pub fn remove( &mut self, path: &str ) -> bool {
        let before = self.entries.len();
        self.entries.retain( |t| t.path != path );
        before != self.entries.len()
    }


    pub fn clear( &mut self ) {
        self.entries.clear();
    }


    pub fn entries( &self ) -> &[Track] {
        &self.entries
    }


    pub fn len( &self ) -> usize {
        self.entries.len()
    }


    pub fn is_empty( &self ) -> bool {
        self.entries.is_empty()
    }
}


impl HistorySink for HistoryLog {
    fn record( &mut self, track: &Track ) {
        self.entries.retain( |t| t.path != track.path );
        self.entries.insert( 0, track.clone() );
        if let Some( limit ) = self.limit {
            self.entries.truncate( limit );
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_record_most_recent_first() {
        let mut log = HistoryLog::new();
        log.record( &Track::new( "a", "A", 1 ) );
        log.record( &Track::new( "b", "B", 2 ) );

        let paths: Vec<_> = log.entries().iter().map( |t| t.path.as_str() ).collect();
        assert_eq!( paths, vec![ "b", "a" ] );
    }


    #[test]
    fn test_rerecord_moves_to_front() {
        let mut log = HistoryLog::new();
        log.record( &Track::new( "a", "A", 1 ) );
        log.record( &Track::new( "b", "B", 2 ) );
        log.record( &Track::new( "a", "A", 1 ) );

        assert_eq!( log.len(), 2 );
        assert_eq!( log.entries()[ 0 ].path, "a" );
    }


    #[test]
    fn test_limit() {
        let mut log = HistoryLog::with_limit( 2 );
        for p in [ "a", "b", "c" ] {
            log.record( &Track::new( p, p, 0 ) );
        }
        assert_eq!( log.len(), 2 );
        assert_eq!( log.entries()[ 1 ].path, "b" );
    }


    #[test]
    fn test_remove() {
        let mut log = HistoryLog::new();
        log.record( &Track::new( "a", "A", 1 ) );
        assert!( log.remove( "a" ) );
        assert!( !log.remove( "a" ) );
        assert!( log.is_empty() );
    }
}
