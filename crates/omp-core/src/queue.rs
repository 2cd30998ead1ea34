//! Play queue management
//!
//! Ordered track sequence plus the cursor of the current track.

use crate::track::Track;


/// The play queue.
///
/// While non-empty the cursor always satisfies `index < len`. An empty
/// queue has no cursor.
#[derive( Debug, Default, Clone )]
pub struct Queue {
    tracks: Vec<Track>,
    index: Option<usize>,
}


impl Queue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }


    /// Replaces the queue contents and places the cursor at `start`.
    ///
    /// An out-of-range `start` places the cursor on the first track.
    pub fn set_queue( &mut self, tracks: Vec<Track>, start: usize ) {
        self.index = if tracks.is_empty() {
            None
        } else if start < tracks.len() {
            Some( start )
        } else {
            tracing::warn!( "Start index {} outside queue of {}, using 0", start, tracks.len() );
            Some( 0 )
        };
        self.tracks = tracks;
    }


    /// Moves the cursor.
    ///
    /// Returns false and leaves the cursor untouched if `index` is out of range.
    pub fn update_index( &mut self, index: usize ) -> bool {
        if index < self.tracks.len() {
            self.index = Some( index );
            true
        } else {
            false
        }
    }


    /// Clears the queue.
    pub fn clear( &mut self ) {
        self.tracks.clear();
        self.index = None;
    }


    /// Gets the current track.
    pub fn current( &self ) -> Option<&Track> {
        self.index.and_then( |i| self.tracks.get( i ) )
    }


    /// Gets the current index.
    pub fn index( &self ) -> Option<usize> {
        self.index
    }


    /// Returns true when the cursor sits on the last track.
    pub fn at_end( &self ) -> bool {
        self.index.map_or( true, |i| i + 1 == self.tracks.len() )
    }


    /// Returns true when the cursor sits on the first track.
    pub fn at_start( &self ) -> bool {
        self.index.map_or( true, |i| i == 0 )
    }


    pub fn tracks( &self ) -> &[Track] {
        &self.tracks
    }


    pub fn len( &self ) -> usize {
        self.tracks.len()
    }


    pub fn is_empty( &self ) -> bool {
        self.tracks.is_empty()
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn tracks( n: usize ) -> Vec<Track> {
        ( 0..n ).map( |i| Track::new( format!( "t{}", i ), format!( "T{}", i ), i as u64 ) ).collect()
    }


    #[test]
    fn test_empty_queue_has_no_cursor() {
        let queue = Queue::new();
        assert!( queue.current().is_none() );
        assert_eq!( queue.index(), None );
        assert!( queue.at_end() );
        assert!( queue.at_start() );
    }


    #[test]
    fn test_set_queue_positions_cursor() {
        let mut queue = Queue::new();
        queue.set_queue( tracks( 3 ), 2 );
        assert_eq!( queue.index(), Some( 2 ) );
        assert_eq!( queue.current().map( |t| t.path.as_str() ), Some( "t2" ) );
        assert!( queue.at_end() );
    }


    #[test]
    fn test_set_queue_out_of_range_start() {
        let mut queue = Queue::new();
        queue.set_queue( tracks( 2 ), 7 );
        assert_eq!( queue.index(), Some( 0 ) );
    }


    #[test]
    fn test_set_empty_queue() {
        let mut queue = Queue::new();
        queue.set_queue( tracks( 2 ), 1 );
        queue.set_queue( Vec::new(), 0 );
        assert_eq!( queue.index(), None );
        assert!( queue.is_empty() );
    }


    #[test]
    fn test_update_index_rejects_out_of_range() {
        let mut queue = Queue::new();
        queue.set_queue( tracks( 2 ), 0 );
        assert!( !queue.update_index( 2 ) );
        assert_eq!( queue.index(), Some( 0 ) );
        assert!( queue.update_index( 1 ) );
        assert_eq!( queue.index(), Some( 1 ) );
    }


    #[test]
    fn test_clear() {
        let mut queue = Queue::new();
        queue.set_queue( tracks( 2 ), 1 );
        queue.clear();
        assert!( queue.current().is_none() );
        assert_eq!( queue.len(), 0 );
    }
}
