//! Underlying media element
//!
//! The element is the single authority on actual playback progress. Only
//! the playback controller commands it.

use std::fmt;
use std::time::Instant;

use crate::track::Track;


/// Contract of the element that actually renders audio or video.
///
/// Times are in seconds. `duration` is NaN while nothing decodable is loaded.
pub trait MediaElement {
    /// Points the element at a new source. Playback stays paused.
    fn load( &mut self, track: &Track );

    /// Drops the current source.
    fn unload( &mut self );

    fn duration( &self ) -> f64;

    fn current_time( &self ) -> f64;

    fn set_current_time( &mut self, time: f64 );

    fn paused( &self ) -> bool;

    fn play( &mut self );

    fn pause( &mut self );

    /// True once playback ran past the end of the source.
    fn ended( &self ) -> bool {
        false
    }
}


/// Looks up the duration of a track, in seconds.
pub type DurationProbe = Box<dyn FnMut( &Track ) -> Option<f64>>;


/// Element that advances with the wall clock instead of rendering audio.
///
/// Headless hosts use it to drive the controller. The duration of each source
/// comes from a probe; sources the probe cannot measure stay not-ready.
pub struct ClockElement {
    source: Option<Track>,
    duration: f64,
    position: f64,
    started_at: Option<Instant>,
    probe: DurationProbe,
}


impl ClockElement {
    /// Creates an element that measures sources with `probe`.
    pub fn new( probe: impl FnMut( &Track ) -> Option<f64> + 'static ) -> Self {
        Self {
            source: None,
            duration: f64::NAN,
            position: 0.0,
            started_at: None,
            probe: Box::new( probe ),
        }
    }


    /// The loaded source, if any.
    pub fn source( &self ) -> Option<&Track> {
        self.source.as_ref()
    }


    fn elapsed( &self ) -> f64 {
        self.started_at.map( |t| t.elapsed().as_secs_f64() ).unwrap_or( 0.0 )
    }
}


impl fmt::Debug for ClockElement {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.debug_struct( "ClockElement" )
            .field( "source", &self.source )
            .field( "duration", &self.duration )
            .field( "position", &self.position )
            .field( "playing", &self.started_at.is_some() )
            .finish()
    }
}


impl MediaElement for ClockElement {
    fn load( &mut self, track: &Track ) {
        self.duration = ( self.probe )( track )
            .filter( |d| d.is_finite() && *d >= 0.0 )
            .unwrap_or( f64::NAN );
        self.source = Some( track.clone() );
        self.position = 0.0;
        self.started_at = None;

        if self.duration.is_nan() {
            tracing::debug!( "No duration for {}, element not ready", track.path );
        }
    }


    fn unload( &mut self ) {
        self.source = None;
        self.duration = f64::NAN;
        self.position = 0.0;
        self.started_at = None;
    }


    fn duration( &self ) -> f64 {
        self.duration
    }


    fn current_time( &self ) -> f64 {
        if self.duration.is_nan() {
            return 0.0;
        }
        ( self.position + self.elapsed() ).min( self.duration )
    }


    fn set_current_time( &mut self, time: f64 ) {
        if self.duration.is_nan() || time.is_nan() {
            return;
        }
        self.position = time.clamp( 0.0, self.duration );
        if self.started_at.is_some() {
            self.started_at = Some( Instant::now() );
        }
    }


    fn paused( &self ) -> bool {
        self.started_at.is_none()
    }


    fn play( &mut self ) {
        if self.duration.is_nan() || self.started_at.is_some() {
            return;
        }
        // Playing a finished source starts it over
        if self.position >= self.duration {
            self.position = 0.0;
        }
        self.started_at = Some( Instant::now() );
    }


    fn pause( &mut self ) {
        if self.started_at.is_some() {
            self.position = self.current_time();
            self.started_at = None;
        }
    }


    fn ended( &self ) -> bool {
        !self.duration.is_nan()
            && self.started_at.is_some()
            && self.position + self.elapsed() >= self.duration
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn element() -> ClockElement {
        ClockElement::new( |track: &Track| if track.path == "broken" { None } else { Some( 180.0 ) } )
    }


    #[test]
    fn test_unloaded_element_is_not_ready() {
        let el = element();
        assert!( el.duration().is_nan() );
        assert!( el.paused() );
        assert_eq!( el.current_time(), 0.0 );
    }


    #[test]
    fn test_load_probes_duration() {
        let mut el = element();
        el.load( &Track::new( "a", "A", 1 ) );
        assert_eq!( el.duration(), 180.0 );
        assert!( el.paused() );

        el.load( &Track::new( "broken", "B", 1 ) );
        assert!( el.duration().is_nan() );
    }


    #[test]
    fn test_play_requires_ready_source() {
        let mut el = element();
        el.load( &Track::new( "broken", "B", 1 ) );
        el.play();
        assert!( el.paused() );
    }


    #[test]
    fn test_seek_and_pause_keep_position() {
        let mut el = element();
        el.load( &Track::new( "a", "A", 1 ) );
        el.set_current_time( 60.0 );
        el.play();
        assert!( !el.paused() );
        el.pause();

        let t = el.current_time();
        assert!( ( 60.0..61.0 ).contains( &t ) );
        assert!( el.paused() );
    }


    #[test]
    fn test_seek_past_end_clamps_and_ends() {
        let mut el = element();
        el.load( &Track::new( "a", "A", 1 ) );
        el.play();
        el.set_current_time( 500.0 );
        assert_eq!( el.current_time(), 180.0 );
        assert!( el.ended() );
    }


    #[test]
    fn test_unload_resets() {
        let mut el = element();
        el.load( &Track::new( "a", "A", 1 ) );
        el.play();
        el.unload();
        assert!( el.source().is_none() );
        assert!( el.paused() );
        assert!( el.duration().is_nan() );
    }
}
