//! Playback controller
//!
//! Owns the queue, the media element and the observable player state, and
//! mediates every transport action so the element and the state never
//! diverge.

use crate::element::MediaElement;
use crate::queue::Queue;
use crate::track::Track;


/// Observable transport state. Times are in seconds.
#[derive( Debug, Clone, Copy, PartialEq )]
pub struct PlayerState {
    pub playing: bool,
    pub current_time: f64,
    pub duration: f64,
}


impl Default for PlayerState {
    fn default() -> Self {
        Self {
            playing: false,
            current_time: 0.0,
            duration: 0.0,
        }
    }
}


impl PlayerState {
    /// Played fraction of the track in `[0, 1]`, 0 while the duration is unknown.
    pub fn progress( &self ) -> f64 {
        if self.duration > 0.0 {
            ( self.current_time / self.duration ).clamp( 0.0, 1.0 )
        } else {
            0.0
        }
    }
}


/// Coarse controller state.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum TransportState {
    /// No queue, or an empty one.
    Idle,
    Paused,
    Playing,
}


/// What a controller call changed.
///
/// Dependent state (display metadata, cover, media session) is derived from
/// this after the call has fully completed.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum Transition {
    /// The call was a no-op.
    Unchanged,
    /// Only the time position or duration moved.
    Progress,
    /// Play/pause state was commanded.
    Transport,
    /// A different track is loaded.
    TrackChanged,
    /// The queue became empty.
    Idle,
}


/// The playback state machine.
#[derive( Debug )]
pub struct PlaybackController<E: MediaElement> {
    element: E,
    queue: Queue,
    state: PlayerState,
}


impl<E: MediaElement> PlaybackController<E> {
    /// Creates an idle controller around `element`.
    pub fn new( element: E ) -> Self {
        Self {
            element,
            queue: Queue::new(),
            state: PlayerState::default(),
        }
    }


    pub fn state( &self ) -> &PlayerState {
        &self.state
    }


    pub fn queue( &self ) -> &Queue {
        &self.queue
    }


    /// Read-only view of the element. Commands go through the controller.
    pub fn element( &self ) -> &E {
        &self.element
    }


    pub fn current( &self ) -> Option<&Track> {
        self.queue.current()
    }


    pub fn transport( &self ) -> TransportState {
        if self.queue.is_empty() {
            TransportState::Idle
        } else if self.state.playing {
            TransportState::Playing
        } else {
            TransportState::Paused
        }
    }


    /// True when the element is loaded with a known duration.
    pub fn is_ready( &self ) -> bool {
        !self.queue.is_empty() && !self.element.duration().is_nan()
    }


    /// Replaces the queue and loads the track at `start`, paused.
    ///
    /// An empty `tracks` behaves like [`clear_queue`](Self::clear_queue).
    pub fn set_queue( &mut self, tracks: Vec<Track>, start: usize ) -> Transition {
        if tracks.is_empty() {
            return self.clear_queue();
        }

        self.element.pause();
        self.queue.set_queue( tracks, start );
        tracing::info!( "Queue set: {} tracks, starting at {:?}", self.queue.len(), self.queue.index() );
        self.load_current();
        Transition::TrackChanged
    }


    /// Empties the queue and returns to idle.
    pub fn clear_queue( &mut self ) -> Transition {
        if self.queue.is_empty() {
            return Transition::Unchanged;
        }

        self.element.pause();
        self.element.unload();
        self.queue.clear();
        self.state = PlayerState::default();
        tracing::info!( "Queue cleared" );
        Transition::Idle
    }


    /// Toggles between play and pause.
    ///
    /// No-op while the element reports a NaN duration.
    pub fn play_pause( &mut self ) -> Transition {
        if self.element.duration().is_nan() {
            tracing::debug!( "play/pause ignored: element not ready" );
            return Transition::Unchanged;
        }

        if self.element.paused() {
            self.element.play();
            self.state.playing = true;
        } else {
            self.element.pause();
            self.state.playing = false;
        }
        // Playing a finished track restarts it
        self.state.current_time = self.element.current_time();
        Transition::Transport
    }


    /// Moves to the next track, paused. No-op on the last track.
    pub fn next( &mut self ) -> Transition {
        match self.queue.index() {
            Some( i ) if !self.queue.at_end() => self.switch_to( i + 1 ),
            _ => Transition::Unchanged,
        }
    }


    /// Moves to the previous track, paused. No-op on the first track.
    pub fn previous( &mut self ) -> Transition {
        match self.queue.index() {
            Some( i ) if !self.queue.at_start() => self.switch_to( i - 1 ),
            _ => Transition::Unchanged,
        }
    }


    /// Moves to an arbitrary queue position, paused.
    ///
    /// Out-of-range indices and the current index are ignored.
    pub fn select( &mut self, index: usize ) -> Transition {
        if index >= self.queue.len() || self.queue.index() == Some( index ) {
            return Transition::Unchanged;
        }
        self.switch_to( index )
    }


    /// Jumps to `fraction` of the duration and resumes playback.
    ///
    /// `fraction` is clamped to `[0, 1]`. No-op while the duration is invalid.
    /// Seeking to the very end finishes the track, as if the element had
    /// played through it.
    pub fn seek( &mut self, fraction: f64 ) -> Transition {
        let duration = self.element.duration();
        if !duration.is_finite() || fraction.is_nan() {
            tracing::debug!( "seek ignored: duration {}", duration );
            return Transition::Unchanged;
        }

        let position = fraction.clamp( 0.0, 1.0 ) * duration;
        self.element.set_current_time( position );
        self.state.duration = duration;

        if position >= duration {
            self.state.current_time = duration;
            return self.on_ended();
        }

        self.element.play();
        self.state.playing = true;
        self.state.current_time = self.element.current_time();
        Transition::Transport
    }


    /// Records progress reported by the element. Never switches tracks.
    pub fn on_time_update( &mut self, time: f64, duration: f64 ) -> Transition {
        if self.queue.is_empty() {
            return Transition::Unchanged;
        }

        self.state.current_time = if time.is_finite() { time } else { 0.0 };
        self.state.duration = if duration.is_finite() { duration } else { 0.0 };
        Transition::Progress
    }


    /// Handles the element reaching the end of the source.
    ///
    /// Continues with the next track when there is one; otherwise stops on
    /// the last track with the position at its end. Playing it again from
    /// there starts it over.
    pub fn on_ended( &mut self ) -> Transition {
        let Some( index ) = self.queue.index() else {
            return Transition::Unchanged;
        };

        if !self.queue.at_end() {
            let transition = self.switch_to( index + 1 );
            self.element.play();
            self.state.playing = !self.element.paused();
            transition
        } else {
            self.element.pause();
            self.state.playing = false;
            self.state.current_time = self.state.duration;
            tracing::info!( "End of queue reached" );
            Transition::Transport
        }
    }


    /// Pulls progress from the element, the way a time-update callback would.
    pub fn poll( &mut self ) -> Transition {
        if self.queue.is_empty() {
            return Transition::Unchanged;
        }
        if self.element.ended() {
            return self.on_ended();
        }
        let ( time, duration ) = ( self.element.current_time(), self.element.duration() );
        if time == self.state.current_time && ( duration == self.state.duration || duration.is_nan() ) {
            return Transition::Unchanged;
        }
        self.on_time_update( time, duration )
    }


    fn switch_to( &mut self, index: usize ) -> Transition {
        self.element.pause();
        self.queue.update_index( index );
        self.load_current();
        Transition::TrackChanged
    }


    fn load_current( &mut self ) {
        if let Some( track ) = self.queue.current() {
            tracing::info!( "Loading: {}", track.path );
            self.element.load( track );
        }
        self.state = PlayerState::default();
    }
}


#[cfg( test )]
pub( crate ) mod tests {
    use super::*;
    use crate::element::ClockElement;


    /// Scriptable element recording the commands it receives.
    #[derive( Debug )]
    pub struct FakeElement {
        pub duration: f64,
        pub time: f64,
        pub paused: bool,
        pub ended: bool,
        pub loaded: Option<String>,
        pub unready: Vec<String>,
        pub commands: Vec<&'static str>,
    }


    impl Default for FakeElement {
        fn default() -> Self {
            Self {
                duration: f64::NAN,
                time: 0.0,
                paused: true,
                ended: false,
                loaded: None,
                unready: Vec::new(),
                commands: Vec::new(),
            }
        }
    }


    impl MediaElement for FakeElement {
        fn load( &mut self, track: &Track ) {
            self.commands.push( "load" );
            self.loaded = Some( track.path.clone() );
            self.duration = if self.unready.contains( &track.path ) { f64::NAN } else { 200.0 };
            self.time = 0.0;
            self.ended = false;
        }

        fn unload( &mut self ) {
            self.commands.push( "unload" );
            self.loaded = None;
            self.duration = f64::NAN;
        }

        fn duration( &self ) -> f64 {
            self.duration
        }

        fn current_time( &self ) -> f64 {
            self.time
        }

        fn set_current_time( &mut self, time: f64 ) {
            self.time = time;
        }

        fn paused( &self ) -> bool {
            self.paused
        }

        fn play( &mut self ) {
            self.commands.push( "play" );
            if !self.duration.is_nan() {
                self.paused = false;
            }
        }

        fn pause( &mut self ) {
            self.commands.push( "pause" );
            self.paused = true;
        }

        fn ended( &self ) -> bool {
            self.ended
        }
    }


    pub fn tracks() -> Vec<Track> {
        vec![ Track::new( "a", "A", 10 ), Track::new( "b", "B", 20 ) ]
    }


    fn loaded() -> PlaybackController<FakeElement> {
        let mut controller = PlaybackController::new( FakeElement::default() );
        controller.set_queue( tracks(), 0 );
        controller
    }


    #[test]
    fn test_starts_idle() {
        let controller = PlaybackController::new( FakeElement::default() );
        assert_eq!( controller.transport(), TransportState::Idle );
        assert_eq!( *controller.state(), PlayerState::default() );
    }


    #[test]
    fn test_set_queue_loads_paused() {
        let controller = loaded();
        assert_eq!( controller.transport(), TransportState::Paused );
        assert_eq!( controller.element.loaded.as_deref(), Some( "a" ) );
        assert!( controller.element.paused );
    }


    #[test]
    fn test_set_empty_queue_goes_idle() {
        let mut controller = loaded();
        assert_eq!( controller.set_queue( Vec::new(), 0 ), Transition::Idle );
        assert_eq!( controller.transport(), TransportState::Idle );
        assert_eq!( controller.element.loaded, None );
    }


    #[test]
    fn test_play_pause_toggles() {
        let mut controller = loaded();

        assert_eq!( controller.play_pause(), Transition::Transport );
        assert!( controller.state().playing );
        assert!( !controller.element.paused );
        assert_eq!( controller.transport(), TransportState::Playing );

        controller.play_pause();
        assert!( !controller.state().playing );
        assert!( controller.element.paused );
    }


    #[test]
    fn test_play_pause_ignored_while_not_ready() {
        let mut controller = PlaybackController::new( FakeElement {
            unready: vec![ "a".to_string() ],
            ..FakeElement::default()
        });
        controller.set_queue( tracks(), 0 );
        controller.element.commands.clear();

        assert_eq!( controller.play_pause(), Transition::Unchanged );
        assert!( !controller.state().playing );
        assert!( controller.element.commands.is_empty() );
    }


    #[test]
    fn test_play_pause_idle_is_noop() {
        let mut controller = PlaybackController::new( FakeElement::default() );
        assert_eq!( controller.play_pause(), Transition::Unchanged );
    }


    #[test]
    fn test_next_at_end_is_noop() {
        let mut controller = loaded();
        controller.next();
        controller.play_pause();
        controller.on_time_update( 12.0, 200.0 );
        let before = *controller.state();

        assert_eq!( controller.next(), Transition::Unchanged );
        assert_eq!( controller.queue().index(), Some( 1 ) );
        assert_eq!( *controller.state(), before );
        assert!( !controller.element.paused );
    }


    #[test]
    fn test_previous_at_start_is_noop() {
        let mut controller = loaded();
        assert_eq!( controller.previous(), Transition::Unchanged );
        assert_eq!( controller.queue().index(), Some( 0 ) );
    }


    #[test]
    fn test_next_pauses_and_resets_state() {
        let mut controller = loaded();
        controller.play_pause();
        controller.on_time_update( 30.0, 200.0 );
        controller.element.commands.clear();

        assert_eq!( controller.next(), Transition::TrackChanged );
        assert_eq!( controller.queue().index(), Some( 1 ) );
        assert_eq!( *controller.state(), PlayerState::default() );
        assert_eq!( controller.transport(), TransportState::Paused );
        assert_eq!( controller.element.commands, vec![ "pause", "load" ] );
        assert_eq!( controller.element.loaded.as_deref(), Some( "b" ) );
    }


    #[test]
    fn test_previous_moves_back() {
        let mut controller = loaded();
        controller.next();
        assert_eq!( controller.previous(), Transition::TrackChanged );
        assert_eq!( controller.current().map( |t| t.path.as_str() ), Some( "a" ) );
        assert!( controller.element.paused );
    }


    #[test]
    fn test_select() {
        let mut controller = loaded();
        assert_eq!( controller.select( 0 ), Transition::Unchanged );
        assert_eq!( controller.select( 5 ), Transition::Unchanged );
        assert_eq!( controller.select( 1 ), Transition::TrackChanged );
        assert_eq!( controller.queue().index(), Some( 1 ) );
    }


    #[test]
    fn test_seek_sets_position_and_plays() {
        let mut controller = loaded();

        assert_eq!( controller.seek( 0.25 ), Transition::Transport );
        assert_eq!( controller.state().current_time, 50.0 );
        assert_eq!( controller.element.time, 50.0 );
        assert!( controller.state().playing );
        assert!( !controller.element.paused );
    }


    #[test]
    fn test_seek_clamps_fraction() {
        let mut controller = loaded();
        controller.select( 1 );
        controller.seek( 1.5 );
        assert_eq!( controller.state().current_time, 200.0 );
        controller.seek( -1.0 );
        assert_eq!( controller.state().current_time, 0.0 );
        assert!( controller.state().playing );
    }


    fn clock_controller() -> PlaybackController<ClockElement> {
        let mut controller = PlaybackController::new( ClockElement::new( |_: &Track| Some( 180.0 ) ) );
        controller.set_queue( tracks(), 0 );
        controller
    }


    #[test]
    fn test_seek_to_end_advances() {
        let mut controller = clock_controller();

        assert_eq!( controller.seek( 1.0 ), Transition::TrackChanged );
        assert_eq!( controller.queue().index(), Some( 1 ) );
        assert!( controller.state().playing );
        assert!( controller.element().current_time() < 1.0 );
        assert!( controller.state().current_time < 1.0 );
    }


    #[test]
    fn test_seek_to_end_of_last_track_stops() {
        let mut controller = clock_controller();
        controller.select( 1 );
        controller.play_pause();

        assert_eq!( controller.seek( 1.0 ), Transition::Transport );
        assert!( !controller.state().playing );
        assert!( controller.element().paused() );
        assert_eq!( controller.state().current_time, 180.0 );
        assert_eq!( controller.element().current_time(), 180.0 );

        // Nothing restarts behind the state's back
        assert_eq!( controller.poll(), Transition::Unchanged );
        assert_eq!( controller.queue().index(), Some( 1 ) );
    }


    #[test]
    fn test_play_after_end_starts_over() {
        let mut controller = clock_controller();
        controller.select( 1 );
        controller.seek( 1.0 );

        assert_eq!( controller.play_pause(), Transition::Transport );
        assert!( controller.state().playing );
        assert!( controller.state().current_time < 1.0 );
        assert!( controller.element().current_time() < 1.0 );
    }


    #[test]
    fn test_seek_ignored_while_not_ready() {
        let mut controller = PlaybackController::new( FakeElement {
            unready: vec![ "a".to_string() ],
            ..FakeElement::default()
        });
        controller.set_queue( tracks(), 0 );

        assert_eq!( controller.seek( 0.5 ), Transition::Unchanged );
        assert!( !controller.state().playing );
        assert_eq!( controller.state().current_time, 0.0 );
    }


    #[test]
    fn test_time_update_never_switches() {
        let mut controller = loaded();
        assert_eq!( controller.on_time_update( 199.0, 200.0 ), Transition::Progress );
        assert_eq!( controller.state().current_time, 199.0 );
        assert_eq!( controller.state().duration, 200.0 );
        assert_eq!( controller.queue().index(), Some( 0 ) );

        controller.on_time_update( f64::NAN, f64::NAN );
        assert_eq!( controller.state().duration, 0.0 );
    }


    #[test]
    fn test_time_update_ignored_when_idle() {
        let mut controller = PlaybackController::new( FakeElement::default() );
        assert_eq!( controller.on_time_update( 3.0, 10.0 ), Transition::Unchanged );
        assert_eq!( *controller.state(), PlayerState::default() );
    }


    #[test]
    fn test_poll_reads_element() {
        let mut controller = loaded();
        controller.play_pause();
        controller.element.time = 42.0;

        assert_eq!( controller.poll(), Transition::Progress );
        assert_eq!( controller.state().current_time, 42.0 );
        assert_eq!( controller.poll(), Transition::Unchanged );
    }


    #[test]
    fn test_ended_continues_with_next_track() {
        let mut controller = loaded();
        controller.play_pause();
        controller.element.ended = true;

        assert_eq!( controller.poll(), Transition::TrackChanged );
        assert_eq!( controller.queue().index(), Some( 1 ) );
        assert!( controller.state().playing );
        assert!( !controller.element.paused );
    }


    #[test]
    fn test_ended_on_last_track_stops() {
        let mut controller = loaded();
        controller.select( 1 );
        controller.play_pause();
        controller.on_time_update( 200.0, 200.0 );

        assert_eq!( controller.on_ended(), Transition::Transport );
        assert_eq!( controller.queue().index(), Some( 1 ) );
        assert!( !controller.state().playing );
        assert!( controller.element.paused );
    }


    #[test]
    fn test_clear_queue() {
        let mut controller = loaded();
        controller.play_pause();

        assert_eq!( controller.clear_queue(), Transition::Idle );
        assert_eq!( controller.transport(), TransportState::Idle );
        assert_eq!( *controller.state(), PlayerState::default() );
        assert!( controller.element.paused );
        assert_eq!( controller.clear_queue(), Transition::Unchanged );
    }
}
