//! Application playback state
//!
//! The [`Engine`] is the single owner of everything the playback UI reads:
//! the controller (queue, element, player state), the metadata library, the
//! derived display metadata and cover, the media-session binding and the
//! history sink. Hosts hold one engine and call its commands from their event
//! loop.
//!
//! Every command first lets the controller complete its transition, then
//! runs the derivations that depend on it (display metadata, cover, media
//! session, history) in that order.

use std::sync::mpsc::Receiver;

use crate::controller::{ PlaybackController, PlayerState, TransportState, Transition };
use crate::cover::{ CoverResolver, ResourceStore };
use crate::element::MediaElement;
use crate::history::HistorySink;
use crate::metadata::{ self, MetadataLibrary };
use crate::queue::Queue;
use crate::session::{ action_channel, MediaAction, MediaSession, MediaSessionBinding, NowPlaying };
use crate::track::{ DisplayMetadata, Track };


/// The playback engine.
pub struct Engine<E, S, R, H>
where
    E: MediaElement,
    S: MediaSession,
    R: ResourceStore,
    H: HistorySink,
{
    controller: PlaybackController<E>,
    library: MetadataLibrary,
    display: Option<DisplayMetadata>,
    cover: CoverResolver<R>,
    cover_url: String,
    binding: MediaSessionBinding<S>,
    actions: Receiver<MediaAction>,
    last_snapshot: Option<NowPlaying>,
    history: H,
    recorded: bool,
}


impl<E, S, R, H> Engine<E, S, R, H>
where
    E: MediaElement,
    S: MediaSession,
    R: ResourceStore,
    H: HistorySink,
{
    /// Creates an idle engine.
    ///
    /// @param element - The element that renders playback
    /// @param session - Platform media-session integration
    /// @param store - Store for transient cover resources
    /// @param fallback_cover - Cover shown when no embedded art is available
    /// @param history - Receives tracks as they start playing
    pub fn new( element: E, session: S, store: R, fallback_cover: impl Into<String>, history: H ) -> Self {
        let ( tx, rx ) = action_channel();
        let cover = CoverResolver::new( store, fallback_cover );
        let cover_url = cover.fallback().to_string();

        Self {
            controller: PlaybackController::new( element ),
            library: MetadataLibrary::new(),
            display: None,
            cover,
            cover_url,
            binding: MediaSessionBinding::new( session, tx ),
            actions: rx,
            last_snapshot: None,
            history,
            recorded: false,
        }
    }


    // Selectors

    pub fn state( &self ) -> &PlayerState {
        self.controller.state()
    }


    pub fn transport( &self ) -> TransportState {
        self.controller.transport()
    }


    pub fn queue( &self ) -> &Queue {
        self.controller.queue()
    }


    pub fn current( &self ) -> Option<&Track> {
        self.controller.current()
    }


    /// True once the element reports a usable duration.
    pub fn is_ready( &self ) -> bool {
        self.controller.is_ready()
    }


    pub fn display( &self ) -> Option<&DisplayMetadata> {
        self.display.as_ref()
    }


    pub fn cover_url( &self ) -> &str {
        &self.cover_url
    }


    pub fn library( &self ) -> &MetadataLibrary {
        &self.library
    }


    pub fn element( &self ) -> &E {
        self.controller.element()
    }


    pub fn session( &self ) -> &S {
        self.binding.session()
    }


    pub fn cover_store( &self ) -> &R {
        self.cover.store()
    }


    pub fn history( &self ) -> &H {
        &self.history
    }


    pub fn history_mut( &mut self ) -> &mut H {
        &mut self.history
    }


    // Commands

    /// Replaces the queue, starting at `start`.
    pub fn set_queue( &mut self, tracks: Vec<Track>, start: usize ) {
        let transition = self.controller.set_queue( tracks, start );
        self.commit( transition );
    }


    pub fn clear_queue( &mut self ) {
        let transition = self.controller.clear_queue();
        self.commit( transition );
    }


    /// Replaces the metadata library and re-derives the current display.
    pub fn set_library( &mut self, library: MetadataLibrary ) {
        self.library = library;
        if self.controller.current().is_some() {
            self.derive_display();
            self.refresh_session();
        }
    }


    pub fn play_pause( &mut self ) {
        let transition = self.controller.play_pause();
        self.commit( transition );
    }


    pub fn next( &mut self ) {
        let transition = self.controller.next();
        self.commit( transition );
    }


    pub fn previous( &mut self ) {
        let transition = self.controller.previous();
        self.commit( transition );
    }


    pub fn select( &mut self, index: usize ) {
        let transition = self.controller.select( index );
        self.commit( transition );
    }


    /// Seeks to `fraction` of the track and resumes playback.
    pub fn seek( &mut self, fraction: f64 ) {
        let transition = self.controller.seek( fraction );
        self.commit( transition );
    }


    /// Seeks to an absolute position in seconds.
    pub fn seek_to( &mut self, position: f64 ) {
        let duration = self.controller.element().duration();
        if !duration.is_finite() || duration <= 0.0 {
            tracing::debug!( "seek_to ignored: duration {}", duration );
            return;
        }
        self.seek( position / duration );
    }


    /// Ingests a time update pushed by the element.
    pub fn on_time_update( &mut self, time: f64, duration: f64 ) {
        let transition = self.controller.on_time_update( time, duration );
        self.commit( transition );
    }


    /// Ingests an end-of-track notification pushed by the element.
    pub fn on_ended( &mut self ) {
        let transition = self.controller.on_ended();
        self.commit( transition );
    }


    /// One event-loop turn: pull element progress, then run pending
    /// media-session actions.
    pub fn tick( &mut self ) {
        let transition = self.controller.poll();
        self.commit( transition );
        self.handle_actions();
    }


    /// Runs every action requested by the media session since the last call.
    ///
    /// @returns The number of actions processed
    pub fn handle_actions( &mut self ) -> usize {
        let pending: Vec<MediaAction> = self.actions.try_iter().collect();
        for action in &pending {
            self.dispatch( *action );
        }
        pending.len()
    }


    /// Runs a single media-session action.
    pub fn dispatch( &mut self, action: MediaAction ) {
        tracing::debug!( "Media session action: {}", action.name() );
        match action {
            MediaAction::Play => {
                if self.controller.element().paused() {
                    self.play_pause();
                }
            }
            MediaAction::Pause => {
                if !self.controller.element().paused() {
                    self.play_pause();
                }
            }
            MediaAction::NextTrack => self.next(),
            MediaAction::PreviousTrack => self.previous(),
        }
    }


    /// Releases the media-session handlers and the cover resource.
    pub fn shutdown( &mut self ) {
        self.binding.release();
        self.last_snapshot = None;
        self.cover.release();
        self.cover_url = self.cover.fallback().to_string();
    }


    fn commit( &mut self, transition: Transition ) {
        match transition {
            Transition::Unchanged | Transition::Progress => {}
            Transition::Transport => {
                self.note_started();
                self.refresh_session();
            }
            Transition::TrackChanged => {
                self.recorded = false;
                self.derive_display();
                self.note_started();
                self.refresh_session();
            }
            Transition::Idle => {
                self.display = None;
                self.recorded = false;
                self.shutdown();
            }
        }
    }


    fn derive_display( &mut self ) {
        self.display = self.controller.current().map( |t| metadata::resolve( t, &self.library ) );
        self.cover_url = self.cover.resolve( self.display.as_ref() );
    }


    fn refresh_session( &mut self ) {
        let snapshot = NowPlaying::new(
            self.display.as_ref(),
            &self.cover_url,
            self.controller.state().playing,
        );
        if self.last_snapshot.as_ref() == Some( &snapshot ) {
            return;
        }
        self.binding.refresh( &snapshot );
        self.last_snapshot = Some( snapshot );
    }


    fn note_started( &mut self ) {
        if self.recorded || !self.controller.state().playing {
            return;
        }
        if let Some( track ) = self.controller.current() {
            self.history.record( track );
            self.recorded = true;
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::controller::tests::{ tracks, FakeElement };
    use crate::cover::{ MemoryStore, DEFAULT_COVER };
    use crate::history::HistoryLog;
    use crate::session::tests::RecordingSession;
    use crate::track::{ MetadataEntry, Picture };


    type TestEngine = Engine<FakeElement, RecordingSession, MemoryStore, HistoryLog>;


    fn library() -> MetadataLibrary {
        MetadataLibrary::from( vec![ MetadataEntry {
            path: "a".to_string(),
            title: "Song A".to_string(),
            artist: "Artist".to_string(),
            album: Some( "Album".to_string() ),
            cover: None,
        }])
    }


    fn engine() -> ( TestEngine, RecordingSession ) {
        let session = RecordingSession::default();
        let mut engine = Engine::new(
            FakeElement::default(),
            session.clone(),
            MemoryStore::new(),
            DEFAULT_COVER,
            HistoryLog::new(),
        );
        engine.set_library( library() );
        engine.set_queue( tracks(), 0 );
        ( engine, session )
    }


    #[test]
    fn test_initial_track_resolves_metadata() {
        let ( engine, session ) = engine();

        let display = engine.display().unwrap();
        assert_eq!( display.title, "Song A" );
        assert_eq!( display.artist, "Artist" );
        assert_eq!( display.album.as_deref(), Some( "Album" ) );
        assert_eq!( display.size, Some( 10 ) );
        assert_eq!( engine.cover_url(), DEFAULT_COVER );

        let snapshot = session.last().unwrap();
        assert_eq!( snapshot.title.as_deref(), Some( "Song A" ) );
        assert_eq!( snapshot.artwork[ 0 ].src, DEFAULT_COVER );
        assert_eq!( session.live_handlers(), 4 );
    }


    #[test]
    fn test_next_switches_to_fallback_metadata() {
        let ( mut engine, session ) = engine();
        engine.play_pause();
        engine.on_time_update( 30.0, 200.0 );

        engine.next();

        assert_eq!( engine.queue().index(), Some( 1 ) );
        let display = engine.display().unwrap();
        assert_eq!( display.title, "B" );
        assert_eq!( display.artist, "" );
        assert_eq!( display.album, None );
        assert_eq!( *engine.state(), PlayerState::default() );

        // The session sees the new track only after the switch completed
        let snapshot = session.last().unwrap();
        assert_eq!( snapshot.title.as_deref(), Some( "B" ) );
        assert!( !snapshot.playing );
        assert!( engine.element().paused );
    }


    #[test]
    fn test_next_at_end_changes_nothing() {
        let ( mut engine, session ) = engine();
        engine.next();
        let updates = session.updates();
        let state = *engine.state();

        engine.next();

        assert_eq!( engine.queue().index(), Some( 1 ) );
        assert_eq!( *engine.state(), state );
        assert_eq!( session.updates(), updates );
    }


    #[test]
    fn test_playing_change_refreshes_session() {
        let ( mut engine, session ) = engine();
        engine.play_pause();
        assert!( session.last().unwrap().playing );
        engine.play_pause();
        assert!( !session.last().unwrap().playing );
    }


    #[test]
    fn test_seek_plays_and_records_history() {
        let ( mut engine, _session ) = engine();
        engine.seek( 0.5 );

        assert!( engine.state().playing );
        assert_eq!( engine.state().current_time, 100.0 );
        assert_eq!( engine.history().entries()[ 0 ].path, "a" );
    }


    #[test]
    fn test_seek_to_absolute_position() {
        let ( mut engine, _session ) = engine();
        engine.seek_to( 50.0 );
        assert_eq!( engine.state().current_time, 50.0 );
    }


    #[test]
    fn test_history_records_once_per_load() {
        let ( mut engine, _session ) = engine();
        engine.play_pause();
        engine.play_pause();
        engine.play_pause();
        assert_eq!( engine.history().len(), 1 );

        engine.next();
        assert_eq!( engine.history().len(), 1 );
        engine.play_pause();
        assert_eq!( engine.history().entries()[ 0 ].path, "b" );
        assert_eq!( engine.history().len(), 2 );
    }


    #[test]
    fn test_cover_resource_follows_track() {
        let mut lib = library();
        lib.push( MetadataEntry {
            path: "b".to_string(),
            title: "Song B".to_string(),
            artist: "Other".to_string(),
            album: None,
            cover: Some( Picture::new( "image/png", vec![ 1, 2, 3 ] ) ),
        });
        let ( mut engine, session ) = engine();
        engine.set_library( lib );

        engine.next();
        assert!( engine.cover_url().starts_with( "blob:" ) );
        assert_eq!( engine.cover_store().live(), 1 );
        assert_eq!( session.last().unwrap().artwork[ 0 ].src, engine.cover_url() );

        engine.previous();
        assert_eq!( engine.cover_url(), DEFAULT_COVER );
        assert_eq!( engine.cover_store().live(), 0 );
    }


    #[test]
    fn test_session_actions_drive_controller() {
        let ( mut engine, session ) = engine();

        session.trigger( MediaAction::Play );
        engine.handle_actions();
        assert!( engine.state().playing );

        // Play while playing does not toggle
        session.trigger( MediaAction::Play );
        engine.handle_actions();
        assert!( engine.state().playing );

        session.trigger( MediaAction::Pause );
        session.trigger( MediaAction::NextTrack );
        assert_eq!( engine.handle_actions(), 2 );
        assert!( !engine.state().playing );
        assert_eq!( engine.queue().index(), Some( 1 ) );

        session.trigger( MediaAction::PreviousTrack );
        engine.tick();
        assert_eq!( engine.queue().index(), Some( 0 ) );
    }


    #[test]
    fn test_clear_queue_releases_session_and_cover() {
        let ( mut engine, session ) = engine();
        engine.clear_queue();

        assert_eq!( engine.transport(), TransportState::Idle );
        assert!( engine.display().is_none() );
        assert_eq!( session.live_handlers(), 0 );
        assert_eq!( engine.cover_url(), DEFAULT_COVER );

        engine.set_queue( tracks(), 1 );
        assert_eq!( session.live_handlers(), 4 );
        assert_eq!( session.last().unwrap().title.as_deref(), Some( "B" ) );
    }


    #[test]
    fn test_library_change_rederives() {
        let ( mut engine, session ) = engine();
        engine.set_library( MetadataLibrary::new() );

        assert_eq!( engine.display().unwrap().title, "A" );
        assert_eq!( session.last().unwrap().title.as_deref(), Some( "A" ) );
    }


    #[test]
    fn test_drop_releases_handlers() {
        let ( engine, session ) = engine();
        drop( engine );
        assert_eq!( session.live_handlers(), 0 );
    }
}
