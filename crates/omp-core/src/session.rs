//! Media session bridge
//!
//! Pushes now-playing snapshots to the platform media session (lock screen,
//! OS media keys) and routes its action requests back to the engine.
//!
//! Handlers registered with the platform only send a [`MediaAction`] over a
//! channel; the engine drains that channel on its own event loop, so platform
//! callbacks never touch the controller directly.

use std::sync::mpsc::{ self, Receiver, Sender };

use crate::track::DisplayMetadata;


/// Actions a media session may request.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum MediaAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
}


impl MediaAction {
    /// Every action the binding registers.
    pub const ALL: [MediaAction; 4] = [
        MediaAction::Play,
        MediaAction::Pause,
        MediaAction::NextTrack,
        MediaAction::PreviousTrack,
    ];


    /// Name used by web-style media session APIs.
    pub fn name( &self ) -> &'static str {
        match self {
            MediaAction::Play => "play",
            MediaAction::Pause => "pause",
            MediaAction::NextTrack => "nexttrack",
            MediaAction::PreviousTrack => "previoustrack",
        }
    }
}


/// Callback invoked by the platform when the user triggers an action.
pub type ActionHandler = Box<dyn Fn() + Send + 'static>;


/// One artwork entry of a snapshot.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Artwork {
    pub src: String,
}


/// Metadata pushed to the platform.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct NowPlaying {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Vec<Artwork>,
    pub playing: bool,
}


impl NowPlaying {
    /// Builds a snapshot from the resolved metadata and cover URL.
    pub fn new( display: Option<&DisplayMetadata>, cover: &str, playing: bool ) -> Self {
        Self {
            title: display.map( |d| d.title.clone() ),
            artist: display.map( |d| d.artist.clone() ),
            album: display.and_then( |d| d.album.clone() ),
            artwork: vec![ Artwork { src: cover.to_string() } ],
            playing,
        }
    }
}


/// Platform media-session integration.
///
/// Setting a handler for an action replaces any previous one; `None` clears it.
pub trait MediaSession {
    fn set_metadata( &mut self, metadata: &NowPlaying );

    fn set_action_handler( &mut self, action: MediaAction, handler: Option<ActionHandler> );
}


impl<T: MediaSession + ?Sized> MediaSession for Box<T> {
    fn set_metadata( &mut self, metadata: &NowPlaying ) {
        ( **self ).set_metadata( metadata )
    }


    fn set_action_handler( &mut self, action: MediaAction, handler: Option<ActionHandler> ) {
        ( **self ).set_action_handler( action, handler )
    }
}


/// Creates the channel connecting session handlers to the engine.
pub fn action_channel() -> ( Sender<MediaAction>, Receiver<MediaAction> ) {
    mpsc::channel()
}


/// Scoped registration with a media session.
///
/// `refresh` pushes a snapshot and (re)registers the four action handlers;
/// `release` clears them. Release also runs on drop so handlers never
/// outlive the engine that receives their actions.
pub struct MediaSessionBinding<S: MediaSession> {
    session: S,
    actions: Sender<MediaAction>,
    bound: bool,
}


impl<S: MediaSession> MediaSessionBinding<S> {
    pub fn new( session: S, actions: Sender<MediaAction> ) -> Self {
        Self {
            session,
            actions,
            bound: false,
        }
    }


    /// Pushes `snapshot` and registers the action handlers.
    pub fn refresh( &mut self, snapshot: &NowPlaying ) {
        tracing::debug!(
            "Media session update: title={:?}, artist={:?}, album={:?}, playing={}",
            snapshot.title, snapshot.artist, snapshot.album, snapshot.playing
        );
        self.session.set_metadata( snapshot );

        for action in MediaAction::ALL {
            let tx = self.actions.clone();
            self.session.set_action_handler( action, Some( Box::new( move || {
                let _ = tx.send( action );
            })));
        }
        self.bound = true;
    }


    /// Clears all four handlers. Safe to call repeatedly.
    pub fn release( &mut self ) {
        for action in MediaAction::ALL {
            self.session.set_action_handler( action, None );
        }
        if self.bound {
            tracing::debug!( "Media session handlers released" );
        }
        self.bound = false;
    }


    pub fn is_bound( &self ) -> bool {
        self.bound
    }


    pub fn session( &self ) -> &S {
        &self.session
    }
}


impl<S: MediaSession> Drop for MediaSessionBinding<S> {
    fn drop( &mut self ) {
        self.release();
    }
}


#[cfg( test )]
pub( crate ) mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::{ Arc, Mutex };


    #[derive( Default )]
    pub struct Recorded {
        pub metadata: Vec<NowPlaying>,
        pub handlers: HashMap<MediaAction, ActionHandler>,
    }


    /// Session that records what it is given; clones share the record.
    #[derive( Clone, Default )]
    pub struct RecordingSession {
        pub inner: Arc<Mutex<Recorded>>,
    }


    impl RecordingSession {
        pub fn live_handlers( &self ) -> usize {
            self.inner.lock().unwrap().handlers.len()
        }


        pub fn last( &self ) -> Option<NowPlaying> {
            self.inner.lock().unwrap().metadata.last().cloned()
        }


        pub fn updates( &self ) -> usize {
            self.inner.lock().unwrap().metadata.len()
        }


        pub fn trigger( &self, action: MediaAction ) -> bool {
            let inner = self.inner.lock().unwrap();
            match inner.handlers.get( &action ) {
                Some( handler ) => {
                    handler();
                    true
                }
                None => false,
            }
        }
    }


    impl MediaSession for RecordingSession {
        fn set_metadata( &mut self, metadata: &NowPlaying ) {
            self.inner.lock().unwrap().metadata.push( metadata.clone() );
        }


        fn set_action_handler( &mut self, action: MediaAction, handler: Option<ActionHandler> ) {
            let mut inner = self.inner.lock().unwrap();
            match handler {
                Some( handler ) => { inner.handlers.insert( action, handler ); }
                None => { inner.handlers.remove( &action ); }
            }
        }
    }


    #[test]
    fn test_refresh_registers_four_handlers() {
        let session = RecordingSession::default();
        let ( tx, _rx ) = action_channel();
        let mut binding = MediaSessionBinding::new( session.clone(), tx );

        binding.refresh( &NowPlaying::default() );
        binding.refresh( &NowPlaying::default() );

        assert_eq!( session.live_handlers(), 4 );
        assert_eq!( session.updates(), 2 );
        assert!( binding.is_bound() );
    }


    #[test]
    fn test_handlers_forward_actions() {
        let session = RecordingSession::default();
        let ( tx, rx ) = action_channel();
        let mut binding = MediaSessionBinding::new( session.clone(), tx );
        binding.refresh( &NowPlaying::default() );

        assert!( session.trigger( MediaAction::NextTrack ) );
        assert!( session.trigger( MediaAction::Pause ) );
        assert_eq!( rx.try_iter().collect::<Vec<_>>(), vec![ MediaAction::NextTrack, MediaAction::Pause ] );
    }


    #[test]
    fn test_release_twice_leaves_nothing_registered() {
        let session = RecordingSession::default();
        let ( tx, _rx ) = action_channel();
        let mut binding = MediaSessionBinding::new( session.clone(), tx );
        binding.refresh( &NowPlaying::default() );

        binding.release();
        binding.release();

        assert_eq!( session.live_handlers(), 0 );
        assert!( !binding.is_bound() );
    }


    #[test]
    fn test_drop_releases_handlers() {
        let session = RecordingSession::default();
        let ( tx, _rx ) = action_channel();
        {
            let mut binding = MediaSessionBinding::new( session.clone(), tx );
            binding.refresh( &NowPlaying::default() );
        }
        assert_eq!( session.live_handlers(), 0 );
    }


    #[test]
    fn test_snapshot_from_display() {
        let mut display = DisplayMetadata::fallback( &crate::track::Track::new( "a", "A", 1 ) );
        display.album = Some( "Album".to_string() );

        let snapshot = NowPlaying::new( Some( &display ), "./cd.png", true );
        assert_eq!( snapshot.title.as_deref(), Some( "A" ) );
        assert_eq!( snapshot.artist.as_deref(), Some( "" ) );
        assert_eq!( snapshot.album.as_deref(), Some( "Album" ) );
        assert_eq!( snapshot.artwork, vec![ Artwork { src: "./cd.png".to_string() } ] );
        assert!( snapshot.playing );
    }
}
