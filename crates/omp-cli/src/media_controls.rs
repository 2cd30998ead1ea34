//! System media controls integration
//!
//! Implements the engine's media session on top of the OS:
//! - Windows: System Media Transport Controls (SMTC) via souvlaki
//! - Elsewhere: a session that only logs what it is given

use std::collections::HashMap;

use omp_core::session::{ ActionHandler, MediaAction, MediaSession, NowPlaying };


/// Session used when no OS integration is available.
///
/// Keeps the latest snapshot and the registered handlers so the engine's
/// registration contract holds, and logs metadata changes.
#[derive( Default )]
pub struct LogSession {
    last: Option<NowPlaying>,
    handlers: HashMap<MediaAction, ActionHandler>,
}


impl LogSession {
    pub fn new() -> Self {
        Self::default()
    }
}


impl MediaSession for LogSession {
    fn set_metadata( &mut self, metadata: &NowPlaying ) {
        let track_changed = self.last.as_ref().map_or( true, |l| l.title != metadata.title || l.artist != metadata.artist );
        if track_changed {
            tracing::info!(
                "Now playing: title={:?}, artist={:?}, album={:?}, artwork={:?}",
                metadata.title,
                metadata.artist,
                metadata.album,
                metadata.artwork.first().map( |a| a.src.as_str() )
            );
        }
        self.last = Some( metadata.clone() );
    }


    fn set_action_handler( &mut self, action: MediaAction, handler: Option<ActionHandler> ) {
        match handler {
            Some( handler ) => {
                self.handlers.insert( action, handler );
            }
            None => {
                self.handlers.remove( &action );
            }
        }
    }
}


#[cfg( target_os = "windows" )]
mod platform {
    use std::collections::HashMap;
    use std::ffi::c_void;
    use std::sync::atomic::{ AtomicBool, Ordering };
    use std::sync::{ Arc, Mutex };

    use souvlaki::{ MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, PlatformConfig };
    use windows::core::{ HSTRING, PCWSTR };
    use windows::Win32::Foundation::{ GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM };
    use windows::Win32::UI::Shell::SetCurrentProcessExplicitAppUserModelID;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, RegisterClassW,
        CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, WINDOW_EX_STYLE, WNDCLASSW, WS_OVERLAPPEDWINDOW,
    };

    use omp_core::session::{ ActionHandler, MediaAction, MediaSession, NowPlaying };

    const ERROR_CLASS_ALREADY_EXISTS: u32 = 1410;


    unsafe extern "system" fn wnd_proc( hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM ) -> LRESULT {
        DefWindowProcW( hwnd, msg, wparam, lparam )
    }


    type Handlers = Arc<Mutex<HashMap<MediaAction, ActionHandler>>>;


    /// SMTC-backed session.
    pub struct SmtcSession {
        controls: MediaControls,
        handlers: Handlers,
        playing: Arc<AtomicBool>,
        #[allow( dead_code )]
        hwnd: HWND, // Keep the window alive
    }


    impl SmtcSession {
        /// Connects to SMTC. Returns None if it is unavailable.
        pub fn new() -> Option<Self> {
            let hwnd = create_hidden_window()?;

            let config = PlatformConfig {
                dbus_name: "omp",
                display_name: "OMP",
                hwnd: Some( hwnd.0 as *mut c_void ),
            };

            let mut controls = match MediaControls::new( config ) {
                Ok( c ) => c,
                Err( e ) => {
                    tracing::warn!( "Failed to create media controls: {:?}", e );
                    return None;
                }
            };

            let handlers: Handlers = Arc::default();
            let playing = Arc::new( AtomicBool::new( false ) );

            let event_handlers = Arc::clone( &handlers );
            let event_playing = Arc::clone( &playing );
            let attached = controls.attach( move |event: MediaControlEvent| {
                let action = match event {
                    MediaControlEvent::Play => MediaAction::Play,
                    MediaControlEvent::Pause => MediaAction::Pause,
                    MediaControlEvent::Toggle if event_playing.load( Ordering::Relaxed ) => MediaAction::Pause,
                    MediaControlEvent::Toggle => MediaAction::Play,
                    MediaControlEvent::Next => MediaAction::NextTrack,
                    MediaControlEvent::Previous => MediaAction::PreviousTrack,
                    _ => return,
                };
                if let Ok( handlers ) = event_handlers.lock() {
                    if let Some( handler ) = handlers.get( &action ) {
                        handler();
                    }
                }
            });
            if let Err( e ) = attached {
                tracing::warn!( "Failed to attach media control handler: {:?}", e );
                return None;
            }

            tracing::info!( "SMTC initialized" );
            Some( Self { controls, handlers, playing, hwnd })
        }
    }


    impl MediaSession for SmtcSession {
        fn set_metadata( &mut self, metadata: &NowPlaying ) {
            // SMTC can only load artwork from files
            let cover_url = metadata.artwork
                .first()
                .map( |a| a.src.as_str() )
                .filter( |src| src.starts_with( "file://" ) );

            let result = self.controls.set_metadata( MediaMetadata {
                title: metadata.title.as_deref(),
                artist: metadata.artist.as_deref(),
                album: metadata.album.as_deref(),
                cover_url,
                duration: None,
            });
            if let Err( e ) = result {
                tracing::warn!( "SMTC metadata error: {:?}", e );
            }

            self.playing.store( metadata.playing, Ordering::Relaxed );
            let playback = if metadata.playing {
                MediaPlayback::Playing { progress: None }
            } else {
                MediaPlayback::Paused { progress: None }
            };
            if let Err( e ) = self.controls.set_playback( playback ) {
                tracing::debug!( "Failed to set playback state: {:?}", e );
            }
        }


        fn set_action_handler( &mut self, action: MediaAction, handler: Option<ActionHandler> ) {
            let Ok( mut handlers ) = self.handlers.lock() else {
                return;
            };
            match handler {
                Some( handler ) => {
                    handlers.insert( action, handler );
                }
                None => {
                    handlers.remove( &action );
                }
            }
        }
    }


    /// Creates the hidden window SMTC binds to; console windows cannot host it.
    fn create_hidden_window() -> Option<HWND> {
        unsafe {
            let _ = SetCurrentProcessExplicitAppUserModelID( &HSTRING::from( "OMP.CloudPlayer" ) );

            let class_name: Vec<u16> = "OmpSMTC\0".encode_utf16().collect();
            let wc = WNDCLASSW {
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some( wnd_proc ),
                hInstance: HINSTANCE::default(),
                lpszClassName: PCWSTR( class_name.as_ptr() ),
                ..Default::default()
            };

            if RegisterClassW( &wc ) == 0 {
                let error = GetLastError();
                if error.0 != ERROR_CLASS_ALREADY_EXISTS {
                    tracing::warn!( "Failed to register SMTC window class: {:?}", error );
                    return None;
                }
            }

            let window_name: Vec<u16> = "OMP\0".encode_utf16().collect();
            let hwnd = CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                PCWSTR( class_name.as_ptr() ),
                PCWSTR( window_name.as_ptr() ),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                HWND::default(),
                None,
                None,
                None,
            );

            match hwnd {
                Ok( hwnd ) if !hwnd.0.is_null() => Some( hwnd ),
                Ok( _ ) => {
                    tracing::warn!( "SMTC hidden window handle is null" );
                    None
                }
                Err( e ) => {
                    tracing::warn!( "Failed to create SMTC hidden window: {:?}", e );
                    None
                }
            }
        }
    }
}


/// Creates the media session for this platform.
///
/// Falls back to [`LogSession`] when disabled or when the OS integration
/// cannot be set up.
pub fn create_session( enabled: bool ) -> Box<dyn MediaSession> {
    if !enabled {
        tracing::info!( "System media controls disabled" );
        return Box::new( LogSession::new() );
    }

    #[cfg( target_os = "windows" )]
    {
        if let Some( session ) = platform::SmtcSession::new() {
            return Box::new( session );
        }
    }

    Box::new( LogSession::new() )
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_log_session_tracks_handlers() {
        let mut session = LogSession::new();
        for action in MediaAction::ALL {
            session.set_action_handler( action, Some( Box::new( || {} ) ) );
        }
        session.set_action_handler( MediaAction::Play, Some( Box::new( || {} ) ) );
        assert_eq!( session.handlers.len(), 4 );

        for action in MediaAction::ALL {
            session.set_action_handler( action, None );
        }
        assert!( session.handlers.is_empty() );
    }


    #[test]
    fn test_log_session_keeps_last_snapshot() {
        let mut session = LogSession::new();
        let snapshot = NowPlaying {
            title: Some( "Song A".to_string() ),
            ..NowPlaying::default()
        };
        session.set_metadata( &snapshot );
        assert_eq!( session.last, Some( snapshot ) );
    }
}
