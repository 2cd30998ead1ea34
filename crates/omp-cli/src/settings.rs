//! Application settings management
//!
//! Persistent settings for the media session, covers and history.

use std::fs;
use std::path::{ Path, PathBuf };

use serde::{ Deserialize, Serialize };

use omp_core::DEFAULT_COVER;


/// Application settings.
#[derive( Debug, Clone, PartialEq, Serialize, Deserialize )]
#[serde( default )]
pub struct Settings {
    /// Publish now-playing metadata to the system media controls
    pub media_session_enabled: bool,

    /// Cover shown when a track has no embedded art
    pub fallback_cover: String,

    /// Directory for extracted cover files; the user cache directory if unset
    pub cover_dir: Option<PathBuf>,

    /// Record started tracks in the history view
    pub history_enabled: bool,

    /// Maximum number of history entries kept
    pub history_limit: usize,
}


impl Default for Settings {
    fn default() -> Self {
        Self {
            media_session_enabled: true,
            fallback_cover: DEFAULT_COVER.to_string(),
            cover_dir: None,
            history_enabled: true,
            history_limit: 200,
        }
    }
}


impl Settings {
    /// Returns the path to the settings file.
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "omp" ).join( "settings.json" ) )
    }


    /// Loads settings from disk.
    ///
    /// On first run the defaults are written out so they can be edited.
    pub fn load() -> Self {
        let Some( path ) = Self::settings_path() else {
            return Self::default();
        };

        if path.exists() {
            Self::load_from( &path )
        } else {
            let settings = Self::default();
            settings.save_to( &path );
            settings
        }
    }


    /// Loads settings from `path`, falling back to defaults.
    pub fn load_from( path: &Path ) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string( path ) {
            Ok( contents ) => serde_json::from_str( &contents ).unwrap_or_else( |e| {
                tracing::warn!( "Invalid settings file {:?}: {}", path, e );
                Self::default()
            }),
            Err( e ) => {
                tracing::warn!( "Failed to read settings: {}", e );
                Self::default()
            }
        }
    }


    /// Saves settings to `path`, logging failures.
    pub fn save_to( &self, path: &Path ) {
        if let Some( parent ) = path.parent() {
            if let Err( e ) = fs::create_dir_all( parent ) {
                tracing::warn!( "Failed to create settings directory: {}", e );
                return;
            }
        }

        match serde_json::to_string_pretty( self ) {
            Ok( json ) => {
                if let Err( e ) = fs::write( path, json ) {
                    tracing::warn!( "Failed to save settings: {}", e );
                }
            }
            Err( e ) => {
                tracing::warn!( "Failed to serialize settings: {}", e );
            }
        }
    }


    /// Effective history size: zero when history is disabled.
    pub fn history_capacity( &self ) -> usize {
        if self.history_enabled { self.history_limit } else { 0 }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!( Settings::load_from( &dir.path().join( "none.json" ) ), Settings::default() );
    }


    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "settings.json" );
        fs::write( &path, r#"{ "history_enabled": false }"# ).unwrap();

        let settings = Settings::load_from( &path );
        assert!( !settings.history_enabled );
        assert!( settings.media_session_enabled );
        assert_eq!( settings.fallback_cover, "./cd.png" );
        assert_eq!( settings.history_capacity(), 0 );
    }


    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "nested" ).join( "settings.json" );
        let settings = Settings {
            media_session_enabled: false,
            cover_dir: Some( PathBuf::from( "/tmp/omp-covers" ) ),
            ..Settings::default()
        };

        settings.save_to( &path );
        assert_eq!( Settings::load_from( &path ), settings );
    }


    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "settings.json" );
        fs::write( &path, "not json" ).unwrap();
        assert_eq!( Settings::load_from( &path ), Settings::default() );
    }
}
