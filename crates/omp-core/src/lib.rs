//! OMP Core - Playback engine
//!
//! This crate provides the playback core of the OMP cloud music player:
//! queue and transport state, metadata resolution, cover resources and the
//! bridge to platform media sessions.

pub mod command;
pub mod controller;
pub mod cover;
pub mod element;
pub mod engine;
pub mod history;
pub mod library;
pub mod metadata;
pub mod queue;
pub mod session;
pub mod tags;
pub mod track;

pub use command::{ Command, CommandError, SeekTarget };
pub use controller::{ PlaybackController, PlayerState, TransportState, Transition };
pub use cover::{ CoverResolver, MemoryStore, ResourceStore, TempDirStore, DEFAULT_COVER };
pub use element::{ ClockElement, MediaElement };
pub use engine::Engine;
pub use history::{ HistoryLog, HistorySink };
pub use library::{ LibraryError, Listing };
pub use metadata::MetadataLibrary;
pub use queue::Queue;
pub use session::{ MediaAction, MediaSession, MediaSessionBinding, NowPlaying };
pub use track::{ DisplayMetadata, MetadataEntry, Picture, Track };
