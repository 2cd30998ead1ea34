//! OMP CLI - Terminal UI for the OMP player

mod cli;
mod input;
mod media_controls;
mod settings;
mod view;

use std::fs::{ self, File };
use std::io;
use std::path::{ Path, PathBuf };
use std::sync::Mutex;
use std::time::{ Duration, Instant };

use anyhow::{ Context, Result };
use clap::Parser;
use crossterm::{
    event::{ self, Event, KeyCode, KeyEventKind },
    terminal::{ disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen },
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{ Block, Borders, List, ListItem, ListState, Paragraph, Wrap },
};

use cli::Args;
use input::{ InputBuffer, InputMode };
use settings::Settings;
use view::ViewMode;

use omp_core::{
    command::{ self, SeekTarget },
    tags, ClockElement, Command, DisplayMetadata, Engine, HistoryLog, Listing, MediaAction, MediaSession,
    TempDirStore, TransportState,
};


type AppEngine = Engine<ClockElement, Box<dyn MediaSession>, TempDirStore, HistoryLog>;

/// Seek step for the arrow keys, as a fraction of the track.
const SEEK_STEP: f64 = 0.05;

const STATUS_TIMEOUT: Duration = Duration::from_secs( 4 );


/// Application state.
struct App {
    engine: AppEngine,
    should_quit: bool,

    // View state
    view_mode: ViewMode,
    queue_state: ListState,
    history_state: ListState,

    // Input state
    input_mode: InputMode,
    input_buffer: InputBuffer,

    status_message: Option<String>,
    status_clear_at: Option<Instant>,
}


impl App {
    fn new( args: &Args, listing: Listing, settings: &Settings ) -> Self {
        let root = listing.root.clone();
        let element = ClockElement::new( move |track| {
            match tags::read( &root.join( &track.path ) ) {
                Ok( info ) => info.duration,
                Err( e ) => {
                    tracing::warn!( "Cannot measure {}: {}", track.path, e );
                    None
                }
            }
        });

        let cover_dir = settings.cover_dir.clone().unwrap_or_else( TempDirStore::default_dir );
        let session = media_controls::create_session( settings.media_session_enabled );
        let history = HistoryLog::with_limit( settings.history_capacity() );

        let mut engine = Engine::new(
            element,
            session,
            TempDirStore::new( cover_dir ),
            settings.fallback_cover.clone(),
            history,
        );

        let Listing { tracks, metadata, .. } = listing;
        let count = tracks.len();
        engine.set_library( metadata );
        engine.set_queue( tracks, args.start.saturating_sub( 1 ) );

        let mut queue_state = ListState::default();
        queue_state.select( engine.queue().index() );

        let mut app = Self {
            engine,
            should_quit: false,
            view_mode: ViewMode::default(),
            queue_state,
            history_state: ListState::default(),
            input_mode: InputMode::Normal,
            input_buffer: InputBuffer::new(),
            status_message: None,
            status_clear_at: None,
        };
        app.set_status( format!( "Loaded {} tracks", count ) );
        app
    }


    fn set_status( &mut self, msg: impl Into<String> ) {
        self.status_message = Some( msg.into() );
        self.status_clear_at = Some( Instant::now() + STATUS_TIMEOUT );
    }


    fn tick( &mut self ) {
        let before = self.engine.queue().index();
        self.engine.tick();

        // Follow auto-advance in the queue view
        let after = self.engine.queue().index();
        if after != before {
            self.queue_state.select( after );
        }

        if let Some( at ) = self.status_clear_at {
            if Instant::now() >= at {
                self.status_message = None;
                self.status_clear_at = None;
            }
        }
    }


    fn handle_key( &mut self, code: KeyCode ) {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_key( code ),
            InputMode::Command => self.handle_command_key( code ),
        }
    }


    fn handle_normal_key( &mut self, code: KeyCode ) {
        match code {
            KeyCode::Char( 'q' ) => self.should_quit = true,
            KeyCode::Char( '/' ) => {
                self.input_mode = InputMode::Command;
                self.input_buffer.clear();
            }
            KeyCode::Char( '?' ) => {
                self.view_mode = if self.view_mode == ViewMode::Help { ViewMode::Queue } else { ViewMode::Help };
            }
            KeyCode::Esc if self.view_mode == ViewMode::Help => self.view_mode = ViewMode::Queue,
            KeyCode::Tab => self.view_mode = self.view_mode.next_tab(),
            KeyCode::Char( ' ' ) => self.toggle(),
            KeyCode::Char( 'n' ) => self.engine.next(),
            KeyCode::Char( 'p' ) => self.engine.previous(),
            KeyCode::Left => self.seek_relative( -SEEK_STEP ),
            KeyCode::Right => self.seek_relative( SEEK_STEP ),
            _ => match self.view_mode {
                ViewMode::Queue => self.handle_queue_key( code ),
                ViewMode::History => self.handle_history_key( code ),
                ViewMode::Help => {}
            },
        }
        self.sync_queue_selection();
    }


    fn handle_queue_key( &mut self, code: KeyCode ) {
        let len = self.engine.queue().len();
        match code {
            KeyCode::Up | KeyCode::Char( 'k' ) => select_previous( &mut self.queue_state, len ),
            KeyCode::Down | KeyCode::Char( 'j' ) => select_next( &mut self.queue_state, len ),
            KeyCode::Enter => {
                if let Some( index ) = self.queue_state.selected() {
                    self.engine.select( index );
                }
            }
            _ => {}
        }
    }


    fn handle_history_key( &mut self, code: KeyCode ) {
        let len = self.engine.history().len();
        match code {
            KeyCode::Up | KeyCode::Char( 'k' ) => select_previous( &mut self.history_state, len ),
            KeyCode::Down | KeyCode::Char( 'j' ) => select_next( &mut self.history_state, len ),
            KeyCode::Enter => {
                if let Some( index ) = self.history_state.selected().filter( |i| *i < len ) {
                    let tracks = self.engine.history().entries().to_vec();
                    self.engine.set_queue( tracks, index );
                    self.view_mode = ViewMode::Queue;
                    self.set_status( "Playing from history" );
                }
            }
            KeyCode::Char( 'd' ) => {
                let path = self.history_state.selected()
                    .and_then( |i| self.engine.history().entries().get( i ) )
                    .map( |t| t.path.clone() );
                if let Some( path ) = path {
                    if self.engine.history_mut().remove( &path ) {
                        self.set_status( format!( "Removed {} from history", path ) );
                    }
                    let len = self.engine.history().len();
                    if len == 0 {
                        self.history_state.select( None );
                    } else if self.history_state.selected().is_some_and( |i| i >= len ) {
                        self.history_state.select( Some( len - 1 ) );
                    }
                }
            }
            _ => {}
        }
    }


    fn handle_command_key( &mut self, code: KeyCode ) {
        match code {
            KeyCode::Enter => {
                let input = self.input_buffer.content().to_string();
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
                self.execute_command( &input );
                self.sync_queue_selection();
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            KeyCode::Backspace => {
                if self.input_buffer.is_empty() {
                    self.input_mode = InputMode::Normal;
                } else {
                    self.input_buffer.backspace();
                }
            }
            KeyCode::Left => self.input_buffer.move_left(),
            KeyCode::Right => self.input_buffer.move_right(),
            KeyCode::Char( c ) => self.input_buffer.insert( c ),
            _ => {}
        }
    }


    fn execute_command( &mut self, input: &str ) {
        match Command::parse( input ) {
            Ok( cmd ) => {
                if let Err( e ) = self.run_command( cmd ) {
                    self.set_status( format!( "Error: {}", e ) );
                }
            }
            Err( e ) => {
                self.set_status( format!( "{}", e ) );
            }
        }
    }


    fn run_command( &mut self, cmd: Command ) -> Result<()> {
        match cmd {
            Command::Play => {
                self.require_ready()?;
                self.engine.dispatch( MediaAction::Play );
            }
            Command::Pause => self.engine.dispatch( MediaAction::Pause ),
            Command::Toggle => self.toggle(),
            Command::Next => self.engine.next(),
            Command::Prev => self.engine.previous(),
            Command::Seek { target } => {
                self.require_ready()?;
                match target {
                    SeekTarget::Fraction( fraction ) => self.engine.seek( fraction ),
                    SeekTarget::Position( secs ) => self.engine.seek_to( secs ),
                }
            }
            Command::Goto { index } => {
                let len = self.engine.queue().len();
                if index >= len {
                    anyhow::bail!( "Queue has {} tracks", len );
                }
                self.engine.select( index );
                self.set_status( format!( "Track {}", index + 1 ) );
            }
            Command::Clear => {
                self.engine.clear_queue();
                self.set_status( "Queue cleared" );
            }
            Command::History => self.view_mode = ViewMode::History,
            Command::Help => self.view_mode = ViewMode::Help,
            Command::Quit => self.should_quit = true,
        }
        Ok(())
    }


    fn toggle( &mut self ) {
        if self.engine.current().is_some() && !self.engine.is_ready() {
            self.set_status( "Track not ready" );
            return;
        }
        self.engine.play_pause();
    }


    fn seek_relative( &mut self, delta: f64 ) {
        if !self.engine.is_ready() {
            return;
        }
        let target = ( self.engine.state().progress() + delta ).clamp( 0.0, 1.0 );
        self.engine.seek( target );
    }


    fn require_ready( &self ) -> Result<()> {
        if self.engine.current().is_none() {
            anyhow::bail!( "Nothing queued" );
        }
        if !self.engine.is_ready() {
            anyhow::bail!( "Track not ready" );
        }
        Ok(())
    }


    /// Keeps the selection on the playing track after it changes.
    fn sync_queue_selection( &mut self ) {
        let current = self.engine.queue().index();
        if current.is_none() {
            self.queue_state.select( None );
        } else if self.queue_state.selected().is_none() {
            self.queue_state.select( current );
        }
    }
}


fn select_next( state: &mut ListState, len: usize ) {
    if len == 0 {
        return;
    }
    let i = state.selected().map_or( 0, |i| ( i + 1 ).min( len - 1 ) );
    state.select( Some( i ) );
}


fn select_previous( state: &mut ListState, len: usize ) {
    if len == 0 {
        return;
    }
    let i = state.selected().map_or( 0, |i| i.saturating_sub( 1 ) );
    state.select( Some( i ) );
}


/// Sets up file logging. The TUI owns the terminal, so nothing goes to stdout.
fn init_logging( verbose: bool ) -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else( std::env::temp_dir )
        .join( "omp" );
    fs::create_dir_all( &dir )
        .with_context( || format!( "Failed to create log directory {:?}", dir ) )?;

    let path = dir.join( "omp.log" );
    let file = File::create( &path )
        .with_context( || format!( "Failed to create log file {:?}", path ) )?;

    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_writer( Mutex::new( file ) )
        .with_ansi( false )
        .with_max_level( level )
        .init();

    Ok( path )
}


fn open_listing( path: Option<&Path> ) -> Result<Listing> {
    let path = match path {
        Some( p ) => p.to_path_buf(),
        None => dirs::audio_dir().unwrap_or_else( || PathBuf::from( "." ) ),
    };
    Listing::open( &path ).with_context( || format!( "Failed to open {:?}", path ) )
}


fn main() -> Result<()> {
    let args = Args::parse();
    let log_path = init_logging( args.verbose )?;
    tracing::info!( "OMP {} starting, log at {:?}", env!( "CARGO_PKG_VERSION" ), log_path );

    let listing = open_listing( args.path.as_deref() )?;

    if let Some( ref out ) = args.export {
        listing.save( out ).with_context( || format!( "Failed to export listing to {:?}", out ) )?;
        println!( "Exported {} tracks to {}", listing.tracks.len(), out.display() );
        return Ok(());
    }

    let settings = Settings::load();

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute( EnterAlternateScreen )?;

    let mut terminal = Terminal::new( CrosstermBackend::new( io::stdout() ) )?;

    let mut app = App::new( &args, listing, &settings );

    // Main loop
    let result = run( &mut terminal, &mut app );

    app.engine.shutdown();

    // Cleanup
    disable_raw_mode()?;
    io::stdout().execute( LeaveAlternateScreen )?;

    tracing::info!( "OMP exiting" );
    result
}


fn run( terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App ) -> Result<()> {
    loop {
        app.tick();

        terminal.draw( |frame| draw_ui( frame, app ) )?;

        if event::poll( Duration::from_millis( 100 ) )? {
            if let Event::Key( key ) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key( key.code );
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}


/// Draws the main UI.
fn draw_ui( frame: &mut Frame, app: &mut App ) {
    let chunks = Layout::default()
        .direction( Direction::Vertical )
        .constraints([
            Constraint::Length( 2 ),  // Header
            Constraint::Min( 0 ),     // Main content
            Constraint::Length( 6 ),  // Now playing
            Constraint::Length( 1 ),  // Status bar
        ])
        .split( frame.area() );

    let header = Paragraph::new( format!( "  OMP - {}", app.view_mode.title() ) )
        .style( Style::default().fg( Color::Cyan ).bold() )
        .block( Block::default().borders( Borders::BOTTOM ) );
    frame.render_widget( header, chunks[0] );

    match app.view_mode {
        ViewMode::Queue => draw_queue( frame, app, chunks[1] ),
        ViewMode::History => draw_history( frame, app, chunks[1] ),
        ViewMode::Help => draw_help( frame, chunks[1] ),
    }

    draw_now_playing( frame, app, chunks[2] );
    draw_status_bar( frame, app, chunks[3] );
}


fn draw_queue( frame: &mut Frame, app: &mut App, area: Rect ) {
    let playing = app.engine.queue().index();

    let items: Vec<ListItem> = app.engine.queue().tracks()
        .iter()
        .enumerate()
        .map( |( i, track )| {
            let marker = if Some( i ) == playing { "▶ " } else { "  " };
            let style = if Some( i ) == playing {
                Style::default().fg( Color::Green )
            } else {
                Style::default()
            };
            ListItem::new( format!( "{}{:>3}. {}", marker, i + 1, track.title ) ).style( style )
        })
        .collect();

    let title = format!( " Queue ({}) ", items.len() );
    let list = List::new( items )
        .block( Block::default().title( title ).borders( Borders::ALL ) )
        .highlight_style( Style::default().bg( Color::DarkGray ) );

    frame.render_stateful_widget( list, area, &mut app.queue_state );
}


fn draw_history( frame: &mut Frame, app: &mut App, area: Rect ) {
    let items: Vec<ListItem> = app.engine.history().entries()
        .iter()
        .map( |track| ListItem::new( format!( "  {}  ({})", track.title, track.path ) ) )
        .collect();

    let list = List::new( items )
        .block( Block::default().title( " Recently played " ).borders( Borders::ALL ) )
        .highlight_style( Style::default().bg( Color::DarkGray ) );

    frame.render_stateful_widget( list, area, &mut app.history_state );
}


fn draw_help( frame: &mut Frame, area: Rect ) {
    let help = Paragraph::new( command::help_text() )
        .block( Block::default().title( " Help " ).borders( Borders::ALL ) )
        .wrap( Wrap { trim: false } );
    frame.render_widget( help, area );
}


fn draw_now_playing( frame: &mut Frame, app: &App, area: Rect ) {
    let state_str = match app.engine.transport() {
        TransportState::Playing => "▶",
        TransportState::Paused => "⏸",
        TransportState::Idle => "■",
    };

    let mut lines = Vec::new();
    match app.engine.display() {
        Some( display ) => {
            lines.push( Line::from( Span::styled(
                format!( " {} {} ", state_str, display.title ),
                Style::default().bold(),
            )));
            let artist_album = artist_album_line( display );
            if !artist_album.is_empty() {
                lines.push( Line::from( Span::styled( format!( "   {} ", artist_album ), Style::default().fg( Color::Gray ) ) ) );
            }
        }
        None => {
            lines.push( Line::from( Span::styled( format!( " {} Not playing ", state_str ), Style::default().bold() ) ) );
        }
    }

    lines.push( Line::from( Span::styled(
        format!( "   Cover: {} ", app.engine.cover_url() ),
        Style::default().fg( Color::DarkGray ),
    )));

    let state = app.engine.state();
    let format_time = |secs: f64| -> String {
        let secs = if secs.is_finite() { secs.max( 0.0 ) as u64 } else { 0 };
        format!( "{}:{:02}", secs / 60, secs % 60 )
    };

    let progress_width = 20;
    let filled = ( state.progress().clamp( 0.0, 1.0 ) * progress_width as f64 ).round() as usize;
    let bar = format!( "[{}{}]", "█".repeat( filled ), "░".repeat( progress_width - filled ) );
    lines.push( Line::from( format!(
        " {} {} / {} ",
        bar,
        format_time( state.current_time ),
        format_time( state.duration )
    )));

    let now_playing = Paragraph::new( lines )
        .block( Block::default().title( " Now Playing " ).borders( Borders::ALL ) );

    frame.render_widget( now_playing, area );
}


/// Second line of the now-playing panel. The fallback record has an empty artist.
fn artist_album_line( display: &DisplayMetadata ) -> String {
    match ( display.artist.is_empty(), display.album.as_deref() ) {
        ( false, Some( album ) ) => format!( "{} - {}", display.artist, album ),
        ( false, None ) => display.artist.clone(),
        ( true, Some( album ) ) => album.to_string(),
        ( true, None ) => String::new(),
    }
}


fn draw_status_bar( frame: &mut Frame, app: &App, area: Rect ) {
    let ( text, style ) = match app.input_mode {
        InputMode::Command => {
            ( format!( "/{}", app.input_buffer.content() ), Style::default().fg( Color::Yellow ) )
        }
        InputMode::Normal => {
            if let Some( ref msg ) = app.status_message {
                ( msg.clone(), Style::default().fg( Color::Green ) )
            } else {
                let hint = match app.view_mode {
                    ViewMode::Queue => " [/]Cmd [Tab]History [Space]Play [n/p]Skip [←→]Seek [Enter]Play [?]Help [q]Quit ",
                    ViewMode::History => " [Tab]Queue [Enter]Play from here [d]Remove [?]Help [q]Quit ",
                    ViewMode::Help => " [?]Close [Esc]Close ",
                };
                ( hint.to_string(), Style::default().fg( Color::DarkGray ) )
            }
        }
    };

    let status = Paragraph::new( text ).style( style );
    frame.render_widget( status, area );

    if app.input_mode == InputMode::Command {
        let cursor_x = area.x + 1 + app.input_buffer.cursor_column() as u16;
        frame.set_cursor_position(( cursor_x, area.y ));
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_select_next_stops_at_end() {
        let mut state = ListState::default();
        select_next( &mut state, 2 );
        assert_eq!( state.selected(), Some( 0 ) );
        select_next( &mut state, 2 );
        select_next( &mut state, 2 );
        assert_eq!( state.selected(), Some( 1 ) );
    }


    #[test]
    fn test_select_previous_stops_at_start() {
        let mut state = ListState::default();
        state.select( Some( 1 ) );
        select_previous( &mut state, 2 );
        select_previous( &mut state, 2 );
        assert_eq!( state.selected(), Some( 0 ) );
    }


    #[test]
    fn test_select_on_empty_list() {
        let mut state = ListState::default();
        select_next( &mut state, 0 );
        select_previous( &mut state, 0 );
        assert_eq!( state.selected(), None );
    }


    #[test]
    fn test_artist_album_line() {
        let track = omp_core::Track::new( "b", "B", 20 );
        assert_eq!( artist_album_line( &DisplayMetadata::fallback( &track ) ), "" );

        let entry = omp_core::MetadataEntry {
            path: "a".to_string(),
            title: "Song A".to_string(),
            artist: "Artist".to_string(),
            album: Some( "Album".to_string() ),
            cover: None,
        };
        let mut display = DisplayMetadata::from_entry( &entry, 10 );
        assert_eq!( artist_album_line( &display ), "Artist - Album" );

        display.album = None;
        assert_eq!( artist_album_line( &display ), "Artist" );

        display.artist.clear();
        display.album = Some( "Album".to_string() );
        assert_eq!( artist_album_line( &display ), "Album" );
    }


    #[test]
    fn test_open_listing_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join( "listing.json" );
        fs::write( &path, r#"{ "tracks": [ { "path": "a.mp3", "title": "A", "size": 3 } ] }"# ).unwrap();

        let listing = open_listing( Some( &path ) ).unwrap();
        assert_eq!( listing.tracks.len(), 1 );
        assert!( open_listing( Some( &dir.path().join( "missing.json" ) ) ).is_err() );
    }
}
