//! Slash command parsing.
//!
//! Hosts parse user input into a [`Command`] and run it against the engine.

use std::str::FromStr;

use thiserror::Error;


/// Errors that can occur during command parsing.
#[derive( Debug, Error )]
pub enum CommandError {
    #[error( "Unknown command: {0}" )]
    Unknown( String ),

    #[error( "Invalid argument: {0}" )]
    InvalidArgument( String ),

    #[error( "Missing argument: {0}" )]
    MissingArgument( String ),
}


/// Seek destination.
#[derive( Debug, Clone, Copy, PartialEq )]
pub enum SeekTarget {
    /// Fraction of the duration in `[0, 1]`.
    Fraction( f64 ),
    /// Absolute position in seconds.
    Position( f64 ),
}


impl FromStr for SeekTarget {
    type Err = CommandError;


    /// Accepts `42%`, `1:30` or plain seconds.
    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some( pct ) = s.strip_suffix( '%' ) {
            let value: f64 = pct.trim().parse()
                .map_err( |_| CommandError::InvalidArgument( format!( "Invalid percentage: {}", s ) ) )?;
            if !( 0.0..=100.0 ).contains( &value ) {
                return Err( CommandError::InvalidArgument( format!( "Percentage out of range: {}", s ) ) );
            }
            return Ok( SeekTarget::Fraction( value / 100.0 ) );
        }

        if let Some(( min, sec )) = s.split_once( ':' ) {
            let minutes: u64 = min.parse()
                .map_err( |_| CommandError::InvalidArgument( format!( "Invalid minutes: {}", min ) ) )?;
            let seconds: u64 = sec.parse()
                .map_err( |_| CommandError::InvalidArgument( format!( "Invalid seconds: {}", sec ) ) )?;
            let total = minutes.checked_mul( 60 )
                .and_then( |m| m.checked_add( seconds ) )
                .ok_or_else( || CommandError::InvalidArgument( format!( "Time out of range: {}", s ) ) )?;
            return Ok( SeekTarget::Position( total as f64 ) );
        }

        let seconds: u64 = s.parse()
            .map_err( |_| CommandError::InvalidArgument( format!( "Invalid time: {}", s ) ) )?;
        Ok( SeekTarget::Position( seconds as f64 ) )
    }
}


/// Parsed slash command.
#[derive( Debug, Clone, PartialEq )]
pub enum Command {
    // Playback
    Play,
    Pause,
    Toggle,
    Next,
    Prev,
    Seek { target: SeekTarget },

    // Queue
    Goto { index: usize },
    Clear,

    // UI
    History,
    Help,
    Quit,
}


impl Command {
    /// Parses a command string (without the leading `/`).
    ///
    /// `goto` takes a 1-based position, as shown in the queue view.
    pub fn parse( input: &str ) -> Result<Self, CommandError> {
        let input = input.trim();
        let mut parts = input.splitn( 2, ' ' );
        let cmd = parts.next().unwrap_or( "" ).to_lowercase();
        let args = parts.next().map( |s| s.trim() ).filter( |s| !s.is_empty() );

        match cmd.as_str() {
            "play" | "p" => Ok( Command::Play ),
            "pause" | "pa" => Ok( Command::Pause ),
            "toggle" | "t" => Ok( Command::Toggle ),
            "next" | "n" => Ok( Command::Next ),
            "prev" | "previous" | "pr" => Ok( Command::Prev ),
            "seek" | "sk" => {
                let target = args
                    .ok_or_else( || CommandError::MissingArgument( "time position".into() ) )?
                    .parse()?;
                Ok( Command::Seek { target } )
            }

            "goto" | "go" => {
                let position: usize = args
                    .ok_or_else( || CommandError::MissingArgument( "queue position".into() ) )?
                    .parse()
                    .map_err( |_| CommandError::InvalidArgument( "queue position must be a number".into() ) )?;
                if position == 0 {
                    return Err( CommandError::InvalidArgument( "queue positions start at 1".into() ) );
                }
                Ok( Command::Goto { index: position - 1 } )
            }
            "clear" | "cl" => Ok( Command::Clear ),

            "history" | "hist" => Ok( Command::History ),
            "help" | "h" => Ok( Command::Help ),
            "quit" | "q" | "exit" => Ok( Command::Quit ),

            "" => Err( CommandError::Unknown( "empty command".into() ) ),
            other => Err( CommandError::Unknown( other.to_string() ) ),
        }
    }
}


/// Returns help text listing all available commands.
pub fn help_text() -> &'static str {
    r#"Playback Commands:
  /play           Resume playback
  /pause          Pause playback
  /toggle         Toggle play/pause      [space]
  /next           Next track             [n]
  /prev           Previous track         [p]
  /seek <pos>     Seek (1:30, 90, 25%)   [left/right]

Queue Commands:
  /goto <n>       Switch to track n      [enter]
  /clear          Clear the queue

Other Commands:
  /history        Show play history      [tab]
  /help           Show this help         [?]
  /quit           Exit omp               [q]"#
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_parse_playback() {
        assert_eq!( Command::parse( "play" ).unwrap(), Command::Play );
        assert_eq!( Command::parse( "  N " ).unwrap(), Command::Next );
        assert_eq!( Command::parse( "previous" ).unwrap(), Command::Prev );
    }


    #[test]
    fn test_parse_seek_time() {
        let cmd = Command::parse( "seek 1:30" ).unwrap();
        assert_eq!( cmd, Command::Seek { target: SeekTarget::Position( 90.0 ) } );
    }


    #[test]
    fn test_parse_seek_time_out_of_range() {
        let result = Command::parse( "seek 999999999999999999:0" );
        assert!( matches!( result, Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_seek_seconds() {
        let cmd = Command::parse( "sk 45" ).unwrap();
        assert_eq!( cmd, Command::Seek { target: SeekTarget::Position( 45.0 ) } );
    }


    #[test]
    fn test_parse_seek_percentage() {
        let cmd = Command::parse( "seek 25%" ).unwrap();
        assert_eq!( cmd, Command::Seek { target: SeekTarget::Fraction( 0.25 ) } );
        assert!( matches!( Command::parse( "seek 120%" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_goto_is_one_based() {
        assert_eq!( Command::parse( "goto 3" ).unwrap(), Command::Goto { index: 2 } );
        assert!( matches!( Command::parse( "goto 0" ), Err( CommandError::InvalidArgument( _ ) ) ) );
        assert!( matches!( Command::parse( "goto x" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_unknown() {
        assert!( matches!( Command::parse( "foobar" ), Err( CommandError::Unknown( _ ) ) ) );
        assert!( matches!( Command::parse( "" ), Err( CommandError::Unknown( _ ) ) ) );
    }


    #[test]
    fn test_parse_missing_arg() {
        assert!( matches!( Command::parse( "seek" ), Err( CommandError::MissingArgument( _ ) ) ) );
        assert!( matches!( Command::parse( "goto   " ), Err( CommandError::MissingArgument( _ ) ) ) );
    }
}
