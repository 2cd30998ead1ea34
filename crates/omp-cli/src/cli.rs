//! Command-line argument parsing for OMP.

use std::path::PathBuf;

use clap::Parser;


/// OMP - play a music listing from the terminal.
#[derive( Parser, Debug )]
#[command( name = "omp" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// Directory to scan, or a JSON listing file. Defaults to the music directory.
    pub path: Option<PathBuf>,

    /// Queue position to start from (1-based).
    #[arg( short, long, default_value_t = 1 )]
    pub start: usize,

    /// Write the scanned listing to this JSON file and exit.
    #[arg( long, value_name = "FILE" )]
    pub export: Option<PathBuf>,

    /// Log debug output.
    #[arg( short, long )]
    pub verbose: bool,
}
