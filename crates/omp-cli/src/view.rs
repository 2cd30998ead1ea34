//! View modes of the TUI.


/// Current view of the application.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum ViewMode {
    /// The play queue.
    #[default]
    Queue,

    /// Tracks that started playing, most recent first.
    History,

    /// Command reference.
    Help,
}


impl ViewMode {
    /// Returns the next view in tab order. Help is not part of the cycle.
    pub fn next_tab( self ) -> Self {
        match self {
            ViewMode::Queue => ViewMode::History,
            ViewMode::History | ViewMode::Help => ViewMode::Queue,
        }
    }


    pub fn title( &self ) -> &'static str {
        match self {
            ViewMode::Queue => "QUEUE",
            ViewMode::History => "HISTORY",
            ViewMode::Help => "HELP",
        }
    }
}
