//! Slash-command input for the TUI.


/// Current input mode of the application.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum InputMode {
    /// Keyboard shortcuts active.
    #[default]
    Normal,

    /// Typing a slash command.
    Command,
}


/// Single-line text entry with a cursor.
#[derive( Debug, Default )]
pub struct InputBuffer {
    content: String,
    cursor: usize,
}


impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }


    /// Inserts a character at the cursor.
    pub fn insert( &mut self, c: char ) {
        self.content.insert( self.cursor, c );
        self.cursor += c.len_utf8();
    }


    /// Deletes the character before the cursor.
    pub fn backspace( &mut self ) {
        if let Some(( i, _ )) = self.content[ ..self.cursor ].char_indices().last() {
            self.content.remove( i );
            self.cursor = i;
        }
    }


    pub fn move_left( &mut self ) {
        if let Some(( i, _ )) = self.content[ ..self.cursor ].char_indices().last() {
            self.cursor = i;
        }
    }


    pub fn move_right( &mut self ) {
        if let Some( c ) = self.content[ self.cursor.. ].chars().next() {
            self.cursor += c.len_utf8();
        }
    }


    pub fn clear( &mut self ) {
        self.content.clear();
        self.cursor = 0;
    }


    pub fn content( &self ) -> &str {
        &self.content
    }


    pub fn is_empty( &self ) -> bool {
        self.content.is_empty()
    }


    /// Cursor position in characters, for placing the terminal cursor.
    pub fn cursor_column( &self ) -> usize {
        self.content[ ..self.cursor ].chars().count()
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_edit_multibyte() {
        let mut buf = InputBuffer::new();
        for c in "seek 1:3é".chars() {
            buf.insert( c );
        }
        buf.backspace();
        buf.insert( '0' );
        assert_eq!( buf.content(), "seek 1:30" );

        buf.move_left();
        buf.move_left();
        buf.backspace();
        assert_eq!( buf.content(), "seek 130" );
        assert_eq!( buf.cursor_column(), 6 );
    }


    #[test]
    fn test_cursor_bounds() {
        let mut buf = InputBuffer::new();
        buf.move_left();
        buf.backspace();
        buf.insert( 'n' );
        buf.move_right();
        assert_eq!( buf.cursor_column(), 1 );
        buf.clear();
        assert!( buf.is_empty() );
    }
}
