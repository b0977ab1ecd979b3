use std::{fmt, str::Chars};

use super::Options;

#[derive(Debug)]
pub struct BracketScanner<'a> {
    chars: Chars<'a>,
    cursor: Cursor,
    open: char,
    close: char,
}

/// Where a token sits in the source: a character offset, and a 1-based line
/// and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Open(char),
    Close(char),
    Char(char),
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor {
            position: 0,
            line: 1,
            column: 1,
        }
    }
}

impl<'a> BracketScanner<'a> {
    pub fn new(source: &'a str, options: &Options) -> Self {
        BracketScanner {
            chars: source.chars(),
            cursor: Cursor::default(),
            open: options.open(),
            close: options.close(),
        }
    }
}

impl Iterator for BracketScanner<'_> {
    type Item = (Cursor, Token);

    fn next(&mut self) -> Option<(Cursor, Token)> {
        let c = self.chars.next()?;
        let token = if c == self.open {
            Token::Open(c)
        } else if c == self.close {
            Token::Close(c)
        } else {
            Token::Char(c)
        };

        let cursor = self.cursor;
        self.cursor.position += 1;
        if c == '\n' {
            self.cursor.line += 1;
            self.cursor.column = 1;
        } else {
            self.cursor.column += 1;
        }
        Some((cursor, token))
    }
}

impl Token {
    pub fn as_char(self) -> char {
        match self {
            Token::Open(c) | Token::Close(c) | Token::Char(c) => c,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
