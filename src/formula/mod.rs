use std::fmt;

use itertools::Itertools;
use thiserror::Error;

pub mod scanner;
pub mod unpack;

pub const DEFAULT_PLACEHOLDER: char = '.';
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// The statements and operators found at one nesting level of a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackRecord {
    /// Text inside each top-level bracket pair, brackets stripped, left to right.
    pub statements: Vec<String>,
    /// Characters outside the brackets, with a placeholder where each group was.
    pub operators: String,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unpacked {
    Record(UnpackRecord),
    Nested {
        record: UnpackRecord,
        children: Vec<Child>,
    },
}

/// A statement that was unpacked one level further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    /// Position of the statement in the parent's `statements`.
    pub index: usize,
    pub unpacked: Unpacked,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Recursion {
    /// Only the first statement that contains brackets is unpacked further.
    #[default]
    FirstOnly,
    All,
}

/// Scanning and recursion settings.
///
/// Fields can only be set through the validating builder methods:
///
/// ```compile_fail
/// let options = unbracket::Options {
///     open: '[',
///     close: '[',
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    open: char,
    close: char,
    placeholder: char,
    recursion: Recursion,
    max_depth: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("opening and closing brackets are both {0:?}")]
    IdenticalBrackets(char),
    #[error("placeholder {0:?} is also a bracket")]
    PlaceholderIsBracket(char),
}

/// A malformed-input condition found while scanning. Never fatal to [`unpack`].
///
/// `position` counts characters from the start of the fragment scanned at
/// `depth`; `line` and `column` are 1-based within that fragment.
///
/// [`unpack`]: unpack::unpack
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error(
        "too many closing brackets, detected at line {line}, column {column} \
         (character {position}, level {depth})"
    )]
    UnmatchedClose {
        position: usize,
        line: usize,
        column: usize,
        depth: usize,
    },
    #[error(
        "{open} bracket(s) never closed, group opened at line {line}, column {column} \
         (character {position}, level {depth})"
    )]
    UnclosedOpen {
        position: usize,
        line: usize,
        column: usize,
        depth: usize,
        open: usize,
    },
    #[error("statement {index} at level {depth} left packed, nesting limit is {limit}")]
    TooDeep {
        index: usize,
        depth: usize,
        limit: usize,
    },
}

impl Default for Options {
    fn default() -> Self {
        Self {
            open: '[',
            close: ']',
            placeholder: DEFAULT_PLACEHOLDER,
            recursion: Recursion::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Options {
    pub fn open(&self) -> char {
        self.open
    }

    pub fn close(&self) -> char {
        self.close
    }

    pub fn placeholder(&self) -> char {
        self.placeholder
    }

    pub fn recursion(&self) -> Recursion {
        self.recursion
    }

    /// How many levels below the starting depth a single call unpacks.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn with_recursion(mut self, recursion: Recursion) -> Self {
        self.recursion = recursion;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_brackets(mut self, open: char, close: char) -> Result<Self, Error> {
        if open == close {
            return Err(Error::IdenticalBrackets(open));
        }
        self.open = open;
        self.close = close;
        self.check_placeholder()?;
        Ok(self)
    }

    pub fn with_placeholder(mut self, placeholder: char) -> Result<Self, Error> {
        self.placeholder = placeholder;
        self.check_placeholder()?;
        Ok(self)
    }

    fn check_placeholder(&self) -> Result<(), Error> {
        if self.placeholder == self.open || self.placeholder == self.close {
            Err(Error::PlaceholderIsBracket(self.placeholder))
        } else {
            Ok(())
        }
    }
}

impl Unpacked {
    pub fn record(&self) -> &UnpackRecord {
        match self {
            Unpacked::Record(record) => record,
            Unpacked::Nested { record, .. } => record,
        }
    }

    pub fn children(&self) -> &[Child] {
        match self {
            Unpacked::Record(_) => &[],
            Unpacked::Nested { children, .. } => children,
        }
    }

    /// Every record in the tree, parents before their children.
    pub fn records(&self) -> Vec<&UnpackRecord> {
        let mut records = vec![self.record()];
        for child in self.children() {
            records.extend(child.unpacked.records());
        }
        records
    }
}

/// Quotes a string the way Python's `repr` does.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = if self.0.contains('\'') && !self.0.contains('"') {
            '"'
        } else {
            '\''
        };

        write!(f, "{quote}")?;
        for c in self.0.chars() {
            match c {
                '\\' => write!(f, "\\\\")?,
                '\n' => write!(f, "\\n")?,
                '\r' => write!(f, "\\r")?,
                '\t' => write!(f, "\\t")?,
                c if c == quote => write!(f, "\\{c}")?,
                c if c.is_control() && (c as u32) <= 0xff => write!(f, "\\x{:02x}", c as u32)?,
                c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
                c => write!(f, "{c}")?,
            }
        }
        write!(f, "{quote}")
    }
}

impl fmt::Display for UnpackRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let statements = self.statements.iter().map(|s| Quoted(s)).join(", ");
        write!(
            f,
            "[[{statements}], {}, {}]",
            Quoted(&self.operators),
            self.depth
        )
    }
}

impl fmt::Display for Unpacked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unpacked::Record(record) => write!(f, "{record}"),
            Unpacked::Nested { record, children } => {
                let children = children.iter().map(|child| &child.unpacked).join(", ");
                write!(f, "[{record}, {children}]")
            }
        }
    }
}
