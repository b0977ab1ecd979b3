//! Splits bracketed logical formulas into statements and operators, one
//! nesting level at a time.

pub mod formula;

pub use crate::formula::{
    scanner::Cursor,
    unpack::{scan, unpack, Scan, Unpacker},
    Child, Diagnostic, Error, Options, Recursion, UnpackRecord, Unpacked, DEFAULT_MAX_DEPTH,
};
