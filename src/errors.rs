//! Error taxonomy for the storage engine.
//!
//! Two tiers, matching the engine's error handling design: `Error` is the
//! fatal tier (I/O failures, a corrupt file, an out-of-bounds page) that
//! aborts the process once it reaches `main`. Operational conditions that a
//! caller should simply be told about (`DuplicateKey`, `TableFull`, a syntax
//! mistake in the REPL's mini-language) are *not* represented here — they
//! travel as plain result enums (`ExecuteResult`, `PrepareResult`,
//! `MetaCommandResult`) defined next to the code that produces them.
use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// The backing file's length is not a whole number of pages.
    Corrupt(String),
    /// A page number fell outside `[0, TABLE_MAX_PAGES)`.
    PageOutOfBounds(String),
    /// Any other invariant violation inside the pager or tree.
    Storage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Corrupt(msg) => write!(f, "Corrupt file. {}", msg),
            Error::PageOutOfBounds(msg) => write!(f, "Page number out of bounds. {}", msg),
            Error::Storage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[macro_export]
macro_rules! err {
    ($variant:ident, $($arg:tt)*) => {
        $crate::errors::Error::$variant(format!($($arg)*))
    };
}
