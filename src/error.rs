use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;

/// A crate private constructor for `Error`.
pub(crate) fn new_error(kind: ErrorKind) -> Error {
    Error(Box::new(kind))
}

/// A type alias for `Result<T, charsep::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when configuring a dialect or when reading or
/// writing delimited data.
///
/// The specific kind of error is behind a box, so that the `Result` values
/// threaded through record iteration stay a single word wide.
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    /// Return the specific type of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwrap this error into its underlying type.
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns true if this is an I/O error.
    ///
    /// If this is true, the underlying `ErrorKind` is guaranteed to be
    /// `ErrorKind::Io`.
    pub fn is_io_error(&self) -> bool {
        matches!(*self.0, ErrorKind::Io(_))
    }

    /// Returns true if this is a parse error carrying a line and character
    /// position.
    pub fn is_parse_error(&self) -> bool {
        matches!(*self.0, ErrorKind::Parse { .. })
    }
}

/// The specific type of an error.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An I/O error from the underlying character source or sink.
    Io(io::Error),
    /// Malformed input discovered while tokenizing: a stray character after
    /// a closing quote, an escape at end of input, or end of input inside an
    /// open quoted field.
    Parse {
        /// The line the error was observed on, as counted by the reader.
        line: u64,
        /// The absolute character position just past the offending
        /// character.
        position: u64,
        /// What went wrong.
        message: String,
    },
    /// An invalid dialect configuration rejected by
    /// [`FormatBuilder::build`](crate::FormatBuilder::build).
    Config(String),
    /// A missing or duplicate header name discovered while building the
    /// header map.
    Header(String),
    /// A field was requested by name but the active format defines no
    /// header.
    NoHeader,
    /// A field was requested under a name the header map does not contain.
    UnknownColumn {
        /// The name that failed to resolve.
        name: String,
        /// The names the header map does contain, in column order.
        known: Vec<String>,
    },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        new_error(ErrorKind::Io(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match *err.0 {
            ErrorKind::Io(err) => err,
            kind => io::Error::new(
                io::ErrorKind::InvalidData,
                Error(Box::new(kind)),
            ),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self.0 {
            ErrorKind::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::Io(ref err) => err.fmt(f),
            ErrorKind::Parse { line, position, ref message } => {
                write!(
                    f,
                    "parse error (line {}, char {}): {}",
                    line, position, message
                )
            }
            ErrorKind::Config(ref msg) => {
                write!(f, "invalid format configuration: {}", msg)
            }
            ErrorKind::Header(ref msg) => write!(f, "header error: {}", msg),
            ErrorKind::NoHeader => {
                write!(f, "no header: this format does not map column names")
            }
            ErrorKind::UnknownColumn { ref name, ref known } => {
                write!(
                    f,
                    "mapping for column {:?} not found, expected one of {:?}",
                    name, known
                )
            }
        }
    }
}
