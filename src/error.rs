use std::{
    error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building, training, persisting or
/// querying a network.
#[derive(Debug)]
pub enum Error {
    /// A layer size of zero was requested.
    InvalidDimension { name: &'static str, got: usize },
    /// A vector handed to the network does not match its shape.
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// Gradients were applied with a batch size of zero.
    EmptyBatch,
    /// An index is outside of `0..len`.
    IndexOutOfRange { index: usize, len: usize },
    /// The input length has no integer square root.
    NotSquare { len: usize },
    /// A save destination could not be opened for writing.
    FileUnavailable { path: PathBuf, source: io::Error },
    /// A load source does not exist.
    FileMissing { path: PathBuf },
    /// A load source exists but could not be opened.
    FileUnreadable { path: PathBuf, source: io::Error },
    /// The shape stored in a saved network differs from the live network.
    ShapeMismatch {
        expected: (usize, usize, usize),
        found: (i32, i32, i32),
    },
    /// A file was truncated or holds values that make no sense.
    Corrupt { path: PathBuf, reason: String },
    /// An IDX file started with the wrong magic number.
    BadMagic { expected: u32, found: u32 },
    /// A configuration file could not be parsed.
    InvalidConfig { path: PathBuf, reason: String },
    Io(io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDimension { name, got } => {
                write!(f, "The {name} size must be positive, got {got}")
            }
            Error::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "The {what} has length {got}, expected {expected}"),
            Error::EmptyBatch => write!(f, "Cannot apply gradients of an empty batch"),
            Error::IndexOutOfRange { index, len } => {
                write!(f, "Index {index} is out of range for length {len}")
            }
            Error::NotSquare { len } => {
                write!(f, "An input of length {len} is not a square image")
            }
            Error::FileUnavailable { path, source } => {
                write!(f, "Cannot open {} for writing: {source}", path.display())
            }
            Error::FileMissing { path } => write!(f, "Could not find file {}", path.display()),
            Error::FileUnreadable { path, source } => {
                write!(f, "Cannot open {} for reading: {source}", path.display())
            }
            Error::ShapeMismatch { expected, found } => write!(
                f,
                "The saved network has shape {found:?}, the live network has shape {expected:?}"
            ),
            Error::Corrupt { path, reason } => {
                write!(f, "The file {} is corrupt: {reason}", path.display())
            }
            Error::BadMagic { expected, found } => {
                write!(f, "Bad magic number {found}, expected {expected}")
            }
            Error::InvalidConfig { path, reason } => {
                write!(f, "Invalid configuration in {}: {reason}", path.display())
            }
            Error::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::FileUnavailable { source, .. } | Error::FileUnreadable { source, .. } => {
                Some(source)
            }
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
