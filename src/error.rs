//! Centralized error types for mboxnav.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mboxnav library.
#[derive(Error, Debug)]
pub enum MboxError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("MBOX file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file is not empty but contains no `From ` delimiter lines.
    #[error("No messages found in '{0}' (no mbox delimiter lines)")]
    NoMessages(PathBuf),

    /// An ordinal outside the current view.
    #[error("Index {ordinal} out of range (view has {len} message(s))")]
    OutOfRange { ordinal: usize, len: usize },

    /// A column name outside the whitelist.
    #[error("Unknown column '{0}'. Available: index, date, from, to, cc, subject")]
    UnknownColumn(String),

    /// A sort field other than date, from or subject.
    #[error("Unknown sort field '{0}'. Available: date, from, subject")]
    UnknownSortField(String),

    /// A page size that is not a positive integer.
    #[error("Invalid page size '{0}': expected a positive integer")]
    InvalidPageSize(String),

    /// Any other malformed argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Coarse classification of [`MboxError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// File missing, unreadable or unwritable.
    Io,
    /// No valid delimiters where at least one was required.
    Format,
    /// Ordinal or position outside the current view.
    OutOfRange,
    /// Unknown column, sort field, page size or other bad argument.
    Validation,
}

/// Convenience alias for `Result<T, MboxError>`.
pub type Result<T> = std::result::Result<T, MboxError>;

impl MboxError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Which class of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::FileNotFound(_) => ErrorKind::Io,
            Self::NoMessages(_) => ErrorKind::Format,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::UnknownColumn(_)
            | Self::UnknownSortField(_)
            | Self::InvalidPageSize(_)
            | Self::InvalidArgument(_) => ErrorKind::Validation,
        }
    }

    /// Query-time errors leave the session intact and can be reported and ignored.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::OutOfRange | ErrorKind::Validation)
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (prefer `MboxError::io`).
impl From<std::io::Error> for MboxError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            MboxError::NoMessages(PathBuf::from("a.mbox")).kind(),
            ErrorKind::Format
        );
        assert_eq!(
            MboxError::OutOfRange { ordinal: 9, len: 3 }.kind(),
            ErrorKind::OutOfRange
        );
        assert_eq!(
            MboxError::UnknownColumn("size".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            MboxError::FileNotFound(PathBuf::from("x")).kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn test_recoverable() {
        assert!(MboxError::InvalidPageSize("abc".into()).is_recoverable());
        assert!(!MboxError::NoMessages(PathBuf::from("a")).is_recoverable());
    }
}
