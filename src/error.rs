//! Error taxonomy for snapshot operations.
//!
//! Callers branch on these classes (a missing key is routine, a CRC failure
//! is not), so the crate exposes a typed enum rather than opaque strings.
//! I/O errors always carry a path-bearing context string.

use std::io;
use std::path::Path;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Unknown key or id.
    #[error("snapshot {0:?} does not exist")]
    NotFound(String),

    /// Key or committed-name collision among live records.
    #[error("snapshot {0:?} already exists")]
    AlreadyExists(String),

    /// Malformed input: empty key, unknown field path, parent chain
    /// referencing a missing or non-committed ancestor.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not valid for the record's current state, e.g. committing
    /// a non-active snapshot or removing one with children.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// Index corruption: bad magic/version/CRC or truncated metadata.
    #[error("metadata corrupt: {0}")]
    Corrupt(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with an operation + path context.
    pub fn io(err: io::Error, op: &str, path: &Path) -> Self {
        Error::Io {
            context: format!("{} {}", op, path.display()),
            source: err,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    pub fn is_failed_precondition(&self) -> bool {
        matches!(self, Error::FailedPrecondition(_))
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Error::Corrupt(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn predicates_match_variants() {
        assert!(Error::NotFound("k".into()).is_not_found());
        assert!(Error::AlreadyExists("k".into()).is_already_exists());
        assert!(Error::InvalidArgument("x".into()).is_invalid_argument());
        assert!(Error::FailedPrecondition("x".into()).is_failed_precondition());
        assert!(Error::Corrupt("bad crc".into()).is_corrupt());
        assert!(!Error::NotFound("k".into()).is_already_exists());
    }

    #[test]
    fn io_carries_context_and_source() {
        let path = PathBuf::from("/tmp/x");
        let e = Error::io(
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            "rename",
            &path,
        );
        let msg = e.to_string();
        assert!(msg.contains("rename"), "context must name the op: {msg}");
        assert!(msg.contains("/tmp/x"), "context must name the path: {msg}");
        match e {
            Error::Io { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied)
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
