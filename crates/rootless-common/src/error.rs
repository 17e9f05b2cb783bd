//! Unified error types for the rootless workspace.
//!
//! [`IdMapError`] is kept separate from [`RootlessError`] because it is
//! cached for the lifetime of the process and therefore has to be `Clone`.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum RootlessError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Taking the advisory lock failed for a reason other than the file
    /// disappearing.
    #[error("error acquiring lock on {path}: {source}")]
    Lock {
        /// Path of the lock target.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file disappeared while a lock was being taken.
    #[error("{path} no longer exists")]
    Vanished {
        /// Path that vanished.
        path: PathBuf,
    },

    /// The namespace-join primitive could not join the target.
    #[error("failed to join namespaces from {path}: {message}")]
    Join {
        /// Pause-reference path the join was attempted against.
        path: PathBuf,
        /// Description reported by the join primitive.
        message: String,
    },

    /// Reading or parsing an ID map failed.
    #[error(transparent)]
    IdMap(#[from] IdMapError),
}

impl RootlessError {
    /// Returns `true` when the error means the target file does not exist.
    ///
    /// This covers both [`RootlessError::Vanished`] and I/O errors whose
    /// kind is [`std::io::ErrorKind::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Vanished { .. } => true,
            Self::Io { source, .. } | Self::Lock { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            Self::IdMap(IdMapError::Read { source, .. }) => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

/// Failure to read or parse a kernel ID-map file.
#[derive(Debug, Clone, Error)]
pub enum IdMapError {
    /// The map file could not be read.
    #[error("cannot read ID map {path}: {source}")]
    Read {
        /// Path of the map file.
        path: PathBuf,
        /// Underlying I/O error, shared so the error can be cached.
        source: Arc<std::io::Error>,
    },

    /// A line of the map file is not a valid `(container, host, count)` triple.
    #[error("malformed ID map {path} at line {line}: {reason}")]
    Malformed {
        /// Path of the map file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What is wrong with the line.
        reason: String,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RootlessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanished_is_not_found() {
        let err = RootlessError::Vanished {
            path: PathBuf::from("/run/pause.pid"),
        };
        assert!(err.is_not_found());
    }

    #[test]
    fn lock_error_with_enoent_is_not_found() {
        let err = RootlessError::Lock {
            path: PathBuf::from("/run/pause.pid"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_not_found());
    }

    #[test]
    fn permission_denied_lock_is_fatal() {
        let err = RootlessError::Lock {
            path: PathBuf::from("/run/pause.pid"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("error acquiring lock on /run/pause.pid"));
    }

    #[test]
    fn id_map_error_converts_transparently() {
        let inner = IdMapError::Malformed {
            path: PathBuf::from("/proc/self/uid_map"),
            line: 2,
            reason: "expected 3 fields, found 2".into(),
        };
        let msg = inner.to_string();
        let err = RootlessError::from(inner);
        assert_eq!(err.to_string(), msg);
    }
}
