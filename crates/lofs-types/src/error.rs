//! Facade errors.
//!
//! Every failure is reported once, at the call site, through [`LofsResult`].
//! Nothing is retried and nothing aborts.

use std::io;

use thiserror::Error;

use crate::backend::BackendTag;

/// Result type for facade operations.
pub type LofsResult<T> = Result<T, LofsError>;

/// Facade operation errors.
#[derive(Debug, Error)]
pub enum LofsError {
    /// Unrecognized or malformed prefix, or a stripped path that exceeds the
    /// maximum path length.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An open mode that normalizes to neither read nor write.
    #[error("invalid open mode: {0}")]
    InvalidMode(String),

    /// The path addresses a backend that is not compiled in or not present.
    #[error("{0} backend unavailable")]
    BackendUnavailable(BackendTag),

    /// The storage call itself failed.
    #[error("{op} failed on {backend} backend: {source}")]
    BackendOperationFailed {
        backend: BackendTag,
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// A cross-backend copy failed after the destination was created.
    ///
    /// The partially written destination is left in place and the source is
    /// untouched.
    #[error("cross-backend move interrupted after {copied} bytes: {source}")]
    PartialMove {
        copied: u64,
        #[source]
        source: io::Error,
    },
}

impl LofsError {
    /// Wrap a backend I/O error.
    pub fn backend(backend: BackendTag, op: &'static str, source: io::Error) -> Self {
        LofsError::BackendOperationFailed {
            backend,
            op,
            source,
        }
    }

    /// The I/O error kind underneath, if the failure came from storage.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            LofsError::BackendOperationFailed { source, .. }
            | LofsError::PartialMove { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// Returns true if the backend reported the path as missing.
    pub fn is_not_found(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::NotFound)
    }
}
