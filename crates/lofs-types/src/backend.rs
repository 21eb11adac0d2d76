//! Backend classification and move outcomes.

use std::fmt;

/// Which storage backend a path addresses.
///
/// Derived from the path's prefix by the parser; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendTag {
    /// Flash-resident filesystem, always present.
    Internal,
    /// Hot-insertable card, present only when compiled in and detected.
    Removable,
    /// Unrecognized prefix or malformed path.
    Invalid,
}

impl BackendTag {
    /// Short lowercase name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendTag::Internal => "internal",
            BackendTag::Removable => "removable",
            BackendTag::Invalid => "invalid",
        }
    }
}

impl fmt::Display for BackendTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a successful rename was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Native rename on a single backend.
    Renamed,
    /// Copied to the other backend and the source deleted.
    Moved,
    /// Copied to the other backend, but the source could not be deleted.
    ///
    /// Both files now exist with identical content.
    Copied,
}

impl MoveOutcome {
    /// Returns true if the source path no longer exists after the move.
    pub fn source_removed(&self) -> bool {
        !matches!(self, MoveOutcome::Copied)
    }
}
