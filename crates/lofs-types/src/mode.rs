//! Open modes.
//!
//! Flash filesystems historically take a numeric flag and card libraries a
//! mode string. Both normalize here, at the facade boundary, into
//! [`OpenMode`]; nothing past the router sees either encoding.

use std::fmt;
use std::str::FromStr;

use crate::error::{LofsError, LofsResult};

/// Numeric flag for read-only opens.
pub const FILE_O_READ: u8 = 0;
/// Numeric flag for write-create opens.
pub const FILE_O_WRITE: u8 = 1;

/// The two intents a file can be opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpenMode {
    /// Read-only. The file must exist.
    #[default]
    Read,
    /// Write, creating the file if missing and truncating it otherwise.
    Write,
}

impl OpenMode {
    pub fn is_write(&self) -> bool {
        matches!(self, OpenMode::Write)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::Read => f.write_str("r"),
            OpenMode::Write => f.write_str("w"),
        }
    }
}

impl TryFrom<u8> for OpenMode {
    type Error = LofsError;

    fn try_from(flag: u8) -> LofsResult<Self> {
        match flag {
            FILE_O_READ => Ok(OpenMode::Read),
            FILE_O_WRITE => Ok(OpenMode::Write),
            other => Err(LofsError::InvalidMode(format!("flag {other}"))),
        }
    }
}

impl FromStr for OpenMode {
    type Err = LofsError;

    fn from_str(s: &str) -> LofsResult<Self> {
        match s {
            "r" | "rb" => Ok(OpenMode::Read),
            "w" | "wb" => Ok(OpenMode::Write),
            other => Err(LofsError::InvalidMode(format!("{other:?}"))),
        }
    }
}

/// Anything `open` accepts as a mode.
pub trait IntoOpenMode {
    fn into_open_mode(self) -> LofsResult<OpenMode>;
}

impl IntoOpenMode for OpenMode {
    fn into_open_mode(self) -> LofsResult<OpenMode> {
        Ok(self)
    }
}

impl IntoOpenMode for u8 {
    fn into_open_mode(self) -> LofsResult<OpenMode> {
        OpenMode::try_from(self)
    }
}

impl IntoOpenMode for &str {
    fn into_open_mode(self) -> LofsResult<OpenMode> {
        self.parse()
    }
}
