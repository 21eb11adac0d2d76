//! Path prefix parsing.
//!
//! Every facade path starts with a backend marker:
//!
//! ```text
//! /lfs/config/settings.txt   -> internal flash, "/config/settings.txt"
//! /sd/logs/today.txt         -> removable card, "/logs/today.txt"
//! /sd                        -> removable card, "/"
//! ```
//!
//! A marker only matches a whole leading segment, so `/sdcard/x` is not a
//! removable path. Parsing never looks at whether a backend is present.

use lofs_types::{BackendTag, LofsError, LofsResult};
use serde::{Deserialize, Serialize};

/// Marker selecting the internal flash backend.
pub const INTERNAL_PREFIX: &str = "/lfs";
/// Marker selecting the removable card backend.
pub const REMOVABLE_PREFIX: &str = "/sd";
/// Longest backend-relative path accepted, in bytes.
pub const DEFAULT_MAX_PATH_LEN: usize = 255;

/// What to do with absolute paths that carry no recognized marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixPolicy {
    /// Only `/lfs` and `/sd` paths are accepted.
    #[default]
    Strict,
    /// Unmarked absolute paths go to the internal backend unchanged.
    Legacy,
}

/// A path that resolved to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedPath<'a> {
    /// Never [`BackendTag::Invalid`].
    pub tag: BackendTag,
    /// Backend-relative path, always starting with `/`.
    pub stripped: &'a str,
}

/// Splits facade paths into a backend and a backend-relative path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixParser {
    policy: PrefixPolicy,
    max_path_len: usize,
}

impl Default for PrefixParser {
    fn default() -> Self {
        Self::new(PrefixPolicy::default(), DEFAULT_MAX_PATH_LEN)
    }
}

impl PrefixParser {
    pub fn new(policy: PrefixPolicy, max_path_len: usize) -> Self {
        Self {
            policy,
            max_path_len,
        }
    }

    /// Parse a facade path.
    ///
    /// The stripped path borrows from `path`; nothing is copied, so it can
    /// never be truncated. A stripped path longer than the configured limit
    /// is rejected instead.
    pub fn parse<'a>(&self, path: &'a str) -> LofsResult<ParsedPath<'a>> {
        if path.is_empty() {
            return Err(LofsError::InvalidPath("empty path".to_string()));
        }
        if path.contains('\0') {
            return Err(LofsError::InvalidPath(format!("{path:?} contains NUL")));
        }

        let parsed = if let Some(stripped) = strip_marker(path, INTERNAL_PREFIX) {
            ParsedPath {
                tag: BackendTag::Internal,
                stripped,
            }
        } else if let Some(stripped) = strip_marker(path, REMOVABLE_PREFIX) {
            ParsedPath {
                tag: BackendTag::Removable,
                stripped,
            }
        } else {
            match self.policy {
                PrefixPolicy::Legacy if path.starts_with('/') => ParsedPath {
                    tag: BackendTag::Internal,
                    stripped: path,
                },
                _ => {
                    return Err(LofsError::InvalidPath(format!(
                        "{path:?} has no {INTERNAL_PREFIX} or {REMOVABLE_PREFIX} prefix"
                    )));
                }
            }
        };

        if parsed.stripped.len() > self.max_path_len {
            return Err(LofsError::InvalidPath(format!(
                "{path:?} exceeds {} bytes",
                self.max_path_len
            )));
        }

        Ok(parsed)
    }

    /// Classify a path without keeping the stripped remainder.
    pub fn classify(&self, path: &str) -> BackendTag {
        self.parse(path)
            .map(|p| p.tag)
            .unwrap_or(BackendTag::Invalid)
    }
}

/// Strip `marker` if it is a whole leading segment of `path`.
fn strip_marker<'a>(path: &'a str, marker: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(marker)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
