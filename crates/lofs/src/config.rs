//! Router configuration.
//!
//! Usually built in code, but can be loaded from a TOML file shipped with
//! the firmware image:
//!
//! ```toml
//! prefix_policy = "legacy"
//! max_path_len = 128
//! copy_chunk_size = 256
//! cache_capability = true
//! ```

use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::prefix::{DEFAULT_MAX_PATH_LEN, PrefixPolicy};

/// Bytes moved per read/write step of a cross-backend rename.
pub const DEFAULT_COPY_CHUNK_SIZE: usize = 512;

/// Configuration for a [`PathRouter`](crate::PathRouter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Handling of absolute paths without a `/lfs` or `/sd` marker.
    #[serde(default)]
    pub prefix_policy: PrefixPolicy,

    /// Longest backend-relative path accepted, in bytes.
    #[serde(default = "default_max_path_len")]
    pub max_path_len: usize,

    /// Buffer size for cross-backend copies.
    #[serde(default = "default_copy_chunk_size")]
    pub copy_chunk_size: usize,

    /// Ask the capability probe once and reuse the answer.
    ///
    /// Only safe when the card cannot be swapped while running.
    #[serde(default)]
    pub cache_capability: bool,
}

fn default_max_path_len() -> usize {
    DEFAULT_MAX_PATH_LEN
}

fn default_copy_chunk_size() -> usize {
    DEFAULT_COPY_CHUNK_SIZE
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            prefix_policy: PrefixPolicy::default(),
            max_path_len: default_max_path_len(),
            copy_chunk_size: default_copy_chunk_size(),
            cache_capability: false,
        }
    }
}

impl RouterConfig {
    /// Strict prefixes: unmarked paths fail closed.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Legacy prefixes: unmarked absolute paths go to internal flash.
    pub fn legacy() -> Self {
        Self {
            prefix_policy: PrefixPolicy::Legacy,
            ..Self::default()
        }
    }

    /// Set the prefix policy.
    pub fn with_prefix_policy(mut self, policy: PrefixPolicy) -> Self {
        self.prefix_policy = policy;
        self
    }

    /// Set the maximum backend-relative path length.
    pub fn with_max_path_len(mut self, len: usize) -> Self {
        self.max_path_len = len;
        self
    }

    /// Set the cross-backend copy buffer size.
    pub fn with_copy_chunk_size(mut self, size: usize) -> Self {
        self.copy_chunk_size = size;
        self
    }

    /// Cache the capability probe's first answer.
    pub fn with_cache_capability(mut self, cache: bool) -> Self {
        self.cache_capability = cache;
        self
    }

    /// Load configuration from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Parse configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the router cannot work with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.copy_chunk_size > 0, "copy_chunk_size must be at least 1");
        ensure!(self.max_path_len > 0, "max_path_len must be at least 1");
        Ok(())
    }
}
