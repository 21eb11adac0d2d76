//! lofs: one file API over internal flash and a removable card.
//!
//! This crate provides:
//!
//! - **Prefix**: Classifies `/lfs/...` and `/sd/...` paths and strips the marker
//! - **Probe**: Decides whether the removable backend can be touched right now
//! - **Router**: The `PathRouter` facade dispatching each operation to its backend
//! - **Mover**: Copy-then-delete rename across backends
//! - **VFS**: The `Filesystem` trait with in-memory and host-directory backends
//! - **Config**: `RouterConfig`, loadable from TOML
//!
//! ```
//! use std::io::{Read, Write};
//! use lofs::{MemoryFs, PathRouter, FILE_O_READ, FILE_O_WRITE};
//!
//! let router = PathRouter::new(MemoryFs::new());
//! let mut f = router.open("/lfs/hello.txt", FILE_O_WRITE)?;
//! f.write_all(b"hi")?;
//! f.close()?;
//!
//! let mut out = String::new();
//! router.open("/lfs/hello.txt", FILE_O_READ)?.read_to_string(&mut out)?;
//! assert_eq!(out, "hi");
//! assert!(!router.exists("/sd/hello.txt"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod file;
mod mover;
pub mod prefix;
pub mod probe;
pub mod router;
pub mod vfs;

#[cfg(test)]
mod testing;

pub use config::{DEFAULT_COPY_CHUNK_SIZE, RouterConfig};
pub use file::File;
pub use prefix::{
    DEFAULT_MAX_PATH_LEN, INTERNAL_PREFIX, ParsedPath, PrefixParser, PrefixPolicy,
    REMOVABLE_PREFIX,
};
pub use probe::{Absent, CapabilityProbe, Cached, CardDetect, MountPointProbe};
pub use router::PathRouter;
pub use vfs::{FileHandle, Filesystem, LocalFs, MemoryFs};

// Shared types, so embedders need only one dependency.
pub use lofs_types::{
    BackendTag, DirEntry, DirEntryKind, FILE_O_READ, FILE_O_WRITE, IntoOpenMode, LofsError,
    LofsResult, MoveOutcome, OpenMode, SpaceInfo,
};
