//! Core backend traits.

use std::fmt::Debug;
use std::io::{self, Read, Write};
use std::path::Path;

use lofs_types::{DirEntry, OpenMode};

/// An open file on one backend.
///
/// Dropping the handle closes it.
pub trait FileHandle: Read + Write + Send + Debug {
    /// Current size of the file in bytes.
    fn size(&self) -> io::Result<u64>;

    /// The mode this handle was opened with.
    fn mode(&self) -> OpenMode;
}

/// Abstract filesystem interface.
///
/// All operations use paths relative to the backend root. A leading `/`
/// names the root itself, so `/config/a.txt` and `config/a.txt` are the same
/// file. Every call blocks until the storage answers.
pub trait Filesystem: Send + Sync {
    /// Open a file.
    ///
    /// [`OpenMode::Write`] creates the file (and missing parent directories)
    /// or truncates an existing one.
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn FileHandle>>;

    /// Get metadata for a file or directory.
    fn stat(&self, path: &Path) -> io::Result<DirEntry>;

    /// List entries in a directory, sorted by name.
    fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Create a directory (and parent directories if needed).
    fn mkdir(&self, path: &Path) -> io::Result<()>;

    /// Remove a file. Directories are refused; use [`Filesystem::rmdir`].
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    fn rmdir(&self, path: &Path) -> io::Result<()>;

    /// Rename a file or directory within this backend.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Capacity of the backing storage in bytes.
    fn total_bytes(&self) -> io::Result<u64>;

    /// Bytes currently in use.
    fn used_bytes(&self) -> io::Result<u64>;

    /// Short name for logging.
    fn name(&self) -> &str;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool {
        self.stat(path).is_ok()
    }
}
