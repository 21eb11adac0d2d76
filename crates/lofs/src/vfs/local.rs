//! Local filesystem backend.
//!
//! Exposes one host directory as a backend, typically the mount point of a
//! card. Paths can never escape the root.

use super::traits::{FileHandle, Filesystem};
use lofs_types::{DirEntry, OpenMode};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

/// Local filesystem backend.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/media/card`, then `open("/logs/today.txt")` opens
/// `/media/card/logs/today.txt`.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Create a new local filesystem rooted at the given path.
    ///
    /// The root is not checked here; a missing root makes every call fail,
    /// which is how an ejected card behaves.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path to an absolute path within the root.
    ///
    /// `.` and `..` are folded lexically first, so a `..` that would pop
    /// past the root is refused even when the directories it walks through
    /// do not exist. The deepest existing ancestor is then canonicalized, so
    /// a symlink inside the root cannot point out of it either.
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let relative = fold_relative(path)?;
        let full = self.root.join(&relative);

        let canonical = canonicalize_existing_prefix(&full)?;
        let canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        if !canonical.starts_with(&canonical_root) {
            return Err(escapes_root(path));
        }

        Ok(canonical)
    }

    /// Resolve a path that must not be the root itself.
    fn resolve_below_root(&self, path: &Path) -> io::Result<PathBuf> {
        let full = self.resolve(path)?;
        let canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        if full == canonical_root {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot modify backend root",
            ));
        }
        Ok(full)
    }

    fn entry_for(name: String, meta: &fs::Metadata) -> DirEntry {
        let entry = if meta.is_dir() {
            DirEntry::directory(name)
        } else {
            DirEntry::file(name, meta.len())
        };
        match meta.modified() {
            Ok(modified) => entry.with_modified(modified),
            Err(_) => entry,
        }
    }
}

impl Filesystem for LocalFs {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn FileHandle>> {
        let full_path = self.resolve(path)?;

        let file = match mode {
            OpenMode::Read => {
                if full_path.is_dir() {
                    return Err(io::Error::new(
                        io::ErrorKind::IsADirectory,
                        format!("is a directory: {}", path.display()),
                    ));
                }
                fs::File::open(&full_path)?
            }
            OpenMode::Write => {
                if let Some(parent) = full_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&full_path)?
            }
        };

        Ok(Box::new(LocalFile { file, mode }))
    }

    fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path)?;
        let name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::entry_for(name, &meta))
    }

    fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let full_path = self.resolve(path)?;
        let mut entries = Vec::new();

        for entry in fs::read_dir(&full_path)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(Self::entry_for(name, &meta));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        let full_path = self.resolve(path)?;
        fs::create_dir_all(&full_path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let full_path = self.resolve_below_root(path)?;
        if full_path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            ));
        }
        fs::remove_file(&full_path)
    }

    fn rmdir(&self, path: &Path) -> io::Result<()> {
        let full_path = self.resolve_below_root(path)?;
        fs::remove_dir(&full_path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_path = self.resolve_below_root(from)?;
        let to_path = self.resolve_below_root(to)?;
        fs::rename(&from_path, &to_path)
    }

    #[cfg(unix)]
    fn total_bytes(&self) -> io::Result<u64> {
        let stat = nix::sys::statvfs::statvfs(self.root.as_path()).map_err(io::Error::from)?;
        Ok(u64::from(stat.blocks()).saturating_mul(u64::from(stat.fragment_size())))
    }

    #[cfg(unix)]
    fn used_bytes(&self) -> io::Result<u64> {
        let stat = nix::sys::statvfs::statvfs(self.root.as_path()).map_err(io::Error::from)?;
        let used_blocks = u64::from(stat.blocks()).saturating_sub(u64::from(stat.blocks_free()));
        Ok(used_blocks.saturating_mul(u64::from(stat.fragment_size())))
    }

    #[cfg(not(unix))]
    fn total_bytes(&self) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "space queries need statvfs",
        ))
    }

    #[cfg(not(unix))]
    fn used_bytes(&self) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "space queries need statvfs",
        ))
    }

    fn name(&self) -> &str {
        "local"
    }
}

fn escapes_root(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("path escapes root: {}", path.display()),
    )
}

/// Fold `.` and `..` out of a backend path, treating it as rooted.
fn fold_relative(path: &Path) -> io::Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(escapes_root(path));
                }
            }
            Component::Prefix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid path: {}", path.display()),
                ));
            }
        }
    }
    Ok(out)
}

/// Canonicalize the deepest existing ancestor of `full` and re-append the
/// missing tail. `full` must already be free of `..`.
fn canonicalize_existing_prefix(full: &Path) -> io::Result<PathBuf> {
    for ancestor in full.ancestors() {
        if ancestor.exists() {
            let tail = full
                .strip_prefix(ancestor)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let base = ancestor.canonicalize()?;
            return Ok(if tail.as_os_str().is_empty() {
                base
            } else {
                base.join(tail)
            });
        }
    }
    Ok(full.to_path_buf())
}

/// Handle onto one host file.
#[derive(Debug)]
struct LocalFile {
    file: fs::File,
    mode: OpenMode,
}

impl Read for LocalFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for LocalFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl FileHandle for LocalFile {
    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }
}
