//! In-memory filesystem implementation.
//!
//! Stands in for the internal flash on hosts and in tests. All data is
//! ephemeral and bounded by a fixed capacity.

use super::traits::{FileHandle, Filesystem};
use lofs_types::{DirEntry, OpenMode};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

/// Capacity of a [`MemoryFs`] created with [`MemoryFs::new`]: 1 MiB, the
/// size of a typical flash data partition.
pub const DEFAULT_CAPACITY: u64 = 1024 * 1024;

/// Entry in the memory filesystem.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, modified: SystemTime },
    Directory { modified: SystemTime },
}

type Entries = Arc<RwLock<HashMap<PathBuf, Entry>>>;

/// In-memory filesystem.
///
/// Thread-safe via internal `RwLock`. Open handles share the entry table, so
/// writes are visible to other handles as soon as `write` returns.
#[derive(Debug)]
pub struct MemoryFs {
    entries: Entries,
    capacity: u64,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

fn read_lock(entries: &Entries) -> io::Result<RwLockReadGuard<'_, HashMap<PathBuf, Entry>>> {
    entries
        .read()
        .map_err(|_| io::Error::other("lock poisoned"))
}

fn write_lock(entries: &Entries) -> io::Result<RwLockWriteGuard<'_, HashMap<PathBuf, Entry>>> {
    entries
        .write()
        .map_err(|_| io::Error::other("lock poisoned"))
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("not found: {}", path.display()),
    )
}

/// Borrow a file's contents, refusing directories.
fn file_data<'a>(entries: &'a HashMap<PathBuf, Entry>, path: &Path) -> io::Result<&'a Vec<u8>> {
    match entries.get(path) {
        Some(Entry::File { data, .. }) => Ok(data),
        Some(Entry::Directory { .. }) => Err(io::Error::new(
            io::ErrorKind::IsADirectory,
            format!("is a directory: {}", path.display()),
        )),
        None => Err(not_found(path)),
    }
}

fn used(entries: &HashMap<PathBuf, Entry>) -> u64 {
    entries
        .values()
        .map(|e| match e {
            Entry::File { data, .. } => data.len() as u64,
            Entry::Directory { .. } => 0,
        })
        .sum()
}

fn has_children(entries: &HashMap<PathBuf, Entry>, dir: &Path) -> bool {
    entries
        .keys()
        .any(|k| k.parent() == Some(dir) && k.as_path() != dir)
}

impl MemoryFs {
    /// Create a new empty in-memory filesystem of [`DEFAULT_CAPACITY`] bytes.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new empty in-memory filesystem holding at most `capacity`
    /// bytes of file data.
    pub fn with_capacity(capacity: u64) -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(
            PathBuf::from(""),
            Entry::Directory {
                modified: SystemTime::now(),
            },
        );
        Self {
            entries: Arc::new(RwLock::new(entries)),
            capacity,
        }
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Normalize a path: remove leading `/`, resolve `.` and `..`.
    fn normalize(path: &Path) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.components() {
            match component {
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(s) => {
                    result.push(s);
                }
            }
        }
        result
    }

    /// Ensure all parent directories exist.
    fn ensure_parents(entries: &mut HashMap<PathBuf, Entry>, path: &Path) -> io::Result<()> {
        let mut current = PathBuf::new();
        for component in path.parent().into_iter().flat_map(|p| p.components()) {
            if let Component::Normal(s) = component {
                current.push(s);
                let entry = entries.entry(current.clone()).or_insert(Entry::Directory {
                    modified: SystemTime::now(),
                });
                if let Entry::File { .. } = entry {
                    return Err(io::Error::new(
                        io::ErrorKind::NotADirectory,
                        format!("not a directory: {}", current.display()),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Filesystem for MemoryFs {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn FileHandle>> {
        let normalized = Self::normalize(path);

        match mode {
            OpenMode::Read => {
                let entries = read_lock(&self.entries)?;
                file_data(&entries, &normalized)?;
            }
            OpenMode::Write => {
                let mut entries = write_lock(&self.entries)?;
                if let Some(Entry::Directory { .. }) = entries.get(&normalized) {
                    return Err(io::Error::new(
                        io::ErrorKind::IsADirectory,
                        format!("is a directory: {}", path.display()),
                    ));
                }
                Self::ensure_parents(&mut entries, &normalized)?;
                entries.insert(
                    normalized.clone(),
                    Entry::File {
                        data: Vec::new(),
                        modified: SystemTime::now(),
                    },
                );
            }
        }

        Ok(Box::new(MemoryFile {
            entries: Arc::clone(&self.entries),
            path: normalized,
            mode,
            pos: 0,
            capacity: self.capacity,
        }))
    }

    fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        let normalized = Self::normalize(path);
        let entries = read_lock(&self.entries)?;
        let name = normalized
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match entries.get(&normalized) {
            Some(Entry::File { data, modified }) => {
                Ok(DirEntry::file(name, data.len() as u64).with_modified(*modified))
            }
            Some(Entry::Directory { modified }) => {
                Ok(DirEntry::directory(name).with_modified(*modified))
            }
            None => Err(not_found(path)),
        }
    }

    fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let normalized = Self::normalize(path);
        let entries = read_lock(&self.entries)?;

        match entries.get(&normalized) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", path.display()),
                ));
            }
            None => return Err(not_found(path)),
        }

        let mut result = Vec::new();
        for (entry_path, entry) in entries.iter() {
            if entry_path.parent() != Some(normalized.as_path()) || entry_path == &normalized {
                continue;
            }
            let Some(name) = entry_path.file_name() else {
                continue;
            };
            let name = name.to_string_lossy().into_owned();
            result.push(match entry {
                Entry::File { data, modified } => {
                    DirEntry::file(name, data.len() as u64).with_modified(*modified)
                }
                Entry::Directory { modified } => DirEntry::directory(name).with_modified(*modified),
            });
        }

        // Sort for consistent ordering
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        let normalized = Self::normalize(path);
        let mut entries = write_lock(&self.entries)?;

        if let Some(existing) = entries.get(&normalized) {
            return match existing {
                Entry::Directory { .. } => Ok(()),
                Entry::File { .. } => Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("file exists: {}", path.display()),
                )),
            };
        }

        Self::ensure_parents(&mut entries, &normalized)?;
        entries.insert(
            normalized,
            Entry::Directory {
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let normalized = Self::normalize(path);
        let mut entries = write_lock(&self.entries)?;

        file_data(&entries, &normalized)?;
        entries.remove(&normalized);
        Ok(())
    }

    fn rmdir(&self, path: &Path) -> io::Result<()> {
        let normalized = Self::normalize(path);

        if normalized.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove root directory",
            ));
        }

        let mut entries = write_lock(&self.entries)?;
        match entries.get(&normalized) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", path.display()),
                ));
            }
            None => return Err(not_found(path)),
        }

        if has_children(&entries, &normalized) {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("directory not empty: {}", path.display()),
            ));
        }

        entries.remove(&normalized);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_n = Self::normalize(from);
        let to_n = Self::normalize(to);

        if from_n.as_os_str().is_empty() || to_n.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot rename root directory",
            ));
        }

        let mut entries = write_lock(&self.entries)?;

        let source_is_dir = match entries.get(&from_n) {
            Some(Entry::Directory { .. }) => true,
            Some(Entry::File { .. }) => false,
            None => return Err(not_found(from)),
        };
        if from_n == to_n {
            return Ok(());
        }
        if source_is_dir && to_n.starts_with(&from_n) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot move {} into itself", from.display()),
            ));
        }

        match (entries.get(&to_n), source_is_dir) {
            (Some(Entry::Directory { .. }), _) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("directory exists: {}", to.display()),
                ));
            }
            (Some(Entry::File { .. }), true) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", to.display()),
                ));
            }
            _ => {}
        }

        let parent_ok = match to_n.parent() {
            Some(parent) => matches!(entries.get(parent), Some(Entry::Directory { .. })),
            None => true,
        };
        if !parent_ok {
            return Err(not_found(to));
        }

        // Move the entry and, for directories, everything beneath it.
        let moved: Vec<PathBuf> = entries
            .keys()
            .filter(|k| k.starts_with(&from_n))
            .cloned()
            .collect();
        for old in moved {
            if let Some(entry) = entries.remove(&old) {
                let new = match old.strip_prefix(&from_n) {
                    Ok(rest) if !rest.as_os_str().is_empty() => to_n.join(rest),
                    _ => to_n.clone(),
                };
                entries.insert(new, entry);
            }
        }
        Ok(())
    }

    fn total_bytes(&self) -> io::Result<u64> {
        Ok(self.capacity)
    }

    fn used_bytes(&self) -> io::Result<u64> {
        let entries = read_lock(&self.entries)?;
        Ok(used(&entries))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Handle onto one [`MemoryFs`] file.
#[derive(Debug)]
struct MemoryFile {
    entries: Entries,
    path: PathBuf,
    mode: OpenMode,
    pos: usize,
    capacity: u64,
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.mode.is_write() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file not opened for reading",
            ));
        }
        let entries = read_lock(&self.entries)?;
        let data = file_data(&entries, &self.path)?;

        let start = self.pos.min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos = start + n;
        Ok(n)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.mode.is_write() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file not opened for writing",
            ));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let mut entries = write_lock(&self.entries)?;
        let current_len = file_data(&entries, &self.path)?.len();
        let end = self.pos + buf.len();
        let growth = end.saturating_sub(current_len) as u64;
        if used(&entries).saturating_add(growth) > self.capacity {
            return Err(io::Error::new(
                io::ErrorKind::StorageFull,
                format!("no space left writing {}", self.path.display()),
            ));
        }

        if let Some(Entry::File { data, modified }) = entries.get_mut(&self.path) {
            if data.len() < end {
                data.resize(end, 0);
            }
            data[self.pos..end].copy_from_slice(buf);
            *modified = SystemTime::now();
        }
        self.pos = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FileHandle for MemoryFile {
    fn size(&self) -> io::Result<u64> {
        let entries = read_lock(&self.entries)?;
        Ok(file_data(&entries, &self.path)?.len() as u64)
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }
}
