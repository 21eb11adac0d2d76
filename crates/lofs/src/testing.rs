//! Test utilities: a call-counting, fault-injecting backend.

use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lofs_types::{DirEntry, OpenMode};

use crate::vfs::{FileHandle, Filesystem, MemoryFs};

/// Failures a [`MockFs`] injects.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// `open` for write fails.
    pub fail_open_write: bool,
    /// Writes fail once this many bytes have gone through a handle.
    pub fail_write_after: Option<u64>,
    /// `remove` fails.
    pub fail_remove: bool,
    /// `used_bytes` fails.
    pub fail_used_bytes: bool,
    /// `used_bytes` reports this instead of the real figure.
    pub used_override: Option<u64>,
}

/// Mock backend that counts every call and can be told to fail.
///
/// Storage is a [`MemoryFs`]. [`MockFs::seed`] and [`MockFs::contents`] go
/// straight to it and are not counted.
pub struct MockFs {
    inner: MemoryFs,
    call_count: Arc<AtomicUsize>,
    faults: Faults,
}

impl MockFs {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> (Self, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner: MemoryFs::with_capacity(4096),
                call_count: count.clone(),
                faults,
            },
            count,
        )
    }

    /// Write a file directly into the backing store.
    pub fn seed(&self, path: &str, data: &[u8]) {
        let mut f = self
            .inner
            .open(Path::new(path), OpenMode::Write)
            .expect("seed open");
        f.write_all(data).expect("seed write");
    }

    /// Read a file directly from the backing store.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let mut f = self.inner.open(Path::new(path), OpenMode::Read).ok()?;
        let mut out = Vec::new();
        f.read_to_end(&mut out).ok()?;
        Some(out)
    }

    fn hit(&self) {
        self.call_count.fetch_add(1, Ordering::SeqCst);
    }
}

impl Filesystem for MockFs {
    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn FileHandle>> {
        self.hit();
        if mode.is_write() && self.faults.fail_open_write {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected open failure",
            ));
        }
        let handle = self.inner.open(path, mode)?;
        Ok(Box::new(FaultyFile {
            inner: handle,
            remaining: self.faults.fail_write_after,
        }))
    }

    fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        self.hit();
        self.inner.stat(path)
    }

    fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.hit();
        self.inner.list(path)
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        self.hit();
        self.inner.mkdir(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.hit();
        if self.faults.fail_remove {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected remove failure",
            ));
        }
        self.inner.remove(path)
    }

    fn rmdir(&self, path: &Path) -> io::Result<()> {
        self.hit();
        self.inner.rmdir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.hit();
        self.inner.rename(from, to)
    }

    fn total_bytes(&self) -> io::Result<u64> {
        self.hit();
        self.inner.total_bytes()
    }

    fn used_bytes(&self) -> io::Result<u64> {
        self.hit();
        if self.faults.fail_used_bytes {
            return Err(io::Error::other("injected space failure"));
        }
        match self.faults.used_override {
            Some(used) => Ok(used),
            None => self.inner.used_bytes(),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Handle that stops accepting writes after a byte budget.
#[derive(Debug)]
struct FaultyFile {
    inner: Box<dyn FileHandle>,
    remaining: Option<u64>,
}

impl Read for FaultyFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for FaultyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(remaining) = self.remaining else {
            return self.inner.write(buf);
        };
        if remaining == 0 && !buf.is_empty() {
            return Err(io::Error::other("injected write failure"));
        }
        let allowed = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = self.inner.write(&buf[..allowed])?;
        self.remaining = Some(remaining - n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl FileHandle for FaultyFile {
    fn size(&self) -> io::Result<u64> {
        self.inner.size()
    }

    fn mode(&self) -> OpenMode {
        self.inner.mode()
    }
}
