//! Caller-owned file handles.

use std::fmt;
use std::io::{self, Read, Write};

use lofs_types::{BackendTag, OpenMode};

use crate::vfs::FileHandle;

/// An open file returned by [`PathRouter::open`](crate::PathRouter::open).
///
/// The caller owns it; the router keeps no reference. Dropping it closes the
/// file, [`File::close`] does the same but reports a failed final flush.
pub struct File {
    inner: Box<dyn FileHandle>,
    backend: BackendTag,
    path: String,
}

impl File {
    pub(crate) fn new(inner: Box<dyn FileHandle>, backend: BackendTag, path: &str) -> Self {
        Self {
            inner,
            backend,
            path: path.to_string(),
        }
    }

    /// Backend the file lives on.
    pub fn backend(&self) -> BackendTag {
        self.backend
    }

    /// Facade path the file was opened with, prefix included.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.inner.mode()
    }

    /// Current size in bytes.
    pub fn size(&self) -> io::Result<u64> {
        self.inner.size()
    }

    /// Flush and close.
    pub fn close(mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Read for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for File {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path)
            .field("backend", &self.backend)
            .field("mode", &self.inner.mode())
            .finish()
    }
}
