//! Removable-backend presence detection.
//!
//! A probe answers one question: can the card be touched right now? It must
//! be cheap and side-effect free, because the router asks before every
//! removable-backend call.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Answers whether the removable backend is present and initialized.
pub trait CapabilityProbe: Send + Sync {
    fn is_present(&self) -> bool;
}

impl<P: CapabilityProbe + ?Sized> CapabilityProbe for Arc<P> {
    fn is_present(&self) -> bool {
        (**self).is_present()
    }
}

/// A probe for boards with no card slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Absent;

impl CapabilityProbe for Absent {
    fn is_present(&self) -> bool {
        false
    }
}

/// Software card-detect line.
///
/// Driven by whatever watches the slot (an interrupt handler, a mount
/// notification, a test). Share it behind an `Arc` to flip it while the
/// router holds it.
#[derive(Debug, Default)]
pub struct CardDetect {
    present: AtomicBool,
}

impl CardDetect {
    pub fn new(present: bool) -> Self {
        Self {
            present: AtomicBool::new(present),
        }
    }

    pub fn insert(&self) {
        self.present.store(true, Ordering::SeqCst);
    }

    pub fn eject(&self) {
        self.present.store(false, Ordering::SeqCst);
    }
}

impl CapabilityProbe for CardDetect {
    fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }
}

/// Present iff a directory exists, e.g. the card's host mount point.
#[derive(Debug, Clone)]
pub struct MountPointProbe {
    root: PathBuf,
}

impl MountPointProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CapabilityProbe for MountPointProbe {
    fn is_present(&self) -> bool {
        self.root.is_dir()
    }
}

/// Remembers the first answer of an expensive probe for its own lifetime.
///
/// Only for slots known to be stable while the device runs; a cached probe
/// never notices an eject.
#[derive(Debug)]
pub struct Cached<P> {
    inner: P,
    answer: OnceLock<bool>,
}

impl<P: CapabilityProbe> Cached<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            answer: OnceLock::new(),
        }
    }
}

impl<P: CapabilityProbe> CapabilityProbe for Cached<P> {
    fn is_present(&self) -> bool {
        *self.answer.get_or_init(|| self.inner.is_present())
    }
}
