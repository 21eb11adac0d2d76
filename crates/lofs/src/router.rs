//! Prefix-routed dispatch over the internal and removable backends.
//!
//! Every operation goes through the same three steps: parse the path, make
//! sure its backend is usable, then forward the stripped path. A path that
//! fails either check never reaches any backend.

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use lofs_types::{
    BackendTag, DirEntry, IntoOpenMode, LofsError, LofsResult, MoveOutcome, SpaceInfo,
};

#[cfg(feature = "removable")]
use crate::probe::{CapabilityProbe, Cached};

use crate::config::RouterConfig;
use crate::file::File;
use crate::mover;
use crate::prefix::PrefixParser;
use crate::vfs::Filesystem;

/// A parsed path bound to a usable backend.
pub(crate) struct Route<'r, 'p> {
    pub(crate) tag: BackendTag,
    pub(crate) fs: &'r dyn Filesystem,
    pub(crate) path: &'p Path,
}

impl Route<'_, '_> {
    /// Wrap a backend error for this route.
    pub(crate) fn fail(&self, op: &'static str, err: io::Error) -> LofsError {
        tracing::debug!(backend = %self.tag, op, path = %self.path.display(), error = %err, "backend operation failed");
        LofsError::backend(self.tag, op, err)
    }
}

#[cfg(feature = "removable")]
struct RemovableSlot {
    fs: Arc<dyn Filesystem>,
    /// The probe as attached.
    probe: Arc<dyn CapabilityProbe>,
    /// What routing consults: `probe`, or `probe` behind [`Cached`].
    active: Arc<dyn CapabilityProbe>,
}

#[cfg(feature = "removable")]
impl RemovableSlot {
    fn new(fs: Arc<dyn Filesystem>, probe: Arc<dyn CapabilityProbe>, cache: bool) -> Self {
        let mut slot = Self {
            fs,
            active: Arc::clone(&probe),
            probe,
        };
        slot.apply_cache(cache);
        slot
    }

    /// Rebuild `active` from the attached probe. A fresh cache forgets any
    /// earlier answer.
    fn apply_cache(&mut self, cache: bool) {
        self.active = if cache {
            Arc::new(Cached::new(Arc::clone(&self.probe)))
        } else {
            Arc::clone(&self.probe)
        };
    }
}

/// Filesystem facade routing `/lfs/...` to internal flash and `/sd/...` to
/// the removable card.
///
/// Stateless apart from its backends: no handle, path or answer outlives
/// the call that produced it (unless capability caching is configured).
/// Backends are not reentrant; callers sharing a router across threads
/// must serialize calls themselves.
pub struct PathRouter {
    internal: Arc<dyn Filesystem>,
    #[cfg(feature = "removable")]
    removable: Option<RemovableSlot>,
    parser: PrefixParser,
    config: RouterConfig,
}

impl fmt::Debug for PathRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PathRouter");
        s.field("internal", &self.internal.name());
        #[cfg(feature = "removable")]
        s.field("removable", &self.removable.as_ref().map(|slot| slot.fs.name()));
        s.field("config", &self.config).finish()
    }
}

impl PathRouter {
    /// Create a router over the internal backend only, with default config.
    pub fn new(internal: impl Filesystem + 'static) -> Self {
        Self::from_arc(Arc::new(internal))
    }

    /// Create a router over an internal backend already wrapped in `Arc`.
    pub fn from_arc(internal: Arc<dyn Filesystem>) -> Self {
        let config = RouterConfig::default();
        Self {
            internal,
            #[cfg(feature = "removable")]
            removable: None,
            parser: PrefixParser::new(config.prefix_policy, config.max_path_len),
            config,
        }
    }

    /// Attach the removable backend and the probe that says when it is usable.
    #[cfg(feature = "removable")]
    pub fn with_removable(
        mut self,
        fs: impl Filesystem + 'static,
        probe: impl CapabilityProbe + 'static,
    ) -> Self {
        self.removable = Some(RemovableSlot::new(
            Arc::new(fs),
            Arc::new(probe),
            self.config.cache_capability,
        ));
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.parser = PrefixParser::new(config.prefix_policy, config.max_path_len);
        #[cfg(feature = "removable")]
        {
            if let Some(slot) = self.removable.as_mut() {
                slot.apply_cache(config.cache_capability);
            }
        }
        self.config = config;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Whether the removable backend is compiled in, attached and present.
    ///
    /// Safe to call at any time. Without the `removable` feature this is
    /// always false and touches nothing.
    pub fn is_removable_available(&self) -> bool {
        self.backend(BackendTag::Removable).is_some()
    }

    /// Which backend a path addresses, regardless of availability.
    pub fn backend_of(&self, path: &str) -> BackendTag {
        self.parser.classify(path)
    }

    /// The backend behind `tag`, if it can be used right now.
    fn backend(&self, tag: BackendTag) -> Option<&dyn Filesystem> {
        match tag {
            BackendTag::Internal => Some(self.internal.as_ref()),
            BackendTag::Removable => self.removable_fs(),
            BackendTag::Invalid => None,
        }
    }

    #[cfg(feature = "removable")]
    fn removable_fs(&self) -> Option<&dyn Filesystem> {
        let slot = self.removable.as_ref()?;
        if slot.active.is_present() {
            Some(slot.fs.as_ref())
        } else {
            None
        }
    }

    #[cfg(not(feature = "removable"))]
    fn removable_fs(&self) -> Option<&dyn Filesystem> {
        None
    }

    /// Parse `path` and bind it to its backend, failing closed.
    pub(crate) fn route<'p>(&self, path: &'p str, op: &'static str) -> LofsResult<Route<'_, 'p>> {
        let parsed = self.parser.parse(path).inspect_err(|e| {
            tracing::debug!(op, path, error = %e, "rejected");
        })?;

        let Some(fs) = self.backend(parsed.tag) else {
            tracing::debug!(op, path, backend = %parsed.tag, "rejected: backend unavailable");
            return Err(LofsError::BackendUnavailable(parsed.tag));
        };

        tracing::trace!(op, backend = %parsed.tag, stripped = parsed.stripped, "routed");
        Ok(Route {
            tag: parsed.tag,
            fs,
            path: Path::new(parsed.stripped),
        })
    }

    /// Open a file.
    ///
    /// `mode` may be an [`OpenMode`](lofs_types::OpenMode), a numeric flag
    /// ([`FILE_O_READ`](lofs_types::FILE_O_READ) /
    /// [`FILE_O_WRITE`](lofs_types::FILE_O_WRITE)) or a mode string
    /// (`"r"`, `"w"`).
    pub fn open(&self, path: &str, mode: impl IntoOpenMode) -> LofsResult<File> {
        let mode = mode.into_open_mode()?;
        let route = self.route(path, "open")?;
        let handle = route
            .fs
            .open(route.path, mode)
            .map_err(|e| route.fail("open", e))?;
        Ok(File::new(handle, route.tag, path))
    }

    /// Check if a file or directory exists. False for unroutable paths.
    pub fn exists(&self, path: &str) -> bool {
        match self.route(path, "exists") {
            Ok(route) => route.fs.exists(route.path),
            Err(_) => false,
        }
    }

    /// Get metadata for a file or directory.
    pub fn stat(&self, path: &str) -> LofsResult<DirEntry> {
        let route = self.route(path, "stat")?;
        route.fs.stat(route.path).map_err(|e| route.fail("stat", e))
    }

    /// List a directory.
    pub fn list(&self, path: &str) -> LofsResult<Vec<DirEntry>> {
        let route = self.route(path, "list")?;
        route.fs.list(route.path).map_err(|e| route.fail("list", e))
    }

    /// Create a directory and any missing parents.
    pub fn mkdir(&self, path: &str) -> LofsResult<()> {
        let route = self.route(path, "mkdir")?;
        route.fs.mkdir(route.path).map_err(|e| route.fail("mkdir", e))
    }

    /// Remove a file.
    pub fn remove(&self, path: &str) -> LofsResult<()> {
        let route = self.route(path, "remove")?;
        route
            .fs
            .remove(route.path)
            .map_err(|e| route.fail("remove", e))
    }

    /// Remove an empty directory.
    pub fn rmdir(&self, path: &str) -> LofsResult<()> {
        let route = self.route(path, "rmdir")?;
        route.fs.rmdir(route.path).map_err(|e| route.fail("rmdir", e))
    }

    /// Rename a file, moving it between backends when the prefixes differ.
    ///
    /// Both paths must route to usable backends before anything happens.
    /// On one backend this is the backend's own rename. Across backends the
    /// file is copied and the source deleted; see [`MoveOutcome`].
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rename(&self, from: &str, to: &str) -> LofsResult<MoveOutcome> {
        let src = self.route(from, "rename")?;
        let dst = self.route(to, "rename")?;

        if src.tag == dst.tag {
            src.fs
                .rename(src.path, dst.path)
                .map_err(|e| src.fail("rename", e))?;
            return Ok(MoveOutcome::Renamed);
        }

        mover::move_across(&src, &dst, self.config.copy_chunk_size)
    }

    /// Space figures for the backend `path` selects.
    ///
    /// `free` is computed here as `total - used`. If either figure is
    /// missing, or `used` exceeds `total`, the whole query fails.
    pub fn space(&self, path: &str) -> LofsResult<SpaceInfo> {
        let route = self.route(path, "space")?;
        let total = route
            .fs
            .total_bytes()
            .map_err(|e| route.fail("total_bytes", e))?;
        let used = route
            .fs
            .used_bytes()
            .map_err(|e| route.fail("used_bytes", e))?;
        SpaceInfo::from_parts(total, used).ok_or_else(|| {
            route.fail(
                "space",
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("used {used} exceeds total {total}"),
                ),
            )
        })
    }

    /// Total bytes of the selected backend, 0 if unavailable.
    pub fn total_bytes(&self, path: &str) -> u64 {
        self.space(path)
            .unwrap_or_else(|_| SpaceInfo::unavailable())
            .total
    }

    /// Used bytes of the selected backend, 0 if unavailable.
    pub fn used_bytes(&self, path: &str) -> u64 {
        self.space(path)
            .unwrap_or_else(|_| SpaceInfo::unavailable())
            .used
    }

    /// Free bytes of the selected backend, 0 if unavailable.
    pub fn free_bytes(&self, path: &str) -> u64 {
        self.space(path)
            .unwrap_or_else(|_| SpaceInfo::unavailable())
            .free
    }
}
