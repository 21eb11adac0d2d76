//! Filesystem space accounting.

/// Total, used and free bytes of one backend.
///
/// `free` is always derived as `total - used`; backends only report the
/// first two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpaceInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

impl SpaceInfo {
    /// Build from the two backend-reported figures.
    ///
    /// Returns `None` if `used` exceeds `total`; a negative or wrapped free
    /// figure is never produced.
    pub fn from_parts(total: u64, used: u64) -> Option<Self> {
        let free = total.checked_sub(used)?;
        Some(Self { total, used, free })
    }

    /// All zeros, the "unavailable" answer.
    pub fn unavailable() -> Self {
        Self::default()
    }
}
