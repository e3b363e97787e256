//! Disk capacity measurement for the eviction threshold.

use std::io;
use std::path::Path;

/// A point-in-time capacity reading of the filesystem holding a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    /// Total capacity in bytes.
    pub total: u64,
    /// Space currently available to the process in bytes.
    pub free: u64,
}

/// Measures filesystem capacity. The production implementation asks the
/// OS; tests script readings to drive eviction deterministically.
pub trait DiskGauge: Send {
    fn measure(&self, path: &Path) -> io::Result<DiskSpace>;
}

/// `DiskGauge` backed by statvfs (via the `fs2` crate).
pub struct StatvfsGauge;

impl DiskGauge for StatvfsGauge {
    fn measure(&self, path: &Path) -> io::Result<DiskSpace> {
        let total = fs2::total_space(path)?;
        let free = fs2::available_space(path)?;
        Ok(DiskSpace { total, free })
    }
}
