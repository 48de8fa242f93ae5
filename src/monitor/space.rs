//! Space Inspector: reads volume usage for the target and classifies free
//! space into Critical / Warning / Normal bands.

#![allow(missing_docs)]

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TidyError};

/// One gibibyte.
pub const GIB: u64 = 1_073_741_824;

/// Below this much available space the volume is Critical.
pub const CRITICAL_BELOW_BYTES: u64 = GIB;

/// Below this much available space the volume is in Warning.
pub const WARNING_BELOW_BYTES: u64 = 5 * GIB;

/// Free-space band. Thresholds are half-open: exactly 1 GiB is Warning,
/// exactly 5 GiB is Normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Critical,
    Warning,
    Normal,
}

impl Band {
    #[must_use]
    pub const fn from_available(available_bytes: u64) -> Self {
        if available_bytes < CRITICAL_BELOW_BYTES {
            Self::Critical
        } else if available_bytes < WARNING_BELOW_BYTES {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Normal => "normal",
        })
    }
}

/// Raw volume statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsStats {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

/// Result of one inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceReading {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub band: Band,
}

/// Source of volume statistics.
pub trait SpaceProbe {
    fn fs_stats(&self, path: &Path) -> Result<FsStats>;
}

/// `statvfs(2)`-backed probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatvfsProbe;

impl SpaceProbe for StatvfsProbe {
    #[cfg(unix)]
    #[allow(clippy::useless_conversion)]
    fn fs_stats(&self, path: &Path) -> Result<FsStats> {
        let stat = nix::sys::statvfs::statvfs(path).map_err(|errno| TidyError::Inspection {
            path: path.to_path_buf(),
            details: errno.desc().to_string(),
        })?;
        let fragment = u64::from(stat.fragment_size());
        let blocks = u64::from(stat.blocks());
        let free = u64::from(stat.blocks_free());
        let available = u64::from(stat.blocks_available());
        Ok(FsStats {
            total_bytes: blocks.saturating_mul(fragment),
            used_bytes: blocks.saturating_sub(free).saturating_mul(fragment),
            available_bytes: available.saturating_mul(fragment),
        })
    }

    #[cfg(not(unix))]
    fn fs_stats(&self, path: &Path) -> Result<FsStats> {
        Err(TidyError::Inspection {
            path: path.to_path_buf(),
            details: "volume statistics are only supported on unix".to_string(),
        })
    }
}

/// Read the target's volume and classify it.
///
/// An inaccessible target is an [`TidyError::Inspection`] failure; callers
/// must not proceed to destructive work without a successful reading.
pub fn inspect(probe: &dyn SpaceProbe, target: &Path) -> Result<SpaceReading> {
    if let Err(err) = std::fs::metadata(target) {
        return Err(TidyError::Inspection {
            path: target.to_path_buf(),
            details: err.to_string(),
        });
    }
    let stats = probe.fs_stats(target)?;
    Ok(SpaceReading {
        total_bytes: stats.total_bytes,
        used_bytes: stats.used_bytes,
        available_bytes: stats.available_bytes,
        band: Band::from_available(stats.available_bytes),
    })
}
