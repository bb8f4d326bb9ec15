//! Free-space checks consulted before each source is ingested.

use std::io;
use std::path::{Path, PathBuf};

pub trait StorageProbe: Send + Sync {
    /// Bytes available to this process on the volume holding the index.
    fn available_bytes(&self) -> io::Result<u64>;
}

/// Probes the filesystem containing `path` (or its nearest existing ancestor).
pub struct DiskProbe {
    path: PathBuf,
}

impl DiskProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Probe for a database file path, checking its parent directory.
    pub fn for_database(db_path: &Path) -> Self {
        Self::new(db_path.parent().unwrap_or(db_path))
    }
}

impl StorageProbe for DiskProbe {
    fn available_bytes(&self) -> io::Result<u64> {
        let existing = self
            .path
            .ancestors()
            .find(|p| p.exists())
            .unwrap_or_else(|| Path::new("."));
        fs2::available_space(existing)
    }
}

/// Never reports exhaustion. Used for in-memory indexes.
pub struct UnlimitedProbe;

impl StorageProbe for UnlimitedProbe {
    fn available_bytes(&self) -> io::Result<u64> {
        Ok(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_probe_reports_space_for_missing_child() {
        let dir = tempfile::tempdir().unwrap();
        let probe = DiskProbe::for_database(&dir.path().join("not/yet/created/index.db"));
        assert!(probe.available_bytes().unwrap() > 0);
    }
}
