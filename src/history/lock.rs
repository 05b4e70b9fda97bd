use anyhow::anyhow;
use chrono::Utc;
use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::error::IngestError;

/// Advisory single-writer lock around the read-merge-write cycle on one
/// canonical file. The lock file `<canonical>.lock` is removed on drop.
#[derive(Debug)]
pub struct IngestLock {
    path: PathBuf,
}

impl IngestLock {
    pub fn lock_path(canonical: &Path) -> PathBuf {
        let mut name = canonical
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        canonical.with_file_name(name)
    }

    pub fn acquire(canonical: &Path) -> Result<Self, IngestError> {
        let path = Self::lock_path(canonical);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                IngestError::Write(anyhow!("creating {}: {}", parent.display(), e))
            })?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(IngestError::Locked(canonical.to_path_buf()))
            }
            Err(e) => {
                return Err(IngestError::Write(anyhow!(
                    "creating lock {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        // holder info is only for humans inspecting a stale lock
        let _ = writeln!(file, "pid={} at={}", std::process::id(), Utc::now().to_rfc3339());
        debug!(lock = %path.display(), "acquired ingest lock");
        Ok(Self { path })
    }
}

impl Drop for IngestLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to release ingest lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_fails_until_first_is_dropped() {
        let tmp = tempdir().unwrap();
        let canonical = tmp.path().join("data.csv");

        let first = IngestLock::acquire(&canonical).unwrap();
        assert!(IngestLock::lock_path(&canonical).exists());
        let err = IngestLock::acquire(&canonical).unwrap_err();
        assert!(matches!(err, IngestError::Locked(_)));

        drop(first);
        assert!(!IngestLock::lock_path(&canonical).exists());
        assert!(IngestLock::acquire(&canonical).is_ok());
    }
}
