use anyhow::{Context, Result};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tracing::debug;

use crate::history::store::{read_dataset, Dataset};

/// Monotonic counter tagging each load; only the newest one may publish.
#[derive(Debug, Clone, Default)]
pub struct GenerationGate {
    latest: Arc<AtomicU64>,
}

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation and return its number.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest() == generation
    }
}

/// Loads source data off the async runtime. A load that finishes after a
/// newer one has started resolves to `None`.
#[derive(Debug, Clone, Default)]
pub struct SourceLoader {
    gate: GenerationGate,
}

impl SourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(&self) -> &GenerationGate {
        &self.gate
    }

    /// Read a dataset file; a file that does not exist yet loads as empty.
    pub async fn load_dataset(&self, path: PathBuf) -> Result<Option<Dataset>> {
        self.load_with(move || Ok(read_dataset(&path)?.unwrap_or_default()))
            .await
    }

    pub async fn load_with<T, F>(&self, work: F) -> Result<Option<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let generation = self.gate.begin();
        let data = tokio::task::spawn_blocking(work)
            .await
            .context("loader task panicked")??;

        if !self.gate.is_current(generation) {
            debug!(
                generation,
                latest = self.gate.latest(),
                "discarding superseded load"
            );
            return Ok(None);
        }
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, time::Duration};

    #[tokio::test]
    async fn superseded_load_is_discarded() -> Result<()> {
        let loader = SourceLoader::new();
        let slow = loader.load_with(|| {
            std::thread::sleep(Duration::from_millis(150));
            Ok("old filter")
        });
        let fast = loader.load_with(|| Ok("new filter"));

        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(slow?, None);
        assert_eq!(fast?, Some("new filter"));
        assert_eq!(loader.gate().latest(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn loads_dataset_from_disk() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("accumulated.csv");
        fs::write(&path, "month,affiliate\n2024-01,acme\n")?;

        let loader = SourceLoader::new();
        let dataset = loader.load_dataset(path).await?.expect("latest load");
        assert_eq!(dataset.fields, vec!["month", "affiliate"]);
        assert_eq!(dataset.rows.len(), 1);

        let missing = loader
            .load_dataset(tmp.path().join("nothing.csv"))
            .await?
            .expect("latest load");
        assert!(missing.rows.is_empty());
        Ok(())
    }

    #[test]
    fn generations_increase() {
        let gate = GenerationGate::new();
        let a = gate.begin();
        let b = gate.begin();
        assert!(b > a);
        assert!(gate.is_current(b));
        assert!(!gate.is_current(a));
    }
}
