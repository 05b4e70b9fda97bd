use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// One built report and the moment it was built.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub data: T,
    pub built_at: DateTime<Utc>,
}

/// Holds a report derived from loaded data until it is explicitly
/// invalidated or rebuilt. Owned by the caller and passed by reference.
#[derive(Debug, Clone)]
pub struct ReportCache<T> {
    entry: Option<CacheEntry<T>>,
}

impl<T> Default for ReportCache<T> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<T> ReportCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&CacheEntry<T>> {
        self.entry.as_ref()
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().map(|e| e.built_at)
    }

    /// Cached data, building it first if the cache is empty.
    pub fn get_or_build(&mut self, build: impl FnOnce() -> T) -> &T {
        let entry = self.entry.get_or_insert_with(|| CacheEntry {
            data: build(),
            built_at: Utc::now(),
        });
        &entry.data
    }

    /// Replace the cached data unconditionally.
    pub fn rebuild(&mut self, build: impl FnOnce() -> T) -> &T {
        self.rebuild_at(build, Utc::now())
    }

    pub fn rebuild_at(&mut self, build: impl FnOnce() -> T, now: DateTime<Utc>) -> &T {
        let entry = self.entry.insert(CacheEntry {
            data: build(),
            built_at: now,
        });
        debug!(built_at = %now, "report cache rebuilt");
        &entry.data
    }

    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            debug!("report cache invalidated");
        }
    }

    /// An empty cache is always stale.
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match &self.entry {
            Some(entry) => now - entry.built_at > max_age,
            None => true,
        }
    }
}
