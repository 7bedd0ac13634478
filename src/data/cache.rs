//! Dataset Cache
//! Holds the merged dataset between refreshes.

use crate::data::{LoaderError, MergedDataset, PermitLoader, TableSource};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    dataset: Arc<MergedDataset>,
    loaded_at: Instant,
}

/// Load-once cache over a table source, with manual invalidation and an
/// optional time-to-live. Failed loads are not cached.
pub struct DatasetCache<S: TableSource> {
    source: S,
    loader: PermitLoader,
    ttl: Option<Duration>,
    entry: Option<CacheEntry>,
}

impl<S: TableSource> DatasetCache<S> {
    pub fn new(source: S, loader: PermitLoader) -> Self {
        Self {
            source,
            loader,
            ttl: None,
            entry: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Return the cached dataset, loading it if absent or expired.
    pub fn get_or_load(&mut self) -> Result<Arc<MergedDataset>, LoaderError> {
        if self.is_expired() {
            log::info!("Cached dataset expired, reloading");
            self.entry = None;
        }

        if let Some(entry) = &self.entry {
            return Ok(Arc::clone(&entry.dataset));
        }

        let dataset = Arc::new(self.loader.load(&self.source)?);
        self.entry = Some(CacheEntry {
            dataset: Arc::clone(&dataset),
            loaded_at: Instant::now(),
        });
        Ok(dataset)
    }

    /// Drop the cached dataset so the next access reloads it.
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            log::info!("Dataset cache invalidated");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }

    /// True when a dataset is cached and older than the TTL.
    pub fn is_expired(&self) -> bool {
        match (&self.entry, self.ttl) {
            (Some(entry), Some(ttl)) => entry.loaded_at.elapsed() >= ttl,
            _ => false,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Swap the upstream source; the cached dataset belongs to the old one.
    pub fn replace_source(&mut self, source: S) {
        self.source = source;
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemorySource, TableName};
    use polars::prelude::*;
    use std::cell::Cell;

    struct CountingSource {
        inner: MemorySource,
        fetches: Cell<usize>,
    }

    impl TableSource for CountingSource {
        fn fetch(&self, name: &TableName) -> Result<DataFrame, LoaderError> {
            self.fetches.set(self.fetches.get() + 1);
            self.inner.fetch(name)
        }
    }

    fn counting_source() -> CountingSource {
        let permits = df!(
            "PERMIT_TYPE" => ["Electrical"],
            "CENSUS_TRACT" => ["1234.00"],
            "VALUATION" => ["$500"]
        )
        .unwrap();
        let census = df!(
            "CENSUS_TRACT" => [6_037_123_400i64],
            "AMI_CATEGORY" => ["Low Income"]
        )
        .unwrap();
        CountingSource {
            inner: MemorySource::new()
                .with_table("DB.PUBLIC.PERMITS", permits)
                .with_table("DB.PUBLIC.TRACTS", census),
            fetches: Cell::new(0),
        }
    }

    fn loader() -> PermitLoader {
        PermitLoader::new("DB.PUBLIC.PERMITS".into(), "DB.PUBLIC.TRACTS".into())
    }

    #[test]
    fn loads_once_until_invalidated() {
        let mut cache = DatasetCache::new(counting_source(), loader());
        assert!(!cache.is_loaded());

        let first = cache.get_or_load().unwrap();
        let second = cache.get_or_load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.source().fetches.get(), 2);

        cache.invalidate();
        assert!(!cache.is_loaded());
        let third = cache.get_or_load().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(cache.source().fetches.get(), 4);
    }

    #[test]
    fn zero_ttl_reloads_every_time() {
        let mut cache =
            DatasetCache::new(counting_source(), loader()).with_ttl(Some(Duration::ZERO));
        cache.get_or_load().unwrap();
        assert!(cache.is_expired());
        cache.get_or_load().unwrap();
        assert_eq!(cache.source().fetches.get(), 4);
    }

    #[test]
    fn failures_are_not_cached() {
        let source = CountingSource {
            inner: MemorySource::new(),
            fetches: Cell::new(0),
        };
        let mut cache = DatasetCache::new(source, loader());
        assert!(cache.get_or_load().is_err());
        assert!(!cache.is_loaded());
        assert!(cache.get_or_load().is_err());
        assert_eq!(cache.source().fetches.get(), 2);
    }
}
