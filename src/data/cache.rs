//! Load Cache Module
//! Keyed memoization of loaded tables for the lifetime of the owner.

use crate::data::loader::{DataLoader, DataSource};
use crate::data::model::CollisionTable;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Identifies the loader logic a cached table was produced by.
pub const LOADER_REVISION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: DataSource,
    pub row_limit: Option<usize>,
    pub revision: &'static str,
}

impl CacheKey {
    pub fn new(source: DataSource, row_limit: Option<usize>) -> Self {
        Self {
            source,
            row_limit,
            revision: LOADER_REVISION,
        }
    }
}

/// Memoizes [`DataLoader::load`] results by source and row limit.
///
/// The source is treated as static: an entry is never refreshed unless the
/// cache is cleared. Failed loads are not cached.
#[derive(Debug, Default)]
pub struct LoadCache {
    loader: DataLoader,
    entries: Mutex<HashMap<CacheKey, Arc<CollisionTable>>>,
}

impl LoadCache {
    pub fn new(loader: DataLoader) -> Self {
        Self {
            loader,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached table for this source and limit, loading it on first use.
    pub fn get_or_load(
        &self,
        source: &DataSource,
        row_limit: Option<usize>,
    ) -> Result<Arc<CollisionTable>> {
        let key = CacheKey::new(source.clone(), row_limit);
        self.get_or_insert_with(key, || self.loader.load(source, row_limit))
    }

    /// The lock is held across `load` so a key is loaded at most once.
    fn get_or_insert_with<F>(&self, key: CacheKey, load: F) -> Result<Arc<CollisionTable>>
    where
        F: FnOnce() -> Result<CollisionTable>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = entries.get(&key) {
            tracing::debug!(source = %key.source, row_limit = ?key.row_limit, "Load cache hit");
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(load()?);
        entries.insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
