//! Per-dimension cache of loaded embedding tables.
//!
//! Each dimension is loaded at most once for the lifetime of the cache. The
//! map lock is only held while fetching the per-dimension cell; the load
//! itself runs inside that cell, so concurrent requests for the same dimension
//! wait for the single load while other dimensions proceed independently.

use super::loader::{EmbeddingTable, TableLoader};
use crate::error::LayerError;
use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

type TableCell = Arc<OnceCell<Arc<EmbeddingTable>>>;

/// Load-once cache of embedding tables keyed by dimension.
///
/// # Examples
///
/// ```ignore
/// let cache = Arc::new(EmbeddingTableCache::new());
/// let loader = NpyTableLoader::new("glove/glove.%d.npy")?;
///
/// let a = cache.get_or_load(100, &loader)?;
/// let b = cache.get_or_load(100, &loader)?;
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(cache.load_count(), 1);
/// ```
#[derive(Default)]
pub struct EmbeddingTableCache {
    tables: Mutex<HashMap<usize, TableCell>>,
    loads: AtomicUsize,
}

impl EmbeddingTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table for `dimension`, loading it through `loader` if absent.
    ///
    /// A failed load leaves the slot empty, so a later call may try again.
    pub fn get_or_load(
        &self,
        dimension: usize,
        loader: &dyn TableLoader,
    ) -> Result<Arc<EmbeddingTable>, LayerError> {
        let cell = {
            let mut tables = self.lock_tables()?;
            tables.entry(dimension).or_default().clone()
        };

        if let Some(table) = cell.get() {
            debug!("Embedding table cache hit for dimension {}", dimension);
            return Ok(table.clone());
        }

        let table = cell.get_or_try_init(|| {
            info!("Loading embedding table for dimension {}", dimension);
            let weights = loader.load(dimension)?;
            let table = EmbeddingTable::new(dimension, weights)?;
            self.loads.fetch_add(1, Ordering::SeqCst);
            info!(
                "Loaded {}x{} embedding table",
                table.vocab_size(),
                table.dimension()
            );
            Ok::<_, LayerError>(Arc::new(table))
        })?;

        Ok(table.clone())
    }

    /// Number of successful loads performed by this cache.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Whether a table for `dimension` has been loaded.
    pub fn contains(&self, dimension: usize) -> Result<bool, LayerError> {
        let tables = self.lock_tables()?;
        Ok(tables.get(&dimension).is_some_and(|c| c.get().is_some()))
    }

    /// Number of loaded tables.
    pub fn len(&self) -> Result<usize, LayerError> {
        let tables = self.lock_tables()?;
        Ok(tables.values().filter(|c| c.get().is_some()).count())
    }

    pub fn is_empty(&self) -> Result<bool, LayerError> {
        Ok(self.len()? == 0)
    }

    fn lock_tables(&self) -> Result<MutexGuard<'_, HashMap<usize, TableCell>>, LayerError> {
        self.tables
            .lock()
            .map_err(|e| LayerError::LockPoisoned(e.to_string()))
    }
}

static GLOBAL_TABLE_CACHE: Lazy<EmbeddingTableCache> = Lazy::new(EmbeddingTableCache::new);

/// Get the process-wide table cache.
pub fn global_table_cache() -> &'static EmbeddingTableCache {
    &GLOBAL_TABLE_CACHE
}
