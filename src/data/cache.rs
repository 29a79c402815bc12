use crate::data::{load_record_set, DataError, RecordSet};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Loaded record sets keyed by source path.
/// Each path is loaded at most once until explicitly invalidated.
#[derive(Default)]
pub struct GeometryCache {
    entries: HashMap<PathBuf, Arc<RecordSet>>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached set for `path`, reading it from disk on first use
    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<RecordSet>, DataError> {
        self.get_or_try_insert_with(path, || load_record_set(path))
    }

    /// Return the cached set for `key`, building it with `load` on a miss.
    /// A failed load caches nothing.
    pub fn get_or_try_insert_with<F>(&mut self, key: &Path, load: F) -> Result<Arc<RecordSet>, DataError>
    where
        F: FnOnce() -> Result<RecordSet, DataError>,
    {
        if let Some(set) = self.entries.get(key) {
            debug!(path = %key.display(), "cache hit");
            return Ok(Arc::clone(set));
        }

        let set = Arc::new(load()?);
        self.entries.insert(key.to_path_buf(), Arc::clone(&set));
        Ok(set)
    }

    /// Drop a cached entry so the next lookup reloads it
    pub fn invalidate(&mut self, key: &Path) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            info!(path = %key.display(), "invalidated cached record set");
        }
        removed
    }

    pub fn contains(&self, key: &Path) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_loads_once_per_key() {
        let mut cache = GeometryCache::new();
        let loads = Cell::new(0);
        let load = || -> Result<RecordSet, DataError> {
            loads.set(loads.get() + 1);
            Ok(RecordSet::default())
        };

        let a = cache.get_or_try_insert_with(Path::new("a"), load).unwrap();
        let b = cache.get_or_try_insert_with(Path::new("a"), load).unwrap();
        assert_eq!(loads.get(), 1);
        assert!(Arc::ptr_eq(&a, &b));

        cache.get_or_try_insert_with(Path::new("b"), load).unwrap();
        assert_eq!(loads.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_load_not_cached() {
        let mut cache = GeometryCache::new();
        let result = cache.get_or_try_insert_with(Path::new("bad"), || Err(DataError::NotFeatureCollection));
        assert!(result.is_err());
        assert!(!cache.contains(Path::new("bad")));
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let mut cache = GeometryCache::new();
        cache
            .get_or_try_insert_with(Path::new("a"), || Ok(RecordSet::default()))
            .unwrap();
        assert!(cache.invalidate(Path::new("a")));
        assert!(!cache.invalidate(Path::new("a")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut cache = GeometryCache::new();
        let result = cache.get_or_load(Path::new("/nonexistent/dataset.geojson"));
        assert!(matches!(result, Err(DataError::Io { .. })));
    }
}
