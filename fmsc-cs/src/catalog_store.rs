//! Shared catalog snapshot
//!
//! Handlers clone the inner `Arc<Catalog>` and rank against that snapshot;
//! reload validates the new file first and swaps the pointer in one write.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use fmsc_common::{Catalog, Result};
use tracing::info;

#[derive(Clone)]
pub struct CatalogStore {
    inner: Arc<RwLock<Arc<Catalog>>>,
    generation: Arc<AtomicU64>,
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(catalog: Catalog, path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(catalog))),
            generation: Arc::new(AtomicU64::new(0)),
            path: path.into(),
        }
    }

    /// Current catalog
    pub fn snapshot(&self) -> Arc<Catalog> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Bumped on every replace; part of the response cache key
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Swap in a new catalog
    pub fn replace(&self, catalog: Catalog) {
        let catalog = Arc::new(catalog);
        match self.inner.write() {
            Ok(mut guard) => *guard = catalog,
            Err(poisoned) => *poisoned.into_inner() = catalog,
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Re-read the catalog file; the current snapshot stays on error
    pub fn reload_from_disk(&self) -> Result<Arc<Catalog>> {
        let catalog = Catalog::load(&self.path)?;
        info!(
            path = %self.path.display(),
            entries = catalog.len(),
            "Catalog reloaded"
        );
        self.replace(catalog);
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmsc_common::CatalogEntry;
    use std::io::Write;

    fn one_entry() -> Catalog {
        Catalog::new(vec![CatalogEntry::new("Wall Sit", 3, &["pattern_squat"])]).unwrap()
    }

    #[test]
    fn test_replace_bumps_generation() {
        let store = CatalogStore::new(Catalog::empty(), "/nonexistent/catalog.json");
        let before = store.snapshot();

        store.replace(one_entry());

        assert_eq!(store.generation(), 1);
        assert!(before.is_empty());
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn test_reload_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[{"name": "Dead Bug", "difficulty_level": 3, "tags": ["fix_rotary_instability"]}]"#,
        )
        .unwrap();

        let store = CatalogStore::new(Catalog::empty(), file.path());
        let catalog = store.reload_from_disk().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_failed_reload_keeps_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let store = CatalogStore::new(one_entry(), file.path());
        assert!(store.reload_from_disk().is_err());
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.generation(), 0);
    }
}
