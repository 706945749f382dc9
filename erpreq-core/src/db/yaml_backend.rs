//! YAML file storage backend
//!
//! This backend stores all data in a single YAML file, using the
//! Storage implementation with file locking support.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::traits::{BackendType, DatabaseBackend};
use crate::models::RequirementsStore;
use crate::storage::Storage;

/// YAML file backend implementation
pub struct YamlBackend {
    storage: Storage,
    path: PathBuf,
}

impl YamlBackend {
    /// Creates a new YAML backend for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            storage: Storage::new(&path),
            path,
        }
    }
}

impl DatabaseBackend for YamlBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Yaml
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<RequirementsStore> {
        self.storage.load()
    }

    fn save(&self, store: &RequirementsStore) -> Result<()> {
        self.storage.save(store)
    }

    fn update_atomically(
        &self,
        update_fn: &mut dyn FnMut(&mut RequirementsStore) -> Result<()>,
    ) -> Result<RequirementsStore> {
        self.storage.update_atomically(update_fn)
    }
}
