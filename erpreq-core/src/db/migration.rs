//! Copying data between storage backends
//!
//! Supports moving a database between the YAML and SQLite backends, and
//! JSON export/import for backups.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use super::traits::DatabaseBackend;
use crate::models::RequirementsStore;

/// What a migration or import copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    pub requirements: usize,
    pub users: usize,
    pub comments: usize,
}

impl TransferSummary {
    fn of(store: &RequirementsStore) -> Self {
        Self {
            requirements: store.requirements.len(),
            users: store.users.len(),
            comments: store.comments.len(),
        }
    }
}

/// Copies the full store from one backend into another, replacing the
/// target's contents
pub fn migrate(source: &dyn DatabaseBackend, target: &dyn DatabaseBackend) -> Result<TransferSummary> {
    let store = source
        .load()
        .with_context(|| format!("Failed to load {} database", source.backend_type()))?;

    target
        .save(&store)
        .with_context(|| format!("Failed to save to {} database", target.backend_type()))?;

    log::info!(
        "Migrated {} requirements from {:?} to {:?}",
        store.requirements.len(),
        source.path(),
        target.path()
    );
    Ok(TransferSummary::of(&store))
}

/// Writes the backend's full store to a pretty-printed JSON file
pub fn export_to_json<P: AsRef<Path>>(backend: &dyn DatabaseBackend, json_path: P) -> Result<TransferSummary> {
    let store = backend.load()?;
    let json = serde_json::to_string_pretty(&store).context("Failed to serialize to JSON")?;

    std::fs::write(json_path.as_ref(), json)
        .with_context(|| format!("Failed to write JSON file {:?}", json_path.as_ref()))?;

    Ok(TransferSummary::of(&store))
}

/// Replaces the backend's contents with a store read from a JSON file
pub fn import_from_json<P: AsRef<Path>>(backend: &dyn DatabaseBackend, json_path: P) -> Result<TransferSummary> {
    let json = std::fs::read_to_string(json_path.as_ref())
        .with_context(|| format!("Failed to read JSON file {:?}", json_path.as_ref()))?;

    let store: RequirementsStore = serde_json::from_str(&json).context("Failed to parse JSON")?;

    backend.save(&store)?;
    Ok(TransferSummary::of(&store))
}
