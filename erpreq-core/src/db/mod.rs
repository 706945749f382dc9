//! Database abstraction layer for ERP requirements
//!
//! This module provides a trait-based abstraction for storage backends,
//! allowing the system to use different databases (YAML files, SQLite)
//! while maintaining a consistent interface.

mod migration;
mod sqlite_backend;
mod traits;
mod yaml_backend;

pub use migration::{export_to_json, import_from_json, migrate, TransferSummary};
pub use sqlite_backend::SqliteBackend;
pub use traits::{BackendType, DatabaseBackend, DatabaseStats};
pub use yaml_backend::YamlBackend;

use anyhow::Result;
use std::path::Path;

/// Infers the backend from a file extension. Anything unrecognized is SQLite.
pub fn infer_backend_type(path: &Path) -> BackendType {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => BackendType::Yaml,
        _ => BackendType::Sqlite,
    }
}

/// Creates a database backend based on the file extension or explicit type
pub fn create_backend(
    path: &Path,
    backend_type: Option<BackendType>,
) -> Result<Box<dyn DatabaseBackend>> {
    let bt = backend_type.unwrap_or_else(|| infer_backend_type(path));
    log::debug!("Opening {} database at {:?}", bt, path);

    match bt {
        BackendType::Yaml => Ok(Box::new(YamlBackend::new(path))),
        BackendType::Sqlite => Ok(Box::new(SqliteBackend::new(path)?)),
    }
}

/// Opens an existing database or creates a new one
pub fn open_or_create(
    path: &Path,
    backend_type: Option<BackendType>,
) -> Result<Box<dyn DatabaseBackend>> {
    let backend = create_backend(path, backend_type)?;
    backend.create_if_not_exists()?;
    Ok(backend)
}
