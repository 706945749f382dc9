//! Database abstraction traits
//!
//! This module defines the core trait that all storage backends must implement.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, PhaseProgress, Requirement, RequirementsStore, User};

/// Types of database backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// YAML file storage (single file)
    Yaml,
    /// SQLite database storage
    Sqlite,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Yaml => write!(f, "YAML"),
            BackendType::Sqlite => write!(f, "SQLite"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(BackendType::Yaml),
            "sqlite" | "db" => Ok(BackendType::Sqlite),
            other => Err(format!("Unknown backend '{}'. Use yaml or sqlite", other)),
        }
    }
}

/// Core trait for database backends
///
/// `load()` and `save()` work with the full `RequirementsStore`. The CRUD
/// operations default to a read-modify-write through `update_atomically`;
/// backends with row-level access override them. Every write either
/// completes or leaves the stored data untouched.
pub trait DatabaseBackend: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    /// Returns the path to the database file
    fn path(&self) -> &std::path::Path;

    // =========================================================================
    // Full Store Operations
    // =========================================================================

    /// Loads the entire store from the database
    fn load(&self) -> Result<RequirementsStore>;

    /// Saves the entire store to the database
    fn save(&self, store: &RequirementsStore) -> Result<()>;

    /// Loads the store, applies `update_fn` and saves the result.
    ///
    /// The default is not safe against concurrent writers; file backends
    /// override it to hold their lock across the reload and the write.
    /// When `update_fn` fails nothing is saved.
    fn update_atomically(
        &self,
        update_fn: &mut dyn FnMut(&mut RequirementsStore) -> Result<()>,
    ) -> Result<RequirementsStore> {
        let mut store = self.load()?;
        update_fn(&mut store)?;
        self.save(&store)?;
        Ok(store)
    }

    // =========================================================================
    // Requirement Operations
    // =========================================================================

    /// Gets a requirement by its UUID
    fn get_requirement(&self, id: &Uuid) -> Result<Option<Requirement>> {
        let store = self.load()?;
        Ok(store.get_requirement(id).cloned())
    }

    /// Gets a requirement by its spec_id (e.g., "REQ-001")
    fn get_requirement_by_spec_id(&self, spec_id: &str) -> Result<Option<Requirement>> {
        let store = self.load()?;
        Ok(store.get_requirement_by_spec_id(spec_id).cloned())
    }

    /// Lists all requirements in submission order
    fn list_requirements(&self) -> Result<Vec<Requirement>> {
        Ok(self.load()?.requirements)
    }

    /// Lists requirements submitted by one user
    fn list_requirements_for_owner(&self, owner_id: &Uuid) -> Result<Vec<Requirement>> {
        Ok(self
            .list_requirements()?
            .into_iter()
            .filter(|r| &r.owner_id == owner_id)
            .collect())
    }

    /// Adds a new requirement
    /// Returns the requirement with its assigned spec_id
    fn add_requirement(&self, requirement: Requirement) -> Result<Requirement> {
        let mut added = None;
        self.update_atomically(&mut |store| {
            added = Some(store.add_requirement(requirement.clone()));
            Ok(())
        })?;
        added.ok_or_else(|| anyhow::anyhow!("Requirement was not stored"))
    }

    /// Replaces phase progress and re-derives overall progress and status
    fn update_progress(&self, id: &Uuid, progress: PhaseProgress) -> Result<Requirement> {
        let mut updated = None;
        self.update_atomically(&mut |store| match store.get_requirement_mut(id) {
            Some(req) => {
                req.apply_progress(progress);
                updated = Some(req.clone());
                Ok(())
            }
            None => anyhow::bail!("Requirement not found: {}", id),
        })?;
        updated.ok_or_else(|| anyhow::anyhow!("Requirement not found: {}", id))
    }

    /// Deletes a requirement and its comments
    fn delete_requirement(&self, id: &Uuid) -> Result<()> {
        self.update_atomically(&mut |store| {
            if !store.remove_requirement(id) {
                anyhow::bail!("Requirement not found: {}", id)
            }
            Ok(())
        })?;
        Ok(())
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    /// Gets a user by UUID
    fn get_user(&self, id: &Uuid) -> Result<Option<User>> {
        let store = self.load()?;
        Ok(store.users.iter().find(|u| &u.id == id).cloned())
    }

    /// Gets a user by username
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let store = self.load()?;
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    /// Gets a user by email (case-insensitive)
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let store = self.load()?;
        Ok(store
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    /// Lists all users
    fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.load()?.users)
    }

    /// Adds a new user
    fn add_user(&self, user: User) -> Result<User> {
        self.update_atomically(&mut |store| {
            if store.users.iter().any(|u| u.username == user.username) {
                anyhow::bail!("Username already taken: {}", user.username)
            }
            store.users.push(user.clone());
            Ok(())
        })?;
        Ok(user)
    }

    /// Updates an existing user
    fn update_user(&self, user: &User) -> Result<()> {
        self.update_atomically(&mut |store| {
            match store.users.iter_mut().find(|u| u.id == user.id) {
                Some(existing) => *existing = user.clone(),
                None => anyhow::bail!("User not found: {}", user.id),
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Deletes a user together with their requirements and comments
    fn delete_user(&self, id: &Uuid) -> Result<()> {
        self.update_atomically(&mut |store| {
            if !store.remove_user(id) {
                anyhow::bail!("User not found: {}", id)
            }
            Ok(())
        })?;
        Ok(())
    }

    // =========================================================================
    // Comment Operations
    // =========================================================================

    /// Adds a comment to an existing requirement
    fn add_comment(&self, comment: Comment) -> Result<Comment> {
        self.update_atomically(&mut |store| {
            if store.get_requirement(&comment.requirement_id).is_none() {
                anyhow::bail!("Requirement not found: {}", comment.requirement_id)
            }
            store.comments.push(comment.clone());
            Ok(())
        })?;
        Ok(comment)
    }

    /// Lists comments on a requirement, oldest first
    fn list_comments(&self, requirement_id: &Uuid) -> Result<Vec<Comment>> {
        let store = self.load()?;
        Ok(store
            .comments
            .into_iter()
            .filter(|c| &c.requirement_id == requirement_id)
            .collect())
    }

    // =========================================================================
    // Utility Operations
    // =========================================================================

    /// Returns true if the database file exists
    fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Creates the database with empty data if it doesn't exist
    fn create_if_not_exists(&self) -> Result<()> {
        if !self.exists() {
            self.save(&RequirementsStore::new())?;
        }
        Ok(())
    }

    /// Returns statistics about the database
    fn stats(&self) -> Result<DatabaseStats> {
        let store = self.load()?;
        Ok(DatabaseStats {
            requirement_count: store.requirements.len(),
            user_count: store.users.len(),
            admin_count: store.users.iter().filter(|u| u.is_admin).count(),
            comment_count: store.comments.len(),
            backend_type: self.backend_type(),
        })
    }
}

/// Statistics about a database
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub requirement_count: usize,
    pub user_count: usize,
    pub admin_count: usize,
    pub comment_count: usize,
    pub backend_type: BackendType,
}
