//! Application configuration
//!
//! Settings live in a YAML file (`~/.config/erpreq/config.yaml` by default).
//! A missing file is not an error: every field has a default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::BackendType;

/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "ERPREQ_CONFIG";

/// Environment variable overriding the database path
pub const DATABASE_PATH_ENV: &str = "ERPREQ_DB";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the database file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// Storage backend; inferred from the file extension when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendType>,
    pub ai: AiSettings,
    pub admin: AdminSettings,
}

/// Settings for the plan-writing model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Set to false to always use the built-in plan template
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            max_tokens: 2000,
            temperature: 0.7,
        }
    }
}

/// The administrator account ensured by `bootstrap_admin`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: "admin".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the given path, falling back to defaults if
    /// the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Loads configuration from the default location
    pub fn load_default() -> Result<Self> {
        Self::load(get_config_path()?)
    }

    /// Save the configuration to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Resolves the database path: `ERPREQ_DB`, then the config file, then
    /// the platform data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Ok(path) = std::env::var(DATABASE_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        if let Some(path) = &self.database {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir().context("Failed to determine data directory")?;
        Ok(data_dir.join("erpreq").join("erpreq.db"))
    }
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
    Ok(config_dir.join("erpreq").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(dir.path().join("absent.yaml")).unwrap();
        assert!(config.ai.enabled);
        assert_eq!(config.ai.model, "gpt-4");
        assert_eq!(config.admin.username, "admin");
        assert!(config.database.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "database: /tmp/reqs.yaml\nbackend: yaml\nai:\n  enabled: false\n  timeout_secs: 5\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.database, Some(PathBuf::from("/tmp/reqs.yaml")));
        assert_eq!(config.backend, Some(BackendType::Yaml));
        assert!(!config.ai.enabled);
        assert_eq!(config.ai.timeout_secs, 5);
        assert_eq!(config.ai.max_tokens, 2000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = AppConfig::default();
        config.admin.username = "root".to_string();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.admin.username, "root");
    }
}
