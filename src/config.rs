use crate::models::Priority;
use crate::storage::{create_backend, BackendError, KeyValueStore, StorageType};
use crate::store::StartupPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "LTODO_CONFIG";
const APP_DIR: &str = "ltodo";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Could not determine the {0} directory")]
    NoDirectory(&'static str),
    #[error("Storage error: {0}")]
    Storage(#[from] BackendError),
}

const VALID_STORAGE_TYPES: &[&str] = &["json", "sqlite"];
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

pub const KEYS: &[&str] = &[
    "storage.type",
    "storage.path",
    "storage.quota-bytes",
    "default-priority",
    "startup.todo-load-errors",
    "log.level",
    "log.dir",
];

fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    if path.contains('\0') {
        return Err(ConfigError::InvalidConfig(
            "Path contains invalid characters".to_string(),
        ));
    }
    if path.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(
            "Path cannot be empty".to_string(),
        ));
    }
    Ok(PathBuf::from(shellexpand::tilde(path).as_ref()))
}

fn validate_storage_type(value: &str) -> Result<(), ConfigError> {
    if !VALID_STORAGE_TYPES.contains(&value) {
        return Err(ConfigError::InvalidConfig(format!(
            "storage.type must be one of: {}",
            VALID_STORAGE_TYPES.join(", ")
        )));
    }
    Ok(())
}

fn validate_priority(value: &str) -> Result<Priority, ConfigError> {
    value.parse().map_err(|_| {
        ConfigError::InvalidConfig(
            "default-priority must be one of: none, low, medium, high".to_string(),
        )
    })
}

fn validate_quota(value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(bytes) if bytes > 0 => Ok(bytes),
        _ => Err(ConfigError::InvalidConfig(
            "storage.quota-bytes must be a positive integer".to_string(),
        )),
    }
}

fn validate_startup_policy(value: &str) -> Result<StartupPolicy, ConfigError> {
    value
        .parse()
        .map_err(|e| ConfigError::InvalidConfig(format!("startup.todo-load-errors: {e}")))
}

fn validate_log_level(value: &str) -> Result<(), ConfigError> {
    if !VALID_LOG_LEVELS.contains(&value) {
        return Err(ConfigError::InvalidConfig(format!(
            "log.level must be one of: {}",
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

/// The on-disk config. Absent values fall back to the defaults below.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_quota_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_load_errors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref storage_type) = self.storage_type {
            validate_storage_type(storage_type)?;
        }
        if let Some(ref path) = self.storage_path {
            expand_path(path)?;
        }
        if let Some(ref priority) = self.default_priority {
            validate_priority(priority)?;
        }
        if let Some(ref policy) = self.todo_load_errors {
            validate_startup_policy(policy)?;
        }
        if let Some(ref level) = self.log_level {
            validate_log_level(level)?;
        }
        Ok(())
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return expand_path(&path);
    }
    let base = dirs::config_dir().ok_or(ConfigError::NoDirectory("config"))?;
    Ok(base.join(APP_DIR).join("config.json"))
}

fn default_storage_path(storage_type: StorageType) -> Result<PathBuf, ConfigError> {
    let base = dirs::data_dir().ok_or(ConfigError::NoDirectory("data"))?;
    Ok(base.join(APP_DIR).join(storage_type.default_file_name()))
}

/// Reads, edits and persists the config file, and resolves effective values.
pub struct ConfigManager {
    path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Loads `config_path`, or `$LTODO_CONFIG`, or the platform default. A
    /// missing or empty file means all defaults.
    pub fn new(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };

        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                Config::default()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            Config::default()
        };
        config.validate()?;

        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.config)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// The explicitly configured value, if any.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let config = &self.config;
        let value = match key {
            "storage.type" => config.storage_type.clone(),
            "storage.path" => config.storage_path.clone(),
            "storage.quota-bytes" => config.storage_quota_bytes.map(|v| v.to_string()),
            "default-priority" => config.default_priority.clone(),
            "startup.todo-load-errors" => config.todo_load_errors.clone(),
            "log.level" => config.log_level.clone(),
            "log.dir" => config.log_dir.clone(),
            _ => return Err(ConfigError::InvalidKey(key.to_string())),
        };
        Ok(value)
    }

    /// Validates, applies and saves a single value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        match key {
            "storage.type" => {
                validate_storage_type(value)?;
                if config.storage_type.as_deref() != Some(value) {
                    log::warn!("event=config_set key=storage.type note=existing_data_not_migrated");
                }
                config.storage_type = Some(value.to_string());
            }
            "storage.path" => {
                let path = expand_path(value)?;
                config.storage_path = Some(path.to_string_lossy().to_string());
            }
            "storage.quota-bytes" => {
                config.storage_quota_bytes = Some(validate_quota(value)?);
            }
            "default-priority" => {
                config.default_priority = Some(validate_priority(value)?.as_str().to_string());
            }
            "startup.todo-load-errors" => {
                config.todo_load_errors = Some(validate_startup_policy(value)?.as_str().to_string());
            }
            "log.level" => {
                validate_log_level(value)?;
                config.log_level = Some(value.to_string());
            }
            "log.dir" => {
                let path = expand_path(value)?;
                config.log_dir = Some(path.to_string_lossy().to_string());
            }
            _ => return Err(ConfigError::InvalidKey(key.to_string())),
        }
        config.validate()?;
        self.config = config;
        self.save()
    }

    pub fn unset(&mut self, key: &str) -> Result<(), ConfigError> {
        let config = &mut self.config;
        match key {
            "storage.type" => config.storage_type = None,
            "storage.path" => config.storage_path = None,
            "storage.quota-bytes" => config.storage_quota_bytes = None,
            "default-priority" => config.default_priority = None,
            "startup.todo-load-errors" => config.todo_load_errors = None,
            "log.level" => config.log_level = None,
            "log.dir" => config.log_dir = None,
            _ => return Err(ConfigError::InvalidKey(key.to_string())),
        }
        self.save()
    }

    /// Every key with its effective value and whether that value is a
    /// default. Keys with no value at all show as `null`.
    pub fn list(&self) -> Vec<(String, String, bool)> {
        KEYS.iter()
            .map(|key| {
                let configured = self.get(key).ok().flatten();
                let is_default = configured.is_none();
                let value = configured
                    .or_else(|| self.default_value(key))
                    .unwrap_or_else(|| "null".to_string());
                (key.to_string(), value, is_default)
            })
            .collect()
    }

    fn default_value(&self, key: &str) -> Option<String> {
        match key {
            "storage.type" => Some(StorageType::default().as_str().to_string()),
            "storage.path" => self
                .storage_path()
                .ok()
                .map(|p| p.to_string_lossy().to_string()),
            "default-priority" => Some(Priority::default().as_str().to_string()),
            "startup.todo-load-errors" => Some(StartupPolicy::default().as_str().to_string()),
            "log.level" => Some("warn".to_string()),
            _ => None,
        }
    }

    pub fn storage_type(&self) -> StorageType {
        self.config
            .storage_type
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn storage_path(&self) -> Result<PathBuf, ConfigError> {
        match self.config.storage_path {
            Some(ref path) => expand_path(path),
            None => default_storage_path(self.storage_type()),
        }
    }

    pub fn default_priority(&self) -> Priority {
        self.config
            .default_priority
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default()
    }

    pub fn startup_policy(&self) -> StartupPolicy {
        self.config
            .todo_load_errors
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.config.log_level.as_deref().unwrap_or("warn")
    }

    pub fn log_dir(&self) -> Result<Option<PathBuf>, ConfigError> {
        self.config.log_dir.as_deref().map(expand_path).transpose()
    }

    pub fn create_storage(&self) -> Result<Box<dyn KeyValueStore>, ConfigError> {
        let path = self.storage_path()?;
        let backend = create_backend(self.storage_type(), &path, self.config.storage_quota_bytes)?;
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config_manager() -> (ConfigManager, tempfile::TempDir) {
        let temp_dir = tempfile::Builder::new()
            .prefix("ltodo_test")
            .tempdir()
            .expect("Failed to create temporary directory");
        let manager = ConfigManager::new(Some(&temp_dir.path().join("config.json")))
            .expect("Failed to create config manager");
        (manager, temp_dir)
    }

    #[test]
    fn test_config_manager() {
        let (mut manager, temp_dir) = create_test_config_manager();

        assert!(manager.set("storage.type", "sqlite").is_ok());
        assert_eq!(manager.get("storage.type").unwrap(), Some("sqlite".to_string()));
        assert_eq!(manager.storage_type(), StorageType::Sqlite);

        let storage_path = "~/.local/share/ltodo/store.db";
        assert!(manager.set("storage.path", storage_path).is_ok());
        assert_eq!(
            manager.get("storage.path").unwrap(),
            Some(shellexpand::tilde(storage_path).to_string())
        );

        assert!(manager.set("default-priority", "HIGH").is_ok());
        assert_eq!(manager.get("default-priority").unwrap(), Some("high".to_string()));
        assert_eq!(manager.default_priority(), Priority::High);

        assert!(manager.set("startup.todo-load-errors", "ignore").is_ok());
        assert_eq!(manager.startup_policy(), StartupPolicy::ListsOnly);

        assert!(manager.set("storage.quota-bytes", "5000").is_ok());
        assert_eq!(manager.config().storage_quota_bytes, Some(5000));

        assert!(manager.unset("default-priority").is_ok());
        assert_eq!(manager.get("default-priority").unwrap(), None);

        // Everything was written through to the file.
        let reloaded = ConfigManager::new(Some(&temp_dir.path().join("config.json"))).unwrap();
        assert_eq!(reloaded.config(), manager.config());
    }

    #[test]
    fn test_config_manager_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        assert_eq!(manager.get("storage.type").unwrap(), None);
        assert_eq!(manager.storage_type(), StorageType::Json);
        assert_eq!(manager.default_priority(), Priority::None);
        assert_eq!(manager.startup_policy(), StartupPolicy::Symmetric);
        assert_eq!(manager.log_level(), "warn");
        assert_eq!(manager.log_dir().unwrap(), None);
    }

    #[test]
    fn test_config_manager_rejects_invalid_values() {
        let (mut manager, _temp_dir) = create_test_config_manager();

        assert!(matches!(
            manager.set("storage.type", "yaml"),
            Err(ConfigError::InvalidConfig(_))
        ));
        assert!(manager.set("default-priority", "urgent").is_err());
        assert!(manager.set("storage.quota-bytes", "0").is_err());
        assert!(manager.set("startup.todo-load-errors", "maybe").is_err());
        assert!(manager.set("log.level", "loud").is_err());
        assert!(matches!(
            manager.set("color", "blue"),
            Err(ConfigError::InvalidKey(_))
        ));
        assert_eq!(manager.config(), &Config::default());
    }

    #[test]
    fn test_config_manager_list() {
        let (mut manager, _temp_dir) = create_test_config_manager();
        manager.set("default-priority", "low").unwrap();
        let list = manager.list();
        assert_eq!(list.len(), KEYS.len());

        assert!(list
            .iter()
            .any(|(key, value, is_default)| key == "storage.type" && value == "json" && *is_default));
        assert!(list.iter().any(|(key, value, is_default)| {
            key == "default-priority" && value == "low" && !*is_default
        }));
        assert!(list
            .iter()
            .any(|(key, value, is_default)| key == "log.dir" && value == "null" && *is_default));
    }

    #[test]
    fn test_create_storage_uses_configured_backend() {
        let (mut manager, temp_dir) = create_test_config_manager();
        let path = temp_dir.path().join("data").join("store.db");
        manager.set("storage.type", "sqlite").unwrap();
        manager.set("storage.path", path.to_str().unwrap()).unwrap();

        let storage = manager.create_storage().unwrap();
        storage.set("k", "v").unwrap();
        assert!(path.exists());
    }
}
