//! # PMOMusic Configuration Module
//!
//! This module provides configuration management for PMOMusic, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Path-based getters and setters, extended by each crate through a
//!   `*ConfigExt` trait
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::get_config;
//!
//! let config = get_config();
//! let level = config.get_log_min_level()?;
//! config.set_value(&["browser", "single_track"], serde_yaml::Value::Bool(true))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, info};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmomusic.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PMOMusic configuration"));
}

const ENV_CONFIG_DIR: &str = "PMOMUSIC_CONFIG";
const ENV_PREFIX: &str = "PMOMUSIC_CONFIG__";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";

/// Configuration manager for PMOMusic
///
/// A configuration loaded from disk is written back on every change. One
/// built with [`Config::from_yaml_str`] lives in memory only.
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(self.data().clone()),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        if Path::new(".pmomusic").exists() {
            return ".pmomusic".to_string();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(".pmomusic");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        ".pmomusic".to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("Le chemin spécifié n'est pas un répertoire"));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PMOMUSIC_CONFIG` environment variable
    /// 3. `.pmomusic` in the current directory
    /// 4. `.pmomusic` in the user's home directory
    ///
    /// The directory is created if it doesn't exist.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let yaml = match fs::read_to_string(&path) {
            Ok(data) => {
                info!(config_file=%path, "Loaded config file");
                data
            }
            Err(_) => {
                info!(config_file=%path, "Config file not found, using default embedded config");
                String::new()
            }
        };

        let mut config_value = Self::merged_with_defaults(&yaml)?;
        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Builds an in-memory configuration from a YAML document
    ///
    /// The document is merged over the embedded defaults. Nothing is ever
    /// written to disk and environment overrides are not applied.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(Config {
            config_dir: String::new(),
            path: String::new(),
            data: Mutex::new(Self::merged_with_defaults(yaml)?),
        })
    }

    fn merged_with_defaults(yaml: &str) -> Result<Value> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if !yaml.trim().is_empty() {
            let external: Value = serde_yaml::from_str(yaml)?;
            merge_yaml(&mut value, &Self::lower_keys_value(external));
        }
        Ok(Self::lower_keys_value(value))
    }

    /// Directory holding `config.yaml`, empty for in-memory configurations
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        if self.path.is_empty() {
            return Ok(());
        }
        let yaml = serde_yaml::to_string(&*self.data())?;
        fs::write(&self.path, yaml)?;
        debug!(config_file=%self.path, "Configuration saved");
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["browser", "single_track"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.data();
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        Self::get_value_internal(&self.data(), path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(&Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => return Err(anyhow!("Path {} does not exist", path[..=i].join("."))),
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    /// Définit le niveau de log minimum dans la configuration
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Returns the global configuration instance
///
/// The instance is lazily loaded on first access.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default ones.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Number;

    #[test]
    fn test_defaults_are_embedded() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");
        assert_eq!(
            config.get_value(&["browser", "cache", "max_paths"]).unwrap(),
            Value::Number(Number::from(256u64))
        );
        assert!(config.directory().is_empty());
    }

    #[test]
    fn test_external_yaml_overrides_defaults() {
        let config = Config::from_yaml_str(
            "Browser:\n  Single_Track: true\nhost:\n  logger:\n    min_level: DEBUG\n",
        )
        .unwrap();

        assert_eq!(
            config.get_value(&["browser", "single_track"]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(config.get_log_min_level().unwrap(), "DEBUG");
        // Siblings survive the merge
        assert!(config.get_value(&["browser", "initial_path"]).is_ok());
    }

    #[test]
    fn test_set_and_get_value() {
        let config = Config::from_yaml_str("").unwrap();
        config
            .set_value(&["sources", "demo", "enabled"], Value::Bool(false))
            .unwrap();
        assert_eq!(
            config.get_value(&["SOURCES", "demo", "enabled"]).unwrap(),
            Value::Bool(false)
        );
        assert!(config.get_value(&["sources", "missing"]).is_err());
        assert!(config
            .set_value(&["host", "logger", "min_level", "nested"], Value::Null)
            .is_err());
    }

    #[test]
    fn test_load_config_persists_file() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_string_lossy().to_string();

        let config = Config::load_config(&dir_path).unwrap();
        config.set_log_min_level("WARN".to_string()).unwrap();

        let reloaded = Config::load_config(&dir_path).unwrap();
        assert_eq!(reloaded.get_log_min_level().unwrap(), "WARN");
        assert!(dir.path().join("config.yaml").exists());
    }

    #[test]
    fn test_convert_env_value() {
        assert_eq!(Config::convert_env_value("42"), Value::Number(Number::from(42u64)));
        assert_eq!(Config::convert_env_value("true"), Value::Bool(true));
        assert_eq!(
            Config::convert_env_value("/albums"),
            Value::String("/albums".to_string())
        );
    }

    #[test]
    fn test_log_min_level_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");
        config.set_log_min_level("DEBUG".to_string()).unwrap();
        assert_eq!(config.get_log_min_level().unwrap(), "DEBUG");
    }
}
