//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles directory discovery,
//! environment detection and layered merging through the `config` crate.

use super::error::{ConfigResult, ConfigurationError};
use super::BridgeConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::constants::system::{CONFIG_ENV_PREFIX as ENV_PREFIX, CONFIG_FILE_STEM};

/// Separator for environment variable overrides (`HOST_BRIDGE__WAIT__CALLBACK_TIMEOUT_MS`)
const ENV_SEPARATOR: &str = "__";

/// Loaded configuration plus the context it was loaded from
#[derive(Debug)]
pub struct ConfigManager {
    config: BridgeConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_sources(
            config_dir,
            environment,
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
    }

    fn load_with_sources(
        config_dir: Option<PathBuf>,
        environment: &str,
        env_source: Environment,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let explicit_dir = config_dir.is_some();
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        if explicit_dir && !config_directory.is_dir() {
            return Err(ConfigurationError::directory_not_found(config_directory));
        }

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let base_file = Self::config_file(&config_directory, None);
        let env_file = Self::config_file(&config_directory, Some(environment));

        let merged = Config::builder()
            .add_source(File::from(base_file.clone()).required(false))
            .add_source(File::from(env_file.clone()).required(false))
            .add_source(env_source)
            .build()
            .map_err(|e| ConfigurationError::source_error(base_file.display().to_string(), e))?;

        let config: BridgeConfig = merged
            .try_deserialize()
            .map_err(ConfigurationError::deserialize_error)?;

        config.validate()?;

        info!(
            environment = %environment,
            config_directory = %config_directory.display(),
            base_file_present = base_file.exists(),
            environment_file_present = env_file.exists(),
            io_thread = %config.threads.io_thread_name,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Build a manager around an already-constructed configuration
    pub fn from_config(config: BridgeConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: Self::default_config_directory(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration rendered as pretty TOML-compatible JSON for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    /// Detect current environment: HOST_BRIDGE_ENV || APP_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var("HOST_BRIDGE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        env::var("HOST_BRIDGE_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    fn config_file(directory: &Path, environment: Option<&str>) -> PathBuf {
        match environment {
            Some(env_name) => directory.join(format!("{CONFIG_FILE_STEM}.{env_name}.toml")),
            None => directory.join(format!("{CONFIG_FILE_STEM}.toml")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::WaitPolicy;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn empty_env() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(Some(HashMap::new()))
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = TempDir::new().unwrap();
        let manager =
            ConfigManager::load_with_sources(Some(dir.path().to_path_buf()), "test", empty_env())
                .unwrap();

        assert_eq!(manager.config(), &BridgeConfig::default());
        assert_eq!(manager.environment(), "test");
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("host-bridge.toml"),
            "[wait]\nblocking_call_timeout_ms = 5000\n\n[app]\napp_id = \"notes\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("host-bridge.production.toml"),
            "[wait]\nblocking_call_timeout_ms = 750\n",
        )
        .unwrap();

        let manager = ConfigManager::load_with_sources(
            Some(dir.path().to_path_buf()),
            "production",
            empty_env(),
        )
        .unwrap();

        assert_eq!(manager.config().app.app_id, "notes");
        assert_eq!(
            manager.config().wait.blocking_call_policy(),
            WaitPolicy::Bounded(Duration::from_millis(750))
        );
    }

    #[test]
    fn test_environment_variables_override_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("host-bridge.toml"),
            "[threads]\nio_thread_name = \"file-io\"\n",
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert(
            "HOST_BRIDGE__THREADS__IO_THREAD_NAME".to_string(),
            "env-io".to_string(),
        );
        let env_source = empty_env().source(Some(vars));

        let manager =
            ConfigManager::load_with_sources(Some(dir.path().to_path_buf()), "test", env_source)
                .unwrap();

        assert_eq!(manager.config().threads.io_thread_name, "env-io");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("host-bridge.toml"),
            "[wait]\ncallback_timeout_ms = 0\n",
        )
        .unwrap();

        let result =
            ConfigManager::load_with_sources(Some(dir.path().to_path_buf()), "test", empty_env());

        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_directory_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let result = ConfigManager::load_with_sources(Some(missing), "test", empty_env());
        assert!(matches!(
            result,
            Err(ConfigurationError::DirectoryNotFound { .. })
        ));
    }
}
