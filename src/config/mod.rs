//! # Bridge Configuration
//!
//! Layered configuration for the thread registry, wait policy, logging and the
//! hosted application description.
//!
//! ## Sources
//!
//! Sources are merged in order, later sources overriding earlier ones:
//!
//! 1. Compiled defaults (`BridgeConfig::default()`)
//! 2. `host-bridge.toml` in the configuration directory
//! 3. `host-bridge.{environment}.toml` in the same directory
//! 4. `HOST_BRIDGE__SECTION__KEY` environment variables
//!
//! ## Usage
//!
//! ```rust,no_run
//! use host_bridge::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let policy = manager.config().wait.blocking_call_policy();
//! # let _ = policy;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::sync::WaitPolicy;

/// Root configuration structure mirroring host-bridge.toml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Host thread registry settings
    pub threads: ThreadsConfig,

    /// Bounded-wait settings for the blocking bridges
    pub wait: WaitConfig,

    /// Structured logging settings
    pub logging: LoggingConfig,

    /// Description of the hosted application
    pub app: AppConfig,
}

impl BridgeConfig {
    /// Validate cross-field constraints after all sources are merged
    pub fn validate(&self) -> ConfigResult<()> {
        if self.threads.io_thread_name.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "threads.io_thread_name",
                self.threads.io_thread_name.clone(),
                "thread name must not be empty",
            ));
        }

        if self.threads.io_thread_name == self.threads.ui_thread_name {
            return Err(ConfigurationError::validation_error(format!(
                "ui and io threads share the name '{}'",
                self.threads.ui_thread_name
            )));
        }

        for (field, value) in [
            ("wait.blocking_call_timeout_ms", self.wait.blocking_call_timeout_ms),
            ("wait.callback_timeout_ms", self.wait.callback_timeout_ms),
        ] {
            if value == Some(0) {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "timeout must be positive; omit it for an unbounded wait",
                ));
            }
        }

        if let Some(level) = &self.logging.level {
            if level.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "logging.level",
                    level.clone(),
                    "log level must not be empty",
                ));
            }
        }

        if self.app.app_id.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "app.app_id",
                self.app.app_id.clone(),
                "application id must not be empty",
            ));
        }

        Ok(())
    }
}

/// Thread registry configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ThreadsConfig {
    /// Name reported for the dispatch thread in logs
    pub ui_thread_name: String,
    /// OS thread name of the spawned I/O thread
    pub io_thread_name: String,
    /// Optional bound on each task queue; unbounded when absent
    pub queue_capacity: Option<usize>,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            ui_thread_name: "ui".to_string(),
            io_thread_name: "io".to_string(),
            queue_capacity: None,
        }
    }
}

/// Wait policy configuration. Absent timeouts mean unbounded waits.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WaitConfig {
    pub blocking_call_timeout_ms: Option<u64>,
    pub callback_timeout_ms: Option<u64>,
}

impl WaitConfig {
    pub fn blocking_call_policy(&self) -> WaitPolicy {
        Self::policy_from(self.blocking_call_timeout_ms)
    }

    pub fn callback_policy(&self) -> WaitPolicy {
        Self::policy_from(self.callback_timeout_ms)
    }

    fn policy_from(timeout_ms: Option<u64>) -> WaitPolicy {
        match timeout_ms {
            Some(ms) => WaitPolicy::Bounded(Duration::from_millis(ms)),
            None => WaitPolicy::Unbounded,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Explicit filter directive; derived from the environment when absent
    pub level: Option<String>,
    /// Directory for JSON log files; console-only when absent
    pub directory: Option<PathBuf>,
    pub ansi: bool,
}

/// Hosted application description
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_id: String,
    /// Whether the app is a self-extracting package (argv carries no package path)
    pub self_extract: bool,
    /// Profile data path; defaults to `./data/{app_id}` when absent
    pub data_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: "default-app".to_string(),
            self_extract: false,
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn resolved_data_path(&self) -> PathBuf {
        self.data_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("data").join(&self.app_id))
    }
}
