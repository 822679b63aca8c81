//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to the console and,
//! when a log directory is configured, to JSON files for post-mortem analysis
//! of cross-thread call sequences.

use chrono::Utc;
use std::process;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{ConfigManager, LoggingConfig};

static LOGGER_INITIALIZED: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = ConfigManager::detect_environment();
        let log_level = config
            .level
            .clone()
            .unwrap_or_else(|| get_log_level(&environment).to_string());

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_level(true)
            .with_ansi(config.ansi)
            .with_filter(EnvFilter::new(log_level.clone()));

        let (file_layer, guard) = match &config.directory {
            Some(log_dir) => match std::fs::create_dir_all(log_dir) {
                Ok(()) => {
                    let file_name = format!(
                        "{}.{}.{}.log",
                        environment,
                        process::id(),
                        Utc::now().format("%Y%m%d_%H%M%S")
                    );
                    let appender = tracing_appender::rolling::never(log_dir, file_name);
                    let (writer, guard) = tracing_appender::non_blocking(appender);
                    let layer = fmt::layer()
                        .with_writer(writer)
                        .with_target(true)
                        .with_thread_names(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(EnvFilter::new(log_level.clone()));
                    (Some(layer), Some(guard))
                }
                Err(e) => {
                    eprintln!(
                        "host-bridge: cannot create log directory {}: {e}",
                        log_dir.display()
                    );
                    (None, None)
                }
            },
            None => (None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        // A global subscriber may already be installed by the embedding host
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            level = %log_level,
            file_output = config.directory.is_some(),
            "Structured logging initialized"
        );

        guard
    });
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" => "debug",
        _ => "debug",
    }
}

/// Log structured data for a bridge operation (blocking call, callback adapter, dispatch)
pub fn log_bridge_operation(
    operation: &str,
    thread: &str,
    status: &str,
    duration_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        thread = %thread,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "BRIDGE_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "BRIDGE_ERROR"
    );
}
