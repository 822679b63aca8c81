//! # Host Bridge Configuration Validator
//!
//! Command-line tool for validating host-bridge configuration files across
//! environments before an embedding application starts its host threads.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use host_bridge::config::{BridgeConfig, ConfigManager};
use host_bridge::WaitPolicy;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate host-bridge configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long)]
    environment: Option<String>,

    /// Configuration directory path (default: $HOST_BRIDGE_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate every configuration section
    All,

    /// Validate one section (threads, wait, logging, app)
    Section { name: String },

    /// Print the merged configuration as JSON
    Show,

    /// List environments that have an override file
    Environments,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all(&cli),
        Some(Commands::Section { name }) => validate_section(&cli, name),
        Some(Commands::Show) => show_config(&cli),
        Some(Commands::Environments) => list_environments(&cli),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> anyhow::Result<Arc<ConfigManager>> {
    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);

    ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .with_context(|| format!("failed to load configuration for environment '{environment}'"))
}

fn validate_all(cli: &Cli) -> anyhow::Result<()> {
    let manager = load(cli)?;
    println!("🔧 Validating host-bridge configuration");
    println!("Environment: {}", manager.environment());
    println!("Config Directory: {}", manager.config_directory().display());
    println!();

    let config = manager.config();
    validate_threads(config);
    validate_wait(config);
    validate_logging(config);
    validate_app(config);

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

fn validate_section(cli: &Cli, name: &str) -> anyhow::Result<()> {
    let manager = load(cli)?;
    let config = manager.config();

    match name.to_lowercase().as_str() {
        "threads" => validate_threads(config),
        "wait" => validate_wait(config),
        "logging" => validate_logging(config),
        "app" => validate_app(config),
        other => bail!("Unknown section: {other}"),
    }

    println!("✅ Section '{name}' validation passed!");
    Ok(())
}

fn show_config(cli: &Cli) -> anyhow::Result<()> {
    let manager = load(cli)?;
    let rendered = serde_json::to_string_pretty(&manager.debug_config())
        .context("failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

fn list_environments(cli: &Cli) -> anyhow::Result<()> {
    let directory = cli
        .config_dir
        .clone()
        .or_else(|| std::env::var_os("HOST_BRIDGE_CONFIG_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config"));

    println!("📋 Environments in {}:", directory.display());
    if !directory.is_dir() {
        println!("  (directory not found)");
        return Ok(());
    }

    let mut environments: Vec<String> = std::fs::read_dir(&directory)
        .with_context(|| format!("failed to read {}", directory.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.strip_prefix("host-bridge.")
                .and_then(|rest| rest.strip_suffix(".toml"))
                .map(str::to_string)
        })
        .collect();
    environments.sort();

    for environment in environments {
        println!("  • {environment}");
    }
    Ok(())
}

fn validate_threads(config: &BridgeConfig) {
    println!("🧵 Threads");
    println!("   ✅ UI thread name: {}", config.threads.ui_thread_name);
    println!("   ✅ I/O thread name: {}", config.threads.io_thread_name);
    match config.threads.queue_capacity {
        Some(capacity) => println!("   ✅ Queue capacity: {capacity}"),
        None => println!("   ℹ️  Queues are unbounded"),
    }
}

fn validate_wait(config: &BridgeConfig) {
    println!("⏱️  Wait policies");
    describe_policy("blocking call", config.wait.blocking_call_policy());
    describe_policy("callback adapter", config.wait.callback_policy());
}

fn describe_policy(label: &str, policy: WaitPolicy) {
    match policy.timeout() {
        Some(timeout) => println!("   ✅ {label}: bounded ({}ms)", timeout.as_millis()),
        None => {
            warn!("{label} waits are unbounded");
            println!("   ℹ️  {label}: unbounded");
        }
    }
}

fn validate_logging(config: &BridgeConfig) {
    println!("📊 Logging");
    match &config.logging.level {
        Some(level) => println!("   ✅ Level: {level}"),
        None => println!("   ℹ️  Level derived from environment"),
    }
    match &config.logging.directory {
        Some(directory) => println!("   ✅ JSON log directory: {}", directory.display()),
        None => println!("   ℹ️  Console logging only"),
    }
}

fn validate_app(config: &BridgeConfig) {
    println!("📦 App");
    println!("   ✅ App id: {}", config.app.app_id);
    println!("   ✅ Self-extracting: {}", config.app.self_extract);
    println!(
        "   ✅ Data path: {}",
        config.app.resolved_data_path().display()
    );
}
