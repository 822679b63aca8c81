#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Host Bridge
//!
//! Synchronous call bridges between the host threads of an embedding
//! application, and the host function set built on them.
//!
//! ## Overview
//!
//! Host capabilities live on fixed threads: the UI thread receives script
//! calls, the I/O thread owns network and storage state. A script call is
//! synchronous, so a function that needs I/O-thread state has to block on the
//! UI thread until that work is done, without deadlocking and without
//! breaking the rule that host threads do not wait by accident.
//!
//! ## Architecture
//!
//! - **Blocking call** ([`sync::BlockingCall`]): posts a work item to another
//!   host thread and waits on a [`sync::CompletionSignal`] for its result.
//!   Waiting requires a [`threading::ScopedAllowWait`] permit.
//! - **Callback adapter** ([`sync::CallbackAdapter`]): drives an
//!   observer-based subsystem to completion by running a nested
//!   [`sync::RunLoop`] over the calling thread's own queue.
//! - **Thread registry** ([`threading::ThreadRegistry`]): explicit owner of
//!   the host threads and their FIFO queues.
//!
//! ## Module Organization
//!
//! - [`threading`] - Host threads, task queues, wait restrictions, thread affinity
//! - [`sync`] - Completion signal, run loop, blocking call, callback adapter
//! - [`host`] - Proxy, browsing data, windows, lifecycle and process models
//! - [`api`] - Function requests, dispatcher and the `App` function set
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use host_bridge::api::{FunctionContext, FunctionDispatcher, FunctionRequest};
//! use host_bridge::config::ConfigManager;
//! use host_bridge::host::CommandLine;
//! use host_bridge::threading::{HostThread, ThreadRegistry};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! host_bridge::logging::init_structured_logging(&manager.config().logging);
//!
//! let registry = ThreadRegistry::start(&manager.config().threads)?;
//! let _ui = registry.adopt_current_thread(HostThread::Ui)?;
//!
//! let context = FunctionContext::new(registry.clone(), manager.config(), CommandLine::current());
//! let dispatcher = FunctionDispatcher::with_app_functions(Arc::new(context));
//!
//! let response = dispatcher.dispatch(&FunctionRequest::new(
//!     "setProxyConfig",
//!     vec!["".into(), "<direct>".into()],
//! ));
//! assert!(response.is_success());
//!
//! registry.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod host;
pub mod logging;
pub mod sync;
pub mod threading;

pub use api::{FunctionContext, FunctionDispatcher, FunctionRequest, FunctionResponse};
pub use config::{BridgeConfig, ConfigManager};
pub use error::{BridgeError, Result};
pub use sync::{BlockingCall, CallbackAdapter, CompletionSignal, WaitPolicy};
pub use threading::{HostThread, ScopedAllowWait, ThreadRegistry};
