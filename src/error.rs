//! # Bridge Error Types
//!
//! Structured errors for the cross-thread bridge and the host function layer.
//! Every variant renders to the short diagnostic string handed back to the
//! script caller, so `Display` output is kept to a single line.

use thiserror::Error;

use crate::config::ConfigurationError;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// Malformed or missing input; reported before any thread hop
    #[error("Invalid arguments for {function}: {message}")]
    ArgumentValidation { function: String, message: String },

    /// The thread-affine subsystem or its thread could not be reached
    #[error("Target {target} unavailable: {reason}")]
    TargetUnavailable { target: String, reason: String },

    /// Bounded wait elapsed before the target signalled completion
    #[error("Operation {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Error or panic raised by a work item on its target thread
    #[error("Work item failed: {message}")]
    WorkItemFailed { message: String },

    #[error("Blocking wait is not allowed on thread {thread}")]
    WaitDisallowed { thread: String },

    #[error("Blocking call to {thread} issued from {thread} itself")]
    ReentrantCall { thread: String },

    #[error("Resource owned by {expected} accessed from {actual}")]
    WrongThread { expected: String, actual: String },

    #[error("Current thread is not bound to the host thread registry")]
    NotOnHostThread,

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl BridgeError {
    pub fn argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ArgumentValidation {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn target_unavailable(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TargetUnavailable {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn work_item_failed(message: impl Into<String>) -> Self {
        Self::WorkItemFailed {
            message: message.into(),
        }
    }

    /// Whether the error was raised before any cross-thread work was scheduled
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ArgumentValidation { .. } | Self::UnknownFunction { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
