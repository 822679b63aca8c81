//! # Synchronous Bridges
//!
//! Two primitives turn work that completes elsewhere into a call that
//! returns a value on the calling thread:
//!
//! - [`BlockingCall`] posts a work item to another host thread and blocks on a
//!   [`CompletionSignal`] until the item has run and stored its result.
//! - [`CallbackAdapter`] registers a [`CompletionSink`] with an
//!   [`AsyncSubsystem`], issues the request and spins a nested [`RunLoop`]
//!   over the calling thread's own queue until the sink fires.
//!
//! ```text
//!  ui thread                          io thread
//!  ─────────                          ─────────
//!  BlockingCall::call ──post────────▶ work item runs
//!     wait(signal)                    store result
//!     ◀────────────signal──────────── signal()
//!  read result
//!
//!  CallbackAdapter::call_sync
//!     add_observer, issue ──────────▶ subsystem work
//!     RunLoop::run                    ...
//!       runs ui tasks ◀──post reply── completion posted to ui
//!       sink.on_complete → quit
//!     remove_observer, take outcome
//! ```
//!
//! Neither primitive can be cancelled once work is posted.

pub mod blocking_call;
pub mod callback_adapter;
pub mod completion_signal;
pub mod observer;
pub mod run_loop;

pub use blocking_call::BlockingCall;
pub use callback_adapter::{AsyncSubsystem, CallbackAdapter};
pub use completion_signal::{CompletionSignal, InitialState, ResetPolicy};
pub use observer::{CompletionSink, ObserverId, ObserverList};
pub use run_loop::{QuitHandle, RunLoop};

use std::time::Duration;

/// How long a bridge waits for completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Wait forever; the target is trusted to be live
    #[default]
    Unbounded,
    /// Give up after the duration with `BridgeError::Timeout`
    Bounded(Duration),
}

impl WaitPolicy {
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            WaitPolicy::Unbounded => None,
            WaitPolicy::Bounded(duration) => Some(*duration),
        }
    }

    pub(crate) fn timeout_ms(&self) -> u64 {
        self.timeout()
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}
