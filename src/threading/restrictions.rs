//! # Thread Restrictions
//!
//! Per-thread flag controlling whether the thread may block on a
//! [`CompletionSignal`](crate::sync::CompletionSignal). Host threads are bound
//! with waiting disallowed so an accidental wait on a latency-sensitive
//! thread fails loudly instead of stalling it. Code that intends to block
//! declares it with a [`ScopedAllowWait`] guard for the duration of the wait.
//!
//! Threads that were never bound into a registry are unrestricted.

use std::cell::Cell;
use std::marker::PhantomData;

use crate::error::{BridgeError, Result};

thread_local! {
    static WAIT_ALLOWED: Cell<bool> = const { Cell::new(true) };
}

/// Set the current thread's flag, returning the previous value
pub(crate) fn set_wait_allowed(allowed: bool) -> bool {
    WAIT_ALLOWED.with(|flag| flag.replace(allowed))
}

/// Whether the current thread may perform a blocking wait
pub fn wait_allowed() -> bool {
    WAIT_ALLOWED.with(Cell::get)
}

pub fn assert_wait_allowed() -> Result<()> {
    if wait_allowed() {
        Ok(())
    } else {
        Err(BridgeError::WaitDisallowed {
            thread: current_thread_name(),
        })
    }
}

pub(crate) fn current_thread_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or("unnamed")
        .to_string()
}

/// Permits blocking waits on the current thread until dropped.
///
/// Not `Send`: the permit belongs to the thread that created it.
#[derive(Debug)]
pub struct ScopedAllowWait {
    previous: bool,
    _not_send: PhantomData<*const ()>,
}

impl ScopedAllowWait {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            previous: set_wait_allowed(true),
            _not_send: PhantomData,
        }
    }
}

impl Drop for ScopedAllowWait {
    fn drop(&mut self) {
        set_wait_allowed(self.previous);
    }
}
