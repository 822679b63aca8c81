//! One-shot cross-thread wake primitive.
//!
//! The producer raises the signal after publishing its result; the consumer
//! reads the result only after `wait` returns. Both sides go through the same
//! mutex, which gives the release/acquire ordering between them.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::WaitPolicy;
use crate::error::Result;
use crate::threading::restrictions;

/// What a successful wait does to the signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// A completed wait consumes the signal
    Automatic,
    /// The signal stays raised until `reset`
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialState {
    Signaled,
    NotSignaled,
}

struct SignalInner {
    signaled: Mutex<bool>,
    condvar: Condvar,
    policy: ResetPolicy,
}

#[derive(Clone)]
pub struct CompletionSignal {
    inner: Arc<SignalInner>,
}

impl CompletionSignal {
    pub fn new(policy: ResetPolicy, initial: InitialState) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                signaled: Mutex::new(initial == InitialState::Signaled),
                condvar: Condvar::new(),
                policy,
            }),
        }
    }

    /// Auto-reset, initially unsignaled: the shape every bridge call uses
    pub fn one_shot() -> Self {
        Self::new(ResetPolicy::Automatic, InitialState::NotSignaled)
    }

    pub fn policy(&self) -> ResetPolicy {
        self.inner.policy
    }

    pub fn signal(&self) {
        let mut signaled = self.inner.signaled.lock();
        *signaled = true;
        match self.inner.policy {
            ResetPolicy::Automatic => {
                self.inner.condvar.notify_one();
            }
            ResetPolicy::Manual => {
                self.inner.condvar.notify_all();
            }
        }
    }

    pub fn is_signaled(&self) -> bool {
        *self.inner.signaled.lock()
    }

    pub fn reset(&self) {
        *self.inner.signaled.lock() = false;
    }

    /// Block until signaled. Fails without waiting if the current thread
    /// has waiting disallowed.
    pub fn wait(&self) -> Result<()> {
        restrictions::assert_wait_allowed()?;

        let mut signaled = self.inner.signaled.lock();
        while !*signaled {
            self.inner.condvar.wait(&mut signaled);
        }
        self.consume(&mut signaled);
        Ok(())
    }

    /// Block until signaled or until `timeout` elapses. Returns whether the
    /// signal was observed.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool> {
        restrictions::assert_wait_allowed()?;

        let deadline = Instant::now() + timeout;
        let mut signaled = self.inner.signaled.lock();
        while !*signaled {
            if self
                .inner
                .condvar
                .wait_until(&mut signaled, deadline)
                .timed_out()
            {
                break;
            }
        }

        let observed = *signaled;
        if observed {
            self.consume(&mut signaled);
        }
        Ok(observed)
    }

    pub fn wait_with_policy(&self, policy: WaitPolicy) -> Result<bool> {
        match policy {
            WaitPolicy::Unbounded => self.wait().map(|()| true),
            WaitPolicy::Bounded(timeout) => self.wait_timeout(timeout),
        }
    }

    fn consume(&self, signaled: &mut bool) {
        if self.inner.policy == ResetPolicy::Automatic {
            *signaled = false;
        }
    }
}

impl fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("policy", &self.inner.policy)
            .field("signaled", &self.is_signaled())
            .finish()
    }
}
