//! # Blocking Cross-Thread Call
//!
//! Runs a work item on another host thread and blocks the caller until the
//! item has run and stored its result.
//!
//! The caller must hold a [`ScopedAllowWait`] permit: host threads are bound
//! with waiting disallowed, and the permit is how a call site declares that
//! it intends to block. Calling into the thread you are already on would wait
//! on your own queue forever, so it is rejected up front.
//!
//! With a bounded [`WaitPolicy`] the caller stops waiting after the timeout,
//! but the work item is not cancelled: it still runs and its effect is still
//! applied. Its result is dropped unread.

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::{CompletionSignal, WaitPolicy};
use crate::error::{BridgeError, Result};
use crate::logging::log_bridge_operation;
use crate::threading::task_runner::panic_message;
use crate::threading::{HostThread, ScopedAllowWait, ThreadRegistry};

type ResultSlot<T> = Arc<Mutex<Option<Result<T>>>>;

/// Worker-side half of a call. Publishes exactly one outcome: the work
/// item's result, or `TargetUnavailable` if the task is dropped unrun.
struct Completion<T> {
    target: HostThread,
    slot: ResultSlot<T>,
    signal: CompletionSignal,
    published: bool,
}

impl<T> Completion<T> {
    fn run<F>(mut self, work: F)
    where
        F: FnOnce() -> Result<T>,
    {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(outcome) => outcome,
            Err(payload) => Err(BridgeError::work_item_failed(format!(
                "work item panicked: {}",
                panic_message(payload.as_ref())
            ))),
        };
        self.publish(outcome);
    }

    fn publish(&mut self, outcome: Result<T>) {
        *self.slot.lock() = Some(outcome);
        self.published = true;
        self.signal.signal();
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if !self.published {
            let target = self.target;
            self.publish(Err(BridgeError::target_unavailable(
                target.as_str(),
                "work item dropped before running",
            )));
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlockingCall<'r> {
    registry: &'r ThreadRegistry,
    policy: WaitPolicy,
}

impl<'r> BlockingCall<'r> {
    pub fn new(registry: &'r ThreadRegistry) -> Self {
        Self::with_policy(registry, WaitPolicy::Unbounded)
    }

    pub fn with_policy(registry: &'r ThreadRegistry, policy: WaitPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Run `work` on `target` and return its result.
    ///
    /// Everything `work` does happens-before this returns. A panic inside
    /// `work` is reported as `WorkItemFailed`.
    pub fn call<T, F>(&self, _permit: &ScopedAllowWait, target: HostThread, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let started = Instant::now();

        if self.registry.currently_on(target) {
            return Err(BridgeError::ReentrantCall {
                thread: target.to_string(),
            });
        }
        if !self.registry.checker().is_bound(target) {
            return Err(BridgeError::target_unavailable(
                target.as_str(),
                "thread is not running",
            ));
        }

        let slot: ResultSlot<T> = Arc::new(Mutex::new(None));
        let signal = CompletionSignal::one_shot();
        let completion = Completion {
            target,
            slot: slot.clone(),
            signal: signal.clone(),
            published: false,
        };

        self.registry
            .post_task(target, move || completion.run(work))?;
        debug!(target_thread = %target, policy = ?self.policy, "Blocking call posted");

        if !signal.wait_with_policy(self.policy)? {
            let timeout_ms = self.policy.timeout_ms();
            warn!(
                target_thread = %target,
                timeout_ms = timeout_ms,
                "Blocking call timed out; work item will still run and its result is discarded"
            );
            log_bridge_operation(
                "blocking_call",
                target.as_str(),
                "timeout",
                Some(elapsed_ms(started)),
                None,
            );
            return Err(BridgeError::Timeout {
                operation: format!("blocking_call:{target}"),
                timeout_ms,
            });
        }

        let outcome = slot.lock().take().unwrap_or_else(|| {
            Err(BridgeError::work_item_failed(
                "work item signalled without a result",
            ))
        });

        log_bridge_operation(
            "blocking_call",
            target.as_str(),
            if outcome.is_ok() { "completed" } else { "failed" },
            Some(elapsed_ms(started)),
            outcome.as_ref().err().map(|e| e.to_string()).as_deref(),
        );
        outcome
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
