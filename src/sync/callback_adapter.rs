//! # Callback-to-Synchronous Adapter
//!
//! Turns a subsystem that reports completion through an observer into a call
//! that returns the outcome. The calling host thread keeps serving its own
//! queue in a nested [`RunLoop`] while it waits, which is also how the
//! completion itself reaches it when the subsystem posts it back.
//!
//! The subsystem handle is taken by value and dropped once the observer has
//! been removed, so no registration outlives the call.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::observer::{CompletionSink, ObserverId};
use super::run_loop::{QuitHandle, RunLoop};
use super::WaitPolicy;
use crate::error::{BridgeError, Result};
use crate::logging::log_bridge_operation;
use crate::threading::ThreadRegistry;

/// A subsystem whose operations complete by notifying registered observers
pub trait AsyncSubsystem {
    type Request;
    type Output: Send + 'static;

    fn add_observer(&mut self, sink: &Arc<dyn CompletionSink<Self::Output>>) -> ObserverId;

    fn remove_observer(&mut self, id: ObserverId);

    /// Start the operation. Completion may be reported before this returns.
    fn issue(&mut self, request: Self::Request) -> Result<()>;
}

/// Sink registered for a single `call_sync`. Keeps the first outcome and
/// ends the nested loop; anything delivered afterwards is ignored.
struct SyncCompletion<T> {
    outcome: Mutex<Option<T>>,
    fired: AtomicBool,
    quit: QuitHandle,
}

impl<T> SyncCompletion<T> {
    fn new(quit: QuitHandle) -> Self {
        Self {
            outcome: Mutex::new(None),
            fired: AtomicBool::new(false),
            quit,
        }
    }

    fn take(&self) -> Option<T> {
        self.outcome.lock().take()
    }
}

impl<T: Send> CompletionSink<T> for SyncCompletion<T> {
    fn on_complete(&self, outcome: T) {
        if self.fired.swap(true, Ordering::AcqRel) {
            warn!("Completion delivered more than once; ignoring");
            return;
        }
        *self.outcome.lock() = Some(outcome);
        self.quit.quit();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CallbackAdapter<'r> {
    registry: &'r ThreadRegistry,
    policy: WaitPolicy,
}

impl<'r> CallbackAdapter<'r> {
    pub fn new(registry: &'r ThreadRegistry) -> Self {
        Self::with_policy(registry, WaitPolicy::Unbounded)
    }

    pub fn with_policy(registry: &'r ThreadRegistry, policy: WaitPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Issue `request` on `subsystem` and run the current thread's queue
    /// until the subsystem reports completion.
    ///
    /// Must be called on a bound host thread. The observer is removed and
    /// `subsystem` dropped before this returns, whatever the outcome.
    pub fn call_sync<S>(&self, mut subsystem: S, request: S::Request) -> Result<S::Output>
    where
        S: AsyncSubsystem,
    {
        let started = Instant::now();
        let run_loop = RunLoop::new(self.registry)?;
        let thread = run_loop.thread();

        let completion = Arc::new(SyncCompletion::new(run_loop.quit_handle()));
        let sink: Arc<dyn CompletionSink<S::Output>> = completion.clone();
        let observer = subsystem.add_observer(&sink);
        debug!(thread = %thread, observer = %observer, "Callback adapter registered observer");

        if let Err(e) = subsystem.issue(request) {
            subsystem.remove_observer(observer);
            log_bridge_operation(
                "call_sync",
                thread.as_str(),
                "issue_failed",
                Some(elapsed_ms(started)),
                Some(&e.to_string()),
            );
            return Err(e);
        }

        let loop_result = run_loop.run_with_policy(self.policy);

        subsystem.remove_observer(observer);
        drop(subsystem);
        drop(sink);

        let result = match (completion.take(), loop_result) {
            (Some(output), _) => Ok(output),
            (None, Err(BridgeError::Timeout { timeout_ms, .. })) => {
                warn!(
                    thread = %thread,
                    timeout_ms = timeout_ms,
                    "Callback adapter timed out; a late completion will be dropped"
                );
                Err(BridgeError::Timeout {
                    operation: format!("call_sync:{thread}"),
                    timeout_ms,
                })
            }
            (None, Err(e)) => Err(e),
            (None, Ok(())) => Err(BridgeError::work_item_failed(
                "run loop exited without a completion",
            )),
        };

        log_bridge_operation(
            "call_sync",
            thread.as_str(),
            if result.is_ok() { "completed" } else { "failed" },
            Some(elapsed_ms(started)),
            result.as_ref().err().map(|e| e.to_string()).as_deref(),
        );
        result
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThreadsConfig;
    use crate::sync::ObserverList;
    use crate::threading::HostThread;
    use std::time::Duration;

    /// Completes on the I/O thread and posts the outcome back to the issuer
    struct EchoSubsystem {
        registry: Arc<ThreadRegistry>,
        observers: Arc<ObserverList<u32>>,
        deliveries: usize,
    }

    impl EchoSubsystem {
        fn new(registry: &Arc<ThreadRegistry>, deliveries: usize) -> Self {
            Self {
                registry: registry.clone(),
                observers: Arc::new(ObserverList::new()),
                deliveries,
            }
        }
    }

    impl AsyncSubsystem for EchoSubsystem {
        type Request = u32;
        type Output = u32;

        fn add_observer(&mut self, sink: &Arc<dyn CompletionSink<u32>>) -> ObserverId {
            self.observers.add(sink)
        }

        fn remove_observer(&mut self, id: ObserverId) {
            self.observers.remove(id);
        }

        fn issue(&mut self, request: u32) -> Result<()> {
            let reply_to = self
                .registry
                .task_runner(self.registry.current().ok_or(BridgeError::NotOnHostThread)?);
            let observers = self.observers.clone();
            let deliveries = self.deliveries;
            self.registry.post_task(HostThread::Io, move || {
                for _ in 0..deliveries {
                    let observers = observers.clone();
                    let _ = reply_to.post_task(move || {
                        observers.notify(request * 2);
                    });
                }
            })
        }
    }

    /// Reports completion from inside `issue`
    struct InlineSubsystem {
        observers: ObserverList<&'static str>,
    }

    impl AsyncSubsystem for InlineSubsystem {
        type Request = ();
        type Output = &'static str;

        fn add_observer(&mut self, sink: &Arc<dyn CompletionSink<&'static str>>) -> ObserverId {
            self.observers.add(sink)
        }

        fn remove_observer(&mut self, id: ObserverId) {
            self.observers.remove(id);
        }

        fn issue(&mut self, _request: ()) -> Result<()> {
            self.observers.notify("done");
            Ok(())
        }
    }

    fn setup() -> Arc<ThreadRegistry> {
        ThreadRegistry::start(&ThreadsConfig::default()).unwrap()
    }

    #[test]
    fn test_completion_posted_back_is_returned() {
        let registry = setup();
        let _binding = registry.adopt_current_thread(HostThread::Ui).unwrap();
        let subsystem = EchoSubsystem::new(&registry, 1);
        let observers = subsystem.observers.clone();

        let output = CallbackAdapter::new(&registry).call_sync(subsystem, 21).unwrap();
        assert_eq!(output, 42);
        assert!(observers.is_empty());
    }

    #[test]
    fn test_synchronous_completion_inside_issue() {
        let registry = setup();
        let _binding = registry.adopt_current_thread(HostThread::Ui).unwrap();
        let subsystem = InlineSubsystem {
            observers: ObserverList::new(),
        };

        let output = CallbackAdapter::with_policy(
            &registry,
            WaitPolicy::Bounded(Duration::from_secs(1)),
        )
        .call_sync(subsystem, ())
        .unwrap();
        assert_eq!(output, "done");
    }

    #[test]
    fn test_duplicate_completion_is_ignored() {
        let registry = setup();
        let _binding = registry.adopt_current_thread(HostThread::Ui).unwrap();
        let subsystem = EchoSubsystem::new(&registry, 3);

        let output = CallbackAdapter::new(&registry).call_sync(subsystem, 1).unwrap();
        assert_eq!(output, 2);
    }

    #[test]
    fn test_issue_failure_deregisters_observer() {
        let registry = setup();
        let _binding = registry.adopt_current_thread(HostThread::Ui).unwrap();
        let subsystem = EchoSubsystem::new(&registry, 1);
        let observers = subsystem.observers.clone();
        registry.shutdown();

        let err = CallbackAdapter::new(&registry).call_sync(subsystem, 1).unwrap_err();
        assert!(matches!(err, BridgeError::TargetUnavailable { .. }));
        assert!(observers.is_empty());
    }

    #[test]
    fn test_bounded_wait_times_out_and_deregisters() {
        let registry = setup();
        let _binding = registry.adopt_current_thread(HostThread::Ui).unwrap();
        let subsystem = EchoSubsystem::new(&registry, 0);
        let observers = subsystem.observers.clone();

        let err = CallbackAdapter::with_policy(&registry, WaitPolicy::Bounded(Duration::from_millis(20)))
            .call_sync(subsystem, 1)
            .unwrap_err();
        match err {
            BridgeError::Timeout { operation, timeout_ms } => {
                assert_eq!(operation, "call_sync:ui");
                assert_eq!(timeout_ms, 20);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(observers.is_empty());
    }

    #[test]
    fn test_requires_bound_thread() {
        let registry = setup();
        let subsystem = EchoSubsystem::new(&registry, 1);
        let err = CallbackAdapter::new(&registry).call_sync(subsystem, 1).unwrap_err();
        assert!(matches!(err, BridgeError::NotOnHostThread));
    }
}
