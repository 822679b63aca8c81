//! # Run Loop
//!
//! Re-entrant pump over the current host thread's own task queue. A run loop
//! is created on a bound host thread and runs queued tasks in FIFO order
//! until its [`QuitHandle`] fires. Loops nest: a task run by one loop may
//! create and run another, which keeps serving the same queue.
//!
//! Quitting before `run` is entered is latched, so a completion delivered
//! synchronously still ends the loop immediately.

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

use super::WaitPolicy;
use crate::error::{BridgeError, Result};
use crate::threading::task_runner::TaskQueue;
use crate::threading::{HostThread, TaskRunner, ThreadRegistry};

thread_local! {
    static NESTING_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Current run loop nesting depth on this thread (0 when no loop is running)
pub fn nesting_depth() -> usize {
    NESTING_DEPTH.with(Cell::get)
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> (Self, usize) {
        let depth = NESTING_DEPTH.with(|d| {
            let next = d.get() + 1;
            d.set(next);
            next
        });
        (DepthGuard, depth)
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        NESTING_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Ends a [`RunLoop`]. Cloneable and usable from any thread.
#[derive(Clone, Debug)]
pub struct QuitHandle {
    quit: Arc<AtomicBool>,
    runner: TaskRunner,
}

impl QuitHandle {
    pub fn quit(&self) {
        if !self.quit.swap(true, Ordering::AcqRel) {
            // Wake the loop in case it is parked on an empty queue
            self.runner.wake();
        }
    }

    pub fn is_quit(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }
}

pub struct RunLoop {
    thread: HostThread,
    queue: Arc<TaskQueue>,
    runner: TaskRunner,
    quit: Arc<AtomicBool>,
    _not_send: PhantomData<*const ()>,
}

impl RunLoop {
    /// Create a loop over the current thread's queue
    pub fn new(registry: &ThreadRegistry) -> Result<Self> {
        let thread = registry.current().ok_or(BridgeError::NotOnHostThread)?;
        Ok(Self {
            thread,
            queue: registry.queue(thread).clone(),
            runner: registry.task_runner(thread),
            quit: Arc::new(AtomicBool::new(false)),
            _not_send: PhantomData,
        })
    }

    pub fn thread(&self) -> HostThread {
        self.thread
    }

    pub fn quit_handle(&self) -> QuitHandle {
        QuitHandle {
            quit: self.quit.clone(),
            runner: self.runner.clone(),
        }
    }

    /// Run tasks until quit
    pub fn run(&self) -> Result<()> {
        self.run_with_policy(WaitPolicy::Unbounded)
    }

    /// Run tasks until quit, or until the policy's timeout elapses
    pub fn run_with_policy(&self, policy: WaitPolicy) -> Result<()> {
        let (_depth_guard, depth) = DepthGuard::enter();
        let deadline = policy.timeout().map(|timeout| Instant::now() + timeout);
        let mut processed = 0usize;

        debug!(thread = %self.thread, depth = depth, "Run loop entered");

        let outcome = loop {
            if self.quit.load(Ordering::Acquire) {
                break Ok(());
            }
            if self.queue.is_closed() && self.queue.len() == 0 {
                break Err(BridgeError::target_unavailable(
                    self.thread.as_str(),
                    "task queue closed while run loop was waiting",
                ));
            }

            let task = match deadline {
                None => self.queue.recv(),
                Some(deadline) => match self.queue.recv_deadline(deadline) {
                    Ok(task) => Some(task),
                    Err(_) => {
                        break Err(BridgeError::Timeout {
                            operation: format!("run_loop:{}", self.thread),
                            timeout_ms: policy.timeout_ms(),
                        });
                    }
                },
            };

            if let Some(task) = task {
                trace!(posted_from = %task.posted_from(), depth = depth, "Running task");
                task.run();
                processed += 1;
            }
        };

        debug!(
            thread = %self.thread,
            depth = depth,
            processed = processed,
            quit = self.quit.load(Ordering::Acquire),
            "Run loop exited"
        );
        outcome
    }

    /// Run every task already queued, without waiting for new ones. Stops
    /// early if quit. Returns how many tasks ran.
    pub fn run_until_idle(&self) -> usize {
        let (_depth_guard, _) = DepthGuard::enter();
        let mut processed = 0;
        while !self.quit.load(Ordering::Acquire) {
            match self.queue.try_recv() {
                Some(task) => {
                    task.run();
                    processed += 1;
                }
                None => break,
            }
        }
        processed
    }
}
