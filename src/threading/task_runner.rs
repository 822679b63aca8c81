//! Serial task queues and the handles used to post into them.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::RwLock;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, trace};

use super::HostThread;
use crate::error::{BridgeError, Result};

/// A unit of work posted to a host thread. Runs at most once.
pub struct Task {
    run: Box<dyn FnOnce() + Send + 'static>,
    posted_from: &'static Location<'static>,
}

impl Task {
    pub fn new<F>(posted_from: &'static Location<'static>, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            run: Box::new(f),
            posted_from,
        }
    }

    pub fn posted_from(&self) -> &'static Location<'static> {
        self.posted_from
    }

    /// Run the task, containing any panic so the owning thread keeps serving
    /// its queue. Returns false if the task panicked.
    pub fn run(self) -> bool {
        let posted_from = self.posted_from;
        match panic::catch_unwind(AssertUnwindSafe(self.run)) {
            Ok(()) => true,
            Err(payload) => {
                error!(
                    posted_from = %posted_from,
                    panic = %panic_message(payload.as_ref()),
                    "Task panicked"
                );
                false
            }
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("posted_from", &self.posted_from)
            .finish_non_exhaustive()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// FIFO queue owned by one host thread.
///
/// Posting and closing are serialized through `accepting`, so once `close`
/// returns no further task can enter the queue.
pub(crate) struct TaskQueue {
    thread: HostThread,
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    accepting: RwLock<bool>,
}

impl TaskQueue {
    pub(crate) fn new(thread: HostThread, capacity: Option<usize>) -> Self {
        let (sender, receiver) = match capacity {
            Some(cap) => channel::bounded(cap),
            None => channel::unbounded(),
        };
        Self {
            thread,
            sender,
            receiver,
            accepting: RwLock::new(true),
        }
    }

    pub(crate) fn post(&self, task: Task) -> Result<()> {
        let accepting = self.accepting.read();
        if !*accepting {
            return Err(BridgeError::target_unavailable(
                self.thread.as_str(),
                "task queue closed",
            ));
        }

        trace!(thread = %self.thread, posted_from = %task.posted_from(), "Posting task");

        match self.sender.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(BridgeError::target_unavailable(
                self.thread.as_str(),
                "task queue full",
            )),
            Err(TrySendError::Disconnected(_)) => Err(BridgeError::target_unavailable(
                self.thread.as_str(),
                "task queue disconnected",
            )),
        }
    }

    /// Push a no-op so a thread blocked in `recv` re-checks its exit conditions.
    /// Bypasses `accepting`; a full queue already guarantees a wake-up.
    #[track_caller]
    pub(crate) fn wake(&self) {
        let _ = self.sender.try_send(Task::new(Location::caller(), || {}));
    }

    pub(crate) fn close(&self) {
        *self.accepting.write() = false;
        self.wake();
    }

    pub(crate) fn is_closed(&self) -> bool {
        !*self.accepting.read()
    }

    pub(crate) fn recv(&self) -> Option<Task> {
        self.receiver.recv().ok()
    }

    pub(crate) fn recv_deadline(&self, deadline: Instant) -> std::result::Result<Task, RecvTimeoutError> {
        self.receiver.recv_deadline(deadline)
    }

    pub(crate) fn try_recv(&self) -> Option<Task> {
        match self.receiver.try_recv() {
            Ok(task) => Some(task),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Drop every queued task without running it
    pub(crate) fn drain(&self) -> usize {
        let mut dropped = 0;
        while let Some(task) = self.try_recv() {
            drop(task);
            dropped += 1;
        }
        dropped
    }
}

/// Cloneable handle for posting work onto one host thread's queue
#[derive(Clone)]
pub struct TaskRunner {
    queue: Arc<TaskQueue>,
}

impl TaskRunner {
    pub(crate) fn new(queue: Arc<TaskQueue>) -> Self {
        Self { queue }
    }

    pub fn thread(&self) -> HostThread {
        self.queue.thread
    }

    /// Post a task to the end of the queue
    #[track_caller]
    pub fn post_task<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.post(Task::new(Location::caller(), f))
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    pub(crate) fn wake(&self) {
        self.queue.wake();
    }
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("thread", &self.queue.thread)
            .field("pending", &self.queue.len())
            .finish()
    }
}
