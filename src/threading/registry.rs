//! # Thread Registry
//!
//! Explicit owner of the host threads and their task queues. Created once at
//! process start, passed by reference (or `Arc`) to everything that needs to
//! post work or check thread identity, and shut down at process stop.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::panic::Location;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, info, warn};

use super::restrictions;
use super::task_runner::{Task, TaskQueue, TaskRunner};
use super::HostThread;
use crate::config::ThreadsConfig;
use crate::error::{BridgeError, Result};

type Bindings = Arc<DashMap<HostThread, ThreadId>>;

/// Answers "which host thread am I on?" without holding the whole registry
#[derive(Clone)]
pub struct ThreadChecker {
    bindings: Bindings,
}

impl ThreadChecker {
    pub fn current(&self) -> Option<HostThread> {
        let id = thread::current().id();
        self.bindings
            .iter()
            .find(|entry| *entry.value() == id)
            .map(|entry| *entry.key())
    }

    pub fn is_current(&self, host_thread: HostThread) -> bool {
        self.bindings
            .get(&host_thread)
            .map(|bound| *bound == thread::current().id())
            .unwrap_or(false)
    }

    pub fn is_bound(&self, host_thread: HostThread) -> bool {
        self.bindings.contains_key(&host_thread)
    }
}

impl fmt::Debug for ThreadChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadChecker")
            .field("bound", &self.bindings.len())
            .finish()
    }
}

pub struct ThreadRegistry {
    queues: [Arc<TaskQueue>; 2],
    bindings: Bindings,
    io_thread: Mutex<Option<JoinHandle<()>>>,
    config: ThreadsConfig,
}

impl ThreadRegistry {
    /// Create the registry and its queues without starting any thread
    pub fn new(config: &ThreadsConfig) -> Arc<Self> {
        Arc::new(Self {
            queues: [
                Arc::new(TaskQueue::new(HostThread::Ui, config.queue_capacity)),
                Arc::new(TaskQueue::new(HostThread::Io, config.queue_capacity)),
            ],
            bindings: Arc::new(DashMap::new()),
            io_thread: Mutex::new(None),
            config: config.clone(),
        })
    }

    /// Create the registry and spawn the I/O thread
    pub fn start(config: &ThreadsConfig) -> Result<Arc<Self>> {
        let registry = Self::new(config);
        registry.spawn_io_thread()?;
        Ok(registry)
    }

    /// Spawn the I/O thread and block until it is bound and serving its queue
    pub fn spawn_io_thread(&self) -> Result<()> {
        let mut io_thread = self.io_thread.lock();
        if io_thread.is_some() || self.bindings.contains_key(&HostThread::Io) {
            return Err(BridgeError::target_unavailable(
                HostThread::Io.as_str(),
                "io thread already running",
            ));
        }

        let queue = self.queue(HostThread::Io).clone();
        let bindings = self.bindings.clone();
        let (ready_tx, ready_rx) = crossbeam::channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name(self.config.io_thread_name.clone())
            .spawn(move || {
                restrictions::set_wait_allowed(false);
                bindings.insert(HostThread::Io, thread::current().id());
                let _ = ready_tx.send(());

                let processed = serve_until_closed(&queue);

                bindings.remove(&HostThread::Io);
                debug!(processed = processed, "I/O thread exiting");
            })
            .map_err(|e| {
                BridgeError::target_unavailable(
                    HostThread::Io.as_str(),
                    format!("failed to spawn thread: {e}"),
                )
            })?;

        ready_rx.recv().map_err(|_| {
            BridgeError::target_unavailable(HostThread::Io.as_str(), "thread exited during startup")
        })?;

        info!(
            thread_name = %self.config.io_thread_name,
            "I/O thread started"
        );

        *io_thread = Some(handle);
        Ok(())
    }

    /// Bind the calling OS thread as `host_thread`. Waiting is disallowed on
    /// it until the returned binding is dropped.
    pub fn adopt_current_thread(&self, host_thread: HostThread) -> Result<ThreadBinding> {
        if self.queue(host_thread).is_closed() {
            return Err(BridgeError::target_unavailable(
                host_thread.as_str(),
                "registry is shut down",
            ));
        }

        let id = thread::current().id();
        if self.bindings.iter().any(|entry| *entry.value() == id) {
            return Err(BridgeError::target_unavailable(
                host_thread.as_str(),
                "current thread is already bound",
            ));
        }

        match self.bindings.entry(host_thread) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(BridgeError::target_unavailable(
                    host_thread.as_str(),
                    "host thread already bound to another OS thread",
                ));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let previous_wait_allowed = restrictions::set_wait_allowed(false);
        debug!(host_thread = %host_thread, "Adopted current thread");

        Ok(ThreadBinding {
            host_thread,
            bindings: self.bindings.clone(),
            previous_wait_allowed,
            _not_send: PhantomData,
        })
    }

    pub fn checker(&self) -> ThreadChecker {
        ThreadChecker {
            bindings: self.bindings.clone(),
        }
    }

    pub fn current(&self) -> Option<HostThread> {
        self.checker().current()
    }

    pub fn currently_on(&self, host_thread: HostThread) -> bool {
        self.checker().is_current(host_thread)
    }

    pub fn task_runner(&self, host_thread: HostThread) -> TaskRunner {
        TaskRunner::new(self.queue(host_thread).clone())
    }

    /// Post a task to `host_thread`'s queue
    #[track_caller]
    pub fn post_task<F>(&self, host_thread: HostThread, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue(host_thread).post(Task::new(Location::caller(), f))
    }

    pub fn config(&self) -> &ThreadsConfig {
        &self.config
    }

    pub fn thread_name(&self, host_thread: HostThread) -> &str {
        match host_thread {
            HostThread::Ui => &self.config.ui_thread_name,
            HostThread::Io => &self.config.io_thread_name,
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.queues.iter().all(|queue| queue.is_closed())
    }

    /// Close every queue, let the I/O thread finish what is already queued,
    /// join it, then drop anything left unrun. Idempotent.
    pub fn shutdown(&self) {
        let already_closed = self.is_shut_down();
        for queue in &self.queues {
            queue.close();
        }

        if let Some(handle) = self.io_thread.lock().take() {
            if handle.thread().id() == thread::current().id() {
                warn!("Shutdown requested from the I/O thread; not joining");
            } else if handle.join().is_err() {
                warn!("I/O thread terminated abnormally");
            }
        }

        let dropped: usize = self.queues.iter().map(|queue| queue.drain()).sum();
        if !already_closed {
            info!(dropped_tasks = dropped, "Thread registry shut down");
        }
    }

    pub(crate) fn queue(&self, host_thread: HostThread) -> &Arc<TaskQueue> {
        &self.queues[host_thread.index()]
    }
}

impl Drop for ThreadRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ThreadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadRegistry")
            .field("config", &self.config)
            .field("bound", &self.bindings.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Top-level loop of a registry-owned thread
fn serve_until_closed(queue: &TaskQueue) -> usize {
    let mut processed = 0;
    while let Some(task) = queue.recv() {
        task.run();
        processed += 1;
        if queue.is_closed() && queue.len() == 0 {
            break;
        }
    }
    processed
}

/// Keeps an adopted OS thread bound to its host thread identity
#[derive(Debug)]
pub struct ThreadBinding {
    host_thread: HostThread,
    bindings: Bindings,
    previous_wait_allowed: bool,
    _not_send: PhantomData<*const ()>,
}

impl ThreadBinding {
    pub fn host_thread(&self) -> HostThread {
        self.host_thread
    }
}

impl Drop for ThreadBinding {
    fn drop(&mut self) {
        self.bindings.remove(&self.host_thread);
        restrictions::set_wait_allowed(self.previous_wait_allowed);
    }
}
