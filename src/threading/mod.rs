//! # Host Threading Model
//!
//! A small fixed set of named host threads, each with its own serial task
//! queue:
//!
//! - **ui**: the dispatch thread. It is *adopted*: the embedding application
//!   binds its own thread with [`ThreadRegistry::adopt_current_thread`] and
//!   pumps the queue through [`RunLoop`](crate::sync::RunLoop).
//! - **io**: spawned and owned by the registry. Resources mutated by blocking
//!   calls (proxy configuration, browsing data) live here.
//!
//! Every resource with a single owning thread is wrapped in [`ThreadAffine`],
//! so all mutation happens on that thread and the caller side never touches
//! it directly.
//!
//! Threads bound into the registry start with blocking waits disallowed; see
//! [`restrictions`].

pub mod host_thread;
pub mod registry;
pub mod restrictions;
pub mod task_runner;
pub mod thread_affine;

pub use host_thread::HostThread;
pub use registry::{ThreadBinding, ThreadChecker, ThreadRegistry};
pub use restrictions::ScopedAllowWait;
pub use task_runner::{Task, TaskRunner};
pub use thread_affine::ThreadAffine;
