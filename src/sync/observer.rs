//! Completion observers.
//!
//! Subsystems hold their observers weakly: an observer that has been dropped
//! is skipped and pruned on the next notification, never called.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Receives the outcome of an asynchronous operation
pub trait CompletionSink<T>: Send + Sync {
    fn on_complete(&self, outcome: T);
}

/// Registration handle returned by `ObserverList::add`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

type Entry<T> = (ObserverId, Weak<dyn CompletionSink<T>>);

pub struct ObserverList<T> {
    next_id: AtomicU64,
    observers: Mutex<Vec<Entry<T>>>,
}

impl<T> ObserverList<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, sink: &Arc<dyn CompletionSink<T>>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::downgrade(sink)));
        id
    }

    /// Returns false if `id` was not registered
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }
}

impl<T: Clone> ObserverList<T> {
    /// Deliver `outcome` to every live observer. The list lock is released
    /// before any sink runs, so sinks may add or remove observers.
    pub fn notify(&self, outcome: T) -> usize {
        let live: Vec<Arc<dyn CompletionSink<T>>> = {
            let mut observers = self.observers.lock();
            observers.retain(|(_, weak)| weak.strong_count() > 0);
            observers.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };

        for sink in &live {
            sink.on_complete(outcome.clone());
        }
        live.len()
    }
}

impl<T> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ObserverList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Mutex<Vec<u32>>);

    impl CompletionSink<u32> for Recorder {
        fn on_complete(&self, outcome: u32) {
            self.0.lock().push(outcome);
        }
    }

    #[test]
    fn test_notify_reaches_registered_sinks() {
        let list = ObserverList::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let sink: Arc<dyn CompletionSink<u32>> = recorder.clone();

        let id = list.add(&sink);
        assert_eq!(list.notify(7), 1);
        assert!(list.remove(id));
        assert_eq!(list.notify(8), 0);
        assert!(!list.remove(id));

        assert_eq!(*recorder.0.lock(), vec![7]);
    }

    #[test]
    fn test_dropped_sinks_are_pruned() {
        let list = ObserverList::new();
        {
            let sink: Arc<dyn CompletionSink<u32>> = Arc::new(Recorder(Mutex::new(Vec::new())));
            list.add(&sink);
            assert_eq!(list.len(), 1);
        }
        assert_eq!(list.notify(1), 0);
        assert!(list.is_empty());
    }
}
