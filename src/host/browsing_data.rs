//! # Browsing Data
//!
//! Profile storage owned by the I/O thread and the observer-based remover
//! used to clear it.
//!
//! A removal issued from a host thread runs against the store on the I/O
//! thread; its outcome is posted back to the issuing thread. There it goes to
//! the observers of the remover handle that issued it, and to the
//! profile-wide observers of the service. A handle's observers never see
//! another handle's removals.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::error::{BridgeError, Result};
use crate::logging::log_error;
use crate::sync::{AsyncSubsystem, CompletionSink, ObserverId, ObserverList};
use crate::threading::{HostThread, ThreadAffine, ThreadRegistry};

bitflags! {
    /// Kinds of stored data
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DataTypeMask: u32 {
        const CACHE = 1 << 0;
        const APP_CACHE = 1 << 1;
        const COOKIES = 1 << 2;
        const LOCAL_STORAGE = 1 << 3;
    }
}

bitflags! {
    /// Classes of origin that own stored data
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OriginTypeMask: u32 {
        const UNPROTECTED_WEB = 1 << 0;
        const PROTECTED_WEB = 1 << 1;
        const EXTENSION = 1 << 2;
    }
}

/// Inclusive time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(begin: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { begin, end }
    }

    pub fn all_time() -> Self {
        Self::new(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.begin <= at && at <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub origin: Url,
    /// Exactly one flag
    pub data_type: DataTypeMask,
    pub origin_type: OriginTypeMask,
    pub size_bytes: u64,
    pub stored_at: DateTime<Utc>,
    /// Owning app-cache group, for `APP_CACHE` entries
    pub manifest_url: Option<Url>,
}

impl StoredEntry {
    pub fn new(origin: Url, data_type: DataTypeMask, size_bytes: u64) -> Self {
        Self {
            origin,
            data_type,
            origin_type: OriginTypeMask::UNPROTECTED_WEB,
            size_bytes,
            stored_at: Utc::now(),
            manifest_url: None,
        }
    }

    pub fn with_origin_type(mut self, origin_type: OriginTypeMask) -> Self {
        self.origin_type = origin_type;
        self
    }

    pub fn with_stored_at(mut self, stored_at: DateTime<Utc>) -> Self {
        self.stored_at = stored_at;
        self
    }

    pub fn in_app_cache_group(mut self, manifest_url: Url) -> Self {
        self.data_type = DataTypeMask::APP_CACHE;
        self.manifest_url = Some(manifest_url);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalRequest {
    pub data_types: DataTypeMask,
    pub origin_types: OriginTypeMask,
    pub range: TimeRange,
}

impl RemovalRequest {
    fn matches(&self, entry: &StoredEntry) -> bool {
        self.data_types.intersects(entry.data_type)
            && self.origin_types.intersects(entry.origin_type)
            && self.range.contains(entry.stored_at)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalOutcome {
    pub removed_entries: usize,
    pub freed_bytes: u64,
}

/// What observers of the remover receive
pub type RemovalResult = std::result::Result<RemovalOutcome, String>;

#[derive(Debug, Default)]
pub struct BrowsingDataStore {
    entries: Vec<StoredEntry>,
}

impl BrowsingDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: StoredEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[StoredEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_of(&self, data_type: DataTypeMask) -> usize {
        self.entries
            .iter()
            .filter(|e| e.data_type.intersects(data_type))
            .count()
    }

    pub fn remove_matching(&mut self, request: &RemovalRequest) -> RemovalOutcome {
        self.remove_where(|entry| request.matches(entry))
    }

    /// Remove every entry of the app-cache group identified by `manifest_url`
    pub fn delete_app_cache_group(&mut self, manifest_url: &Url) -> RemovalOutcome {
        self.remove_where(|entry| {
            entry.data_type == DataTypeMask::APP_CACHE
                && entry.manifest_url.as_ref() == Some(manifest_url)
        })
    }

    fn remove_where(&mut self, mut predicate: impl FnMut(&StoredEntry) -> bool) -> RemovalOutcome {
        let mut outcome = RemovalOutcome::default();
        self.entries.retain(|entry| {
            if predicate(entry) {
                outcome.removed_entries += 1;
                outcome.freed_bytes += entry.size_bytes;
                false
            } else {
                true
            }
        });
        outcome
    }
}

/// Owns the I/O-thread store and the profile-wide removal observers
pub struct BrowsingDataService {
    registry: Arc<ThreadRegistry>,
    store: Arc<ThreadAffine<BrowsingDataStore>>,
    observers: Arc<ObserverList<RemovalResult>>,
}

impl BrowsingDataService {
    pub fn new(registry: Arc<ThreadRegistry>, store: BrowsingDataStore) -> Self {
        let store = Arc::new(ThreadAffine::new(HostThread::Io, registry.checker(), store));
        Self {
            registry,
            store,
            observers: Arc::new(ObserverList::new()),
        }
    }

    /// Store handle; only usable on the I/O thread
    pub fn store(&self) -> &Arc<ThreadAffine<BrowsingDataStore>> {
        &self.store
    }

    pub fn observers(&self) -> &Arc<ObserverList<RemovalResult>> {
        &self.observers
    }

    /// Handle through which one removal is issued
    pub fn remover(&self) -> BrowsingDataRemover {
        BrowsingDataRemover {
            registry: self.registry.clone(),
            store: self.store.clone(),
            profile_observers: self.observers.clone(),
            observers: Arc::new(ObserverList::new()),
        }
    }
}

impl fmt::Debug for BrowsingDataService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowsingDataService")
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

/// Remover handle. Observers added through it only receive outcomes of
/// removals it issued.
pub struct BrowsingDataRemover {
    registry: Arc<ThreadRegistry>,
    store: Arc<ThreadAffine<BrowsingDataStore>>,
    profile_observers: Arc<ObserverList<RemovalResult>>,
    observers: Arc<ObserverList<RemovalResult>>,
}

impl BrowsingDataRemover {
    /// Observers registered on this handle
    pub fn observers(&self) -> &Arc<ObserverList<RemovalResult>> {
        &self.observers
    }
}

impl AsyncSubsystem for BrowsingDataRemover {
    type Request = RemovalRequest;
    type Output = RemovalResult;

    fn add_observer(&mut self, sink: &Arc<dyn CompletionSink<RemovalResult>>) -> ObserverId {
        self.observers.add(sink)
    }

    fn remove_observer(&mut self, id: ObserverId) {
        self.observers.remove(id);
    }

    fn issue(&mut self, request: RemovalRequest) -> Result<()> {
        let reply_thread = self.registry.current().ok_or(BridgeError::NotOnHostThread)?;
        let reply_to = self.registry.task_runner(reply_thread);
        let store = self.store.clone();
        let observers = self.observers.clone();
        let profile_observers = self.profile_observers.clone();

        debug!(
            data_types = ?request.data_types,
            origin_types = ?request.origin_types,
            reply_thread = %reply_thread,
            "Issuing browsing data removal"
        );

        self.registry.post_task(HostThread::Io, move || {
            let result = store
                .with_mut(|store| store.remove_matching(&request))
                .map_err(|e| e.to_string());

            if let Err(e) = &result {
                log_error("browsing_data", "remove_matching", e, None);
            }

            let posted = reply_to.post_task(move || {
                let notified = observers.notify(result.clone());
                let broadcast = profile_observers.notify(result);
                debug!(
                    notified = notified,
                    broadcast = broadcast,
                    "Browsing data removal delivered"
                );
            });
            if posted.is_err() {
                warn!(thread = %reply_thread, "Could not deliver browsing data removal result");
            }
        })
    }
}

impl fmt::Debug for BrowsingDataRemover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowsingDataRemover")
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
