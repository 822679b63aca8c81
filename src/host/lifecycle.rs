//! App lifecycle: termination bookkeeping for hosted apps.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

#[derive(Debug, Default)]
pub struct AppLifecycleService {
    terminated: DashMap<String, DateTime<Utc>>,
}

impl AppLifecycleService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminate `app_id`. Returns false if it was already terminated.
    pub fn terminate(&self, app_id: &str) -> bool {
        match self.terminated.entry(app_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let at = Utc::now();
                slot.insert(at);
                info!(app_id = %app_id, terminated_at = %at.to_rfc3339(), "App terminated");
                true
            }
        }
    }

    pub fn is_terminated(&self, app_id: &str) -> bool {
        self.terminated.contains_key(app_id)
    }

    pub fn terminated_at(&self, app_id: &str) -> Option<DateTime<Utc>> {
        self.terminated.get(app_id).map(|entry| *entry.value())
    }
}
