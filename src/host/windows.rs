//! App window registry.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug)]
pub struct AppWindow {
    id: Uuid,
    app_id: String,
    title: String,
    can_close: bool,
    closed: AtomicBool,
}

impl AppWindow {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether the app allows this window to be closed programmatically
    pub fn can_close(&self) -> bool {
        self.can_close
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns false if the window was already closed
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }
}

#[derive(Debug, Default)]
pub struct AppWindowRegistry {
    windows: DashMap<Uuid, Arc<AppWindow>>,
}

impl AppWindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_window(
        &self,
        app_id: impl Into<String>,
        title: impl Into<String>,
        can_close: bool,
    ) -> Arc<AppWindow> {
        let window = Arc::new(AppWindow {
            id: Uuid::new_v4(),
            app_id: app_id.into(),
            title: title.into(),
            can_close,
            closed: AtomicBool::new(false),
        });
        self.windows.insert(window.id, window.clone());
        window
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<AppWindow>> {
        self.windows.get(&id).map(|entry| entry.value().clone())
    }

    /// Open windows belonging to `app_id`
    pub fn windows_for_app(&self, app_id: &str) -> Vec<Arc<AppWindow>> {
        self.windows
            .iter()
            .filter(|entry| entry.app_id == app_id && !entry.is_closed())
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Close every closable window of `app_id` and drop it from the registry.
    /// Returns how many were closed.
    pub fn close_all_for_app(&self, app_id: &str) -> usize {
        let mut closed = 0;
        for window in self.windows_for_app(app_id) {
            if window.can_close() && window.close() {
                self.windows.remove(&window.id);
                closed += 1;
            }
        }
        debug!(app_id = %app_id, closed = closed, "Closed app windows");
        closed
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
