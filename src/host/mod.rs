//! # Host Collaborators
//!
//! In-process models of the host subsystems the app functions drive: proxy
//! resolution and browsing data (both owned by the I/O thread), the app
//! window registry and lifecycle service (UI thread), and the process
//! command line.

pub mod browsing_data;
pub mod lifecycle;
pub mod process;
pub mod proxy;
pub mod windows;

pub use browsing_data::{
    BrowsingDataRemover, BrowsingDataService, BrowsingDataStore, DataTypeMask, OriginTypeMask,
    RemovalOutcome, RemovalRequest, RemovalResult, StoredEntry, TimeRange,
};
pub use lifecycle::AppLifecycleService;
pub use process::{CommandLine, Package};
pub use proxy::{
    FixedProxyConfigService, ProxyConfig, ProxyConfigRequest, ProxyConfigService,
    ProxyParseError, ProxyResolutionService, ProxyRules, ProxyScheme, ProxyServer, RequestContext,
};
pub use windows::{AppWindow, AppWindowRegistry};
