//! Everything a host function can reach: the thread registry, the hosted
//! app's description and the host collaborators.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::host::{
    AppLifecycleService, AppWindowRegistry, BrowsingDataService, BrowsingDataStore, CommandLine,
    Package, RequestContext,
};
use crate::sync::WaitPolicy;
use crate::threading::{HostThread, ThreadAffine, ThreadRegistry};

pub struct FunctionContext {
    registry: Arc<ThreadRegistry>,
    app_id: String,
    command_line: Arc<CommandLine>,
    package: Package,
    data_path: PathBuf,
    window_registry: Option<Arc<AppWindowRegistry>>,
    lifecycle: Arc<AppLifecycleService>,
    request_context: Option<Arc<ThreadAffine<RequestContext>>>,
    browsing_data: Arc<BrowsingDataService>,
    blocking_call_policy: WaitPolicy,
    callback_policy: WaitPolicy,
}

impl FunctionContext {
    /// Context with fresh collaborators: an empty window registry, an I/O
    /// owned request context and an empty browsing data store
    pub fn new(registry: Arc<ThreadRegistry>, config: &BridgeConfig, command_line: CommandLine) -> Self {
        let request_context = Arc::new(ThreadAffine::new(
            HostThread::Io,
            registry.checker(),
            RequestContext::default(),
        ));
        let browsing_data = Arc::new(BrowsingDataService::new(
            registry.clone(),
            BrowsingDataStore::new(),
        ));

        Self {
            app_id: config.app.app_id.clone(),
            command_line: Arc::new(command_line),
            package: Package::new(config.app.self_extract),
            data_path: config.app.resolved_data_path(),
            window_registry: Some(Arc::new(AppWindowRegistry::new())),
            lifecycle: Arc::new(AppLifecycleService::new()),
            request_context: Some(request_context),
            browsing_data,
            blocking_call_policy: config.wait.blocking_call_policy(),
            callback_policy: config.wait.callback_policy(),
            registry,
        }
    }

    pub fn with_window_registry(mut self, window_registry: Option<Arc<AppWindowRegistry>>) -> Self {
        self.window_registry = window_registry;
        self
    }

    pub fn with_request_context(
        mut self,
        request_context: Option<Arc<ThreadAffine<RequestContext>>>,
    ) -> Self {
        self.request_context = request_context;
        self
    }

    pub fn with_browsing_data(mut self, browsing_data: Arc<BrowsingDataService>) -> Self {
        self.browsing_data = browsing_data;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<AppLifecycleService>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_package(mut self, package: Package) -> Self {
        self.package = package;
        self
    }

    pub fn registry(&self) -> &Arc<ThreadRegistry> {
        &self.registry
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.command_line
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn window_registry(&self) -> Option<&Arc<AppWindowRegistry>> {
        self.window_registry.as_ref()
    }

    pub fn lifecycle(&self) -> &Arc<AppLifecycleService> {
        &self.lifecycle
    }

    pub fn request_context(&self) -> Option<&Arc<ThreadAffine<RequestContext>>> {
        self.request_context.as_ref()
    }

    pub fn browsing_data(&self) -> &Arc<BrowsingDataService> {
        &self.browsing_data
    }

    pub fn blocking_call_policy(&self) -> WaitPolicy {
        self.blocking_call_policy
    }

    pub fn callback_policy(&self) -> WaitPolicy {
        self.callback_policy
    }
}

impl fmt::Debug for FunctionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionContext")
            .field("app_id", &self.app_id)
            .field("data_path", &self.data_path)
            .field("has_window_registry", &self.window_registry.is_some())
            .field("has_request_context", &self.request_context.is_some())
            .field("blocking_call_policy", &self.blocking_call_policy)
            .field("callback_policy", &self.callback_policy)
            .finish_non_exhaustive()
    }
}
