//! # Function Dispatcher
//!
//! Looks up host functions by name, runs them on the dispatch thread and
//! turns every outcome into exactly one [`FunctionResponse`].
//!
//! `dispatch` is called on the UI thread itself. Callers on an async runtime
//! use `dispatch_async`, which posts the request onto the UI thread and awaits
//! the response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::app::app_functions;
use super::context::FunctionContext;
use super::function::{Arguments, ExtensionFunction, FunctionRequest, FunctionResponse};
use crate::error::{BridgeError, Result};
use crate::logging::{log_bridge_operation, log_error};
use crate::threading::HostThread;

pub struct FunctionDispatcher {
    functions: HashMap<&'static str, Arc<dyn ExtensionFunction>>,
    context: Arc<FunctionContext>,
}

impl FunctionDispatcher {
    pub fn new(context: Arc<FunctionContext>) -> Self {
        Self {
            functions: HashMap::new(),
            context,
        }
    }

    /// Dispatcher with the full `App` function set registered
    pub fn with_app_functions(context: Arc<FunctionContext>) -> Self {
        let mut dispatcher = Self::new(context);
        for function in app_functions() {
            dispatcher.register(function);
        }
        dispatcher
    }

    /// Register a function, replacing any previous one with the same name
    pub fn register(&mut self, function: Arc<dyn ExtensionFunction>) {
        if self.functions.insert(function.name(), function.clone()).is_some() {
            warn!(function = function.name(), "Replacing registered function");
        }
    }

    pub fn function_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn context(&self) -> &Arc<FunctionContext> {
        &self.context
    }

    pub fn dispatch(&self, request: &FunctionRequest) -> FunctionResponse {
        let started = Instant::now();
        debug!(
            function = %request.name,
            request_id = %request.request_id,
            args = request.args.len(),
            "Dispatching function"
        );

        let result = self.try_dispatch(request);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let request_id = request.request_id.to_string();

        match &result {
            Ok(_) => log_bridge_operation(
                &request.name,
                &current_thread_label(&self.context),
                "success",
                Some(duration_ms),
                Some(&request_id),
            ),
            Err(e) => log_error(
                "dispatcher",
                &request.name,
                &e.to_string(),
                Some(&request_id),
            ),
        }

        FunctionResponse::from(result)
    }

    fn try_dispatch(&self, request: &FunctionRequest) -> Result<Vec<serde_json::Value>> {
        let function = self
            .functions
            .get(request.name.as_str())
            .ok_or_else(|| BridgeError::UnknownFunction {
                name: request.name.clone(),
            })?;
        let args = Arguments::new(&request.name, &request.args);
        function.run(&self.context, &args)
    }

    /// Run `request` on the UI thread and await its response
    pub async fn dispatch_async(self: &Arc<Self>, request: FunctionRequest) -> FunctionResponse {
        let (tx, rx) = oneshot::channel();
        let dispatcher = Arc::clone(self);
        let request_id = request.request_id;

        let posted = self.context.registry().post_task(HostThread::Ui, move || {
            let response = dispatcher.dispatch(&request);
            if tx.send(response).is_err() {
                debug!(request_id = %request.request_id, "Async caller went away before the response");
            }
        });
        if let Err(e) = posted {
            return FunctionResponse::Error(e.to_string());
        }

        match rx.await {
            Ok(response) => response,
            Err(_) => {
                warn!(request_id = %request_id, "Dispatch task dropped before running");
                FunctionResponse::Error(
                    BridgeError::target_unavailable(
                        HostThread::Ui.as_str(),
                        "dispatch task dropped before running",
                    )
                    .to_string(),
                )
            }
        }
    }
}

fn current_thread_label(context: &FunctionContext) -> String {
    context
        .registry()
        .current()
        .map(|t| t.to_string())
        .unwrap_or_else(crate::threading::restrictions::current_thread_name)
}

impl std::fmt::Debug for FunctionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDispatcher")
            .field("functions", &self.function_names())
            .field("context", &self.context)
            .finish()
    }
}
