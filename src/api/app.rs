//! # App Functions
//!
//! The `App` function set exposed to the hosted script.
//!
//! | Function | Runs |
//! |---|---|
//! | `quit` | posted to the UI thread, responds immediately |
//! | `closeAllWindows` | posted to the UI thread, responds immediately |
//! | `getArgvSync` | inline |
//! | `clearAppCache` | blocking call on the I/O thread |
//! | `clearCache` | callback adapter over the browsing data remover |
//! | `setProxyConfig` | blocking call on the I/O thread |
//! | `getDataPath` | inline |
//! | `crashBrowser` | aborts the process |

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

use super::context::FunctionContext;
use super::function::{Arguments, ExtensionFunction};
use crate::constants::functions;
use crate::error::{BridgeError, Result};
use crate::host::{
    DataTypeMask, FixedProxyConfigService, OriginTypeMask, ProxyConfigRequest, RemovalRequest,
    TimeRange,
};
use crate::sync::{BlockingCall, CallbackAdapter};
use crate::threading::{HostThread, ScopedAllowWait};

/// Every function of the `App` set
pub fn app_functions() -> Vec<Arc<dyn ExtensionFunction>> {
    vec![
        Arc::new(QuitFunction),
        Arc::new(CloseAllWindowsFunction),
        Arc::new(GetArgvSyncFunction),
        Arc::new(ClearAppCacheFunction),
        Arc::new(ClearCacheFunction),
        Arc::new(SetProxyConfigFunction),
        Arc::new(GetDataPathFunction),
        Arc::new(CrashBrowserFunction),
    ]
}

/// Terminates the app from a task on the UI thread
#[derive(Debug, Default)]
pub struct QuitFunction;

impl ExtensionFunction for QuitFunction {
    fn name(&self) -> &'static str {
        functions::QUIT
    }

    fn run(&self, context: &FunctionContext, _args: &Arguments<'_>) -> Result<Vec<Value>> {
        let lifecycle = context.lifecycle().clone();
        let app_id = context.app_id().to_string();
        context.registry().post_task(HostThread::Ui, move || {
            lifecycle.terminate(&app_id);
        })?;
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
pub struct CloseAllWindowsFunction;

impl ExtensionFunction for CloseAllWindowsFunction {
    fn name(&self) -> &'static str {
        functions::CLOSE_ALL_WINDOWS
    }

    fn run(&self, context: &FunctionContext, _args: &Arguments<'_>) -> Result<Vec<Value>> {
        let windows = context.window_registry().cloned().ok_or_else(|| {
            BridgeError::target_unavailable("window_registry", "no window registry for this context")
        })?;
        let app_id = context.app_id().to_string();
        context.registry().post_task(HostThread::Ui, move || {
            windows.close_all_for_app(&app_id);
        })?;
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
pub struct GetArgvSyncFunction;

impl ExtensionFunction for GetArgvSyncFunction {
    fn name(&self) -> &'static str {
        functions::GET_ARGV_SYNC
    }

    fn run(&self, context: &FunctionContext, _args: &Arguments<'_>) -> Result<Vec<Value>> {
        Ok(context
            .command_line()
            .script_visible_argv(context.package())
            .into_iter()
            .map(Value::String)
            .collect())
    }
}

/// Deletes one app-cache group on the I/O thread.
///
/// An unparseable manifest URL is rejected with an argument error before any
/// thread hop instead of being ignored. A valid URL naming no known group is
/// a no-op.
#[derive(Debug, Default)]
pub struct ClearAppCacheFunction;

impl ExtensionFunction for ClearAppCacheFunction {
    fn name(&self) -> &'static str {
        functions::CLEAR_APP_CACHE
    }

    fn run(&self, context: &FunctionContext, args: &Arguments<'_>) -> Result<Vec<Value>> {
        let manifest = args.required_string(0, "manifest_url")?;
        let manifest_url = Url::parse(manifest).map_err(|e| {
            BridgeError::argument(self.name(), format!("manifest_url: {e}"))
        })?;

        let store = context.browsing_data().store().clone();
        let permit = ScopedAllowWait::new();
        let outcome = BlockingCall::with_policy(context.registry(), context.blocking_call_policy())
            .call(&permit, HostThread::Io, move || {
                store.with_mut(|store| store.delete_app_cache_group(&manifest_url))
            })?;

        debug!(
            removed_entries = outcome.removed_entries,
            freed_bytes = outcome.freed_bytes,
            "App cache group cleared"
        );
        Ok(Vec::new())
    }
}

/// Clears the HTTP cache of unprotected web origins, all time
#[derive(Debug, Default)]
pub struct ClearCacheFunction;

impl ExtensionFunction for ClearCacheFunction {
    fn name(&self) -> &'static str {
        functions::CLEAR_CACHE
    }

    fn run(&self, context: &FunctionContext, _args: &Arguments<'_>) -> Result<Vec<Value>> {
        let request = RemovalRequest {
            data_types: DataTypeMask::CACHE,
            origin_types: OriginTypeMask::UNPROTECTED_WEB,
            range: TimeRange::all_time(),
        };

        let outcome = CallbackAdapter::with_policy(context.registry(), context.callback_policy())
            .call_sync(context.browsing_data().remover(), request)?
            .map_err(BridgeError::work_item_failed)?;

        debug!(
            removed_entries = outcome.removed_entries,
            freed_bytes = outcome.freed_bytes,
            "Cache cleared"
        );
        Ok(Vec::new())
    }
}

/// Installs a new proxy configuration, replacing the previous one entirely
#[derive(Debug, Default)]
pub struct SetProxyConfigFunction;

impl ExtensionFunction for SetProxyConfigFunction {
    fn name(&self) -> &'static str {
        functions::SET_PROXY_CONFIG
    }

    fn run(&self, context: &FunctionContext, args: &Arguments<'_>) -> Result<Vec<Value>> {
        let request = ProxyConfigRequest {
            rules: args.required_string(0, "config")?.to_string(),
            pac_url: args
                .optional_string_or_field(1, "pac_url")?
                .map(str::to_string),
        };
        let request_context = context.request_context().cloned().ok_or_else(|| {
            BridgeError::target_unavailable("request_context", "no request context for this context")
        })?;

        let permit = ScopedAllowWait::new();
        let kind = BlockingCall::with_policy(context.registry(), context.blocking_call_policy())
            .call(&permit, HostThread::Io, move || {
                let config = request
                    .into_config()
                    .map_err(|e| BridgeError::work_item_failed(e.to_string()))?;
                let kind = config.kind();
                request_context.with_mut(|ctx| {
                    ctx.proxy_resolution_service_mut()
                        .reset_config_service(Box::new(FixedProxyConfigService::new(config)));
                })?;
                Ok(kind)
            })?;

        info!(kind = kind, "Proxy configuration replaced");
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
pub struct GetDataPathFunction;

impl ExtensionFunction for GetDataPathFunction {
    fn name(&self) -> &'static str {
        functions::GET_DATA_PATH
    }

    fn run(&self, context: &FunctionContext, _args: &Arguments<'_>) -> Result<Vec<Value>> {
        Ok(vec![Value::String(
            context.data_path().to_string_lossy().into_owned(),
        )])
    }
}

/// Deliberately takes the process down to exercise crash reporting. Never
/// returns.
#[derive(Debug, Default)]
pub struct CrashBrowserFunction;

impl ExtensionFunction for CrashBrowserFunction {
    fn name(&self) -> &'static str {
        functions::CRASH_BROWSER
    }

    fn run(&self, context: &FunctionContext, _args: &Arguments<'_>) -> Result<Vec<Value>> {
        error!(app_id = %context.app_id(), "crashBrowser requested; aborting process");
        std::process::abort()
    }
}
