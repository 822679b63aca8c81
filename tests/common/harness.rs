//! # Bridge Test Harness
//!
//! Starts a thread registry with a live I/O thread and a dedicated UI thread
//! that serves its queue in a run loop, the way an embedding application
//! would. Requests are dispatched onto the UI thread and their responses
//! handed back to the test thread.

use host_bridge::api::{FunctionContext, FunctionDispatcher, FunctionRequest, FunctionResponse};
use host_bridge::config::{BridgeConfig, ThreadsConfig};
use host_bridge::host::CommandLine;
use host_bridge::sync::{QuitHandle, RunLoop};
use host_bridge::{BlockingCall, BridgeError, HostThread, ScopedAllowWait, ThreadRegistry};
use serde_json::Value;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BridgeHarness {
    pub registry: Arc<ThreadRegistry>,
    pub dispatcher: Arc<FunctionDispatcher>,
    ui_quit: Option<QuitHandle>,
    ui_thread: Option<JoinHandle<()>>,
}

impl BridgeHarness {
    pub fn start() -> Self {
        Self::start_with(BridgeConfig::default(), CommandLine::from_argv(["host", "app.nw"]), |c| c)
    }

    /// Start with a custom config and command line; `customize` may swap
    /// collaborators on the context before the dispatcher is built
    pub fn start_with(
        config: BridgeConfig,
        command_line: CommandLine,
        customize: impl FnOnce(FunctionContext) -> FunctionContext,
    ) -> Self {
        let registry = ThreadRegistry::start(&config.threads).expect("registry should start");
        let context = customize(FunctionContext::new(registry.clone(), &config, command_line));
        let dispatcher = Arc::new(FunctionDispatcher::with_app_functions(Arc::new(context)));

        let (quit_tx, quit_rx) = crossbeam::channel::bounded(1);
        let ui_registry = registry.clone();
        let ui_thread = std::thread::Builder::new()
            .name("test-ui".to_string())
            .spawn(move || {
                let _binding = ui_registry
                    .adopt_current_thread(HostThread::Ui)
                    .expect("ui thread should bind");
                let run_loop = RunLoop::new(&ui_registry).expect("ui run loop");
                quit_tx.send(run_loop.quit_handle()).expect("send quit handle");
                let _ = run_loop.run();
            })
            .expect("spawn ui thread");

        let ui_quit = quit_rx
            .recv_timeout(RESPONSE_TIMEOUT)
            .expect("ui thread should start");

        Self {
            registry,
            dispatcher,
            ui_quit: Some(ui_quit),
            ui_thread: Some(ui_thread),
        }
    }

    pub fn context(&self) -> &FunctionContext {
        self.dispatcher.context()
    }

    /// Dispatch on the UI thread and wait for the response
    pub fn dispatch(&self, request: FunctionRequest) -> FunctionResponse {
        let (tx, rx) = crossbeam::channel::bounded(1);
        let dispatcher = self.dispatcher.clone();
        self.registry
            .post_task(HostThread::Ui, move || {
                let _ = tx.send(dispatcher.dispatch(&request));
            })
            .expect("post to ui");
        rx.recv_timeout(RESPONSE_TIMEOUT)
            .expect("response should arrive")
    }

    pub fn call(&self, name: &str, args: Vec<Value>) -> FunctionResponse {
        self.dispatch(FunctionRequest::new(name, args))
    }

    /// Run `f` on the I/O thread from the test thread and return its result
    pub fn on_io<T, F>(&self, f: F) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, BridgeError> + Send + 'static,
    {
        let permit = ScopedAllowWait::new();
        BlockingCall::new(&self.registry).call(&permit, HostThread::Io, f)
    }

    /// Run `f` on the UI thread and return its result
    pub fn on_ui<T, F>(&self, f: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = crossbeam::channel::bounded(1);
        self.registry
            .post_task(HostThread::Ui, move || {
                let _ = tx.send(f());
            })
            .expect("post to ui");
        rx.recv_timeout(RESPONSE_TIMEOUT).expect("ui task should run")
    }
}

impl Drop for BridgeHarness {
    fn drop(&mut self) {
        if let Some(quit) = self.ui_quit.take() {
            quit.quit();
        }
        if let Some(handle) = self.ui_thread.take() {
            let _ = handle.join();
        }
        self.registry.shutdown();
    }
}

pub fn test_threads_config(io_thread_name: &str) -> ThreadsConfig {
    ThreadsConfig {
        io_thread_name: io_thread_name.to_string(),
        ..ThreadsConfig::default()
    }
}
