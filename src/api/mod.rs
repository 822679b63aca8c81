//! # Host Function Layer
//!
//! Request/response calling convention between the hosted script and the
//! host: argument validation, function lookup and the `App` function set.

pub mod app;
pub mod context;
pub mod dispatcher;
pub mod function;

pub use app::app_functions;
pub use context::FunctionContext;
pub use dispatcher::FunctionDispatcher;
pub use function::{Arguments, ExtensionFunction, FunctionRequest, FunctionResponse};
