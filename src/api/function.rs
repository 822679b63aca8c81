//! # Function Calling Convention
//!
//! Request and response shapes for host functions, argument accessors, and
//! the trait every host function implements.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::context::FunctionContext;
use crate::error::{BridgeError, Result};

/// A call from the app script: function name plus ordered arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRequest {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default = "Uuid::new_v4")]
    pub request_id: Uuid,
}

impl FunctionRequest {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
            request_id: Uuid::new_v4(),
        }
    }
}

/// Exactly one per request. There is no pending state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "snake_case")]
pub enum FunctionResponse {
    Success(Vec<Value>),
    Error(String),
}

impl FunctionResponse {
    pub fn no_arguments() -> Self {
        Self::Success(Vec::new())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> std::result::Result<Vec<Value>, String> {
        match self {
            Self::Success(values) => Ok(values),
            Self::Error(message) => Err(message),
        }
    }
}

impl From<Result<Vec<Value>>> for FunctionResponse {
    fn from(result: Result<Vec<Value>>) -> Self {
        match result {
            Ok(values) => Self::Success(values),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

/// Positional arguments of one call, with typed accessors that fail with
/// `ArgumentValidation` naming the function
#[derive(Debug, Clone)]
pub struct Arguments<'a> {
    function: &'a str,
    values: &'a [Value],
}

impl<'a> Arguments<'a> {
    pub fn new(function: &'a str, values: &'a [Value]) -> Self {
        Self { function, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn required_string(&self, index: usize, field: &str) -> Result<&'a str> {
        match self.values.get(index) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(self.invalid(field, &format!("expected string, got {}", type_name(other)))),
            None => Err(self.invalid(field, "missing required argument")),
        }
    }

    /// Absent and `null` both read as `None`
    pub fn optional_string(&self, index: usize, field: &str) -> Result<Option<&'a str>> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.invalid(field, &format!("expected string, got {}", type_name(other)))),
        }
    }

    /// Optional string given either directly at `index` or as `field` of an
    /// object at `index`
    pub fn optional_string_or_field(&self, index: usize, field: &str) -> Result<Option<&'a str>> {
        match self.values.get(index) {
            Some(Value::Object(map)) => match map.get(field) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.as_str())),
                Some(other) => Err(self.invalid(field, &format!("expected string, got {}", type_name(other)))),
            },
            _ => self.optional_string(index, field),
        }
    }

    fn invalid(&self, field: &str, message: &str) -> BridgeError {
        BridgeError::argument(self.function, format!("{field}: {message}"))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A host function callable from the app script
pub trait ExtensionFunction: Send + Sync {
    /// Name the script calls the function by
    fn name(&self) -> &'static str;

    /// Run the function on the dispatch thread.
    ///
    /// Argument validation must happen before any work is posted to another
    /// thread.
    fn run(&self, context: &FunctionContext, args: &Arguments<'_>) -> Result<Vec<Value>>;
}
