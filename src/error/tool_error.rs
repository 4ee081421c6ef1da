//! The structured error record returned by tool handlers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

use super::kind::ErrorKind;

/// Boxed error type accepted from tool handlers.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A structured error for tool handlers.
///
/// Carries enough context for calling agents to make retry and fallback
/// decisions. The serialized shape is
/// `{"type", "message", "recoverable", "data"?}`, with `data` omitted when
/// nothing was attached.
///
/// # Examples
///
/// ```
/// use interbase::error::{ErrorKind, ToolError};
///
/// let err = ToolError::new(ErrorKind::NotFound, format!("agent {:?} not registered", "scout"));
/// assert!(!err.recoverable);
/// assert_eq!(err.to_string(), "[NOT_FOUND] agent \"scout\" not registered");
///
/// let busy = ToolError::transient("database busy");
/// assert!(busy.recoverable);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("[{kind}] {message}")]
pub struct ToolError {
    /// Failure class.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Fully rendered, human-readable message.
    pub message: String,
    /// Hint that retrying the identical call may succeed.
    pub recoverable: bool,
    /// Structured context for the caller.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl ToolError {
    /// Creates a new error. `recoverable` defaults to true only for
    /// [`ErrorKind::Transient`].
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: kind.default_recoverable(),
            data: Map::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Overrides the recoverable flag.
    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    /// Replaces the attached context.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Adds a single context entry.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Serializes the error for embedding in a tool result.
    ///
    /// Never fails: if the attached data cannot be serialized, a minimal
    /// object with only `type`, `message` and `recoverable` is returned.
    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = %err, kind = %self.kind, "falling back to minimal tool error JSON");
                self.minimal_json()
            }
        }
    }

    fn minimal_json(&self) -> String {
        // Value's Display escapes the message and cannot fail.
        format!(
            r#"{{"type":"{}","message":{},"recoverable":{}}}"#,
            self.kind.as_str(),
            Value::String(self.message.clone()),
            self.recoverable
        )
    }

    /// Parses a payload produced by [`ToolError::to_json`].
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Finds the first `ToolError` in an error's `source()` chain, starting
    /// with the error itself.
    ///
    /// `io::Error` reports its wrapped error's source rather than the
    /// wrapped error itself, so the walk steps into it via `get_ref`.
    pub fn extract<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a ToolError> {
        let mut current = Some(err);
        while let Some(err) = current {
            if let Some(tool_error) = err.downcast_ref::<ToolError>() {
                return Some(tool_error);
            }
            current = match err.downcast_ref::<io::Error>().and_then(io::Error::get_ref) {
                Some(inner) => Some(inner as &(dyn StdError + 'static)),
                None => err.source(),
            };
        }
        None
    }

    /// Converts any error into a `ToolError`.
    ///
    /// A `ToolError` found anywhere in the chain is returned unchanged, so
    /// normalizing is idempotent. Anything else becomes
    /// [`ErrorKind::Internal`] with the error's display text.
    pub fn normalize(err: &(dyn StdError + 'static)) -> ToolError {
        match Self::extract(err) {
            Some(tool_error) => tool_error.clone(),
            None => ToolError::internal(err.to_string()),
        }
    }

    /// Like [`ToolError::normalize`], but takes ownership so a boxed
    /// `ToolError` is unwrapped without cloning.
    pub fn from_boxed(err: BoxError) -> ToolError {
        match err.downcast::<ToolError>() {
            Ok(tool_error) => *tool_error,
            Err(err) => Self::normalize(&*err),
        }
    }
}
