//! Structured error taxonomy for tool handlers
//!
//! Every failure that leaves a tool handler is classified as exactly one
//! [`ErrorKind`] and carried as a [`ToolError`], which serializes to the JSON
//! payload calling agents parse to decide whether to retry.

pub mod kind;
pub mod results;
pub mod tool_error;

// Re-export main types for convenient access
pub use kind::{ErrorKind, UnknownErrorKind};
pub use results::{
    conflict_error, internal_error, not_found_error, permission_error, result_error, result_text,
    transient_error, validation_error, wrap_error,
};
pub use tool_error::{BoxError, ToolError};
