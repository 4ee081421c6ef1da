//! The closed set of error kinds a tool handler can report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Machine-readable failure class carried in every structured tool error.
///
/// The serialized form is the wire value (`"NOT_FOUND"`, `"TRANSIENT"`, ...)
/// that calling agents match on to decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The requested resource does not exist.
    NotFound,
    /// Concurrent modification clash.
    Conflict,
    /// Invalid input or arguments from the caller.
    Validation,
    /// Access denied.
    Permission,
    /// Temporary failure, safe to retry.
    Transient,
    /// Unexpected or unclassified server error, including recovered panics.
    Internal,
}

impl ErrorKind {
    /// Every kind, in wire order.
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::NotFound,
        ErrorKind::Conflict,
        ErrorKind::Validation,
        ErrorKind::Permission,
        ErrorKind::Transient,
        ErrorKind::Internal,
    ];

    /// The wire value of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Permission => "PERMISSION",
            ErrorKind::Transient => "TRANSIENT",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// Whether errors of this kind are retry-safe unless overridden.
    pub fn default_recoverable(&self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the six wire values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error kind: {0:?}")]
pub struct UnknownErrorKind(pub String);

impl FromStr for ErrorKind {
    type Err = UnknownErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownErrorKind(s.to_string()))
    }
}
