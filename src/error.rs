//! Error types for fieldtree library

use serde_json::Value;
use thiserror::Error;

/// Result type alias for fieldtree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fieldtree library
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Construction Errors
    // -------------------------------------------------------------------------
    /// Malformed input shape handed to a `Field` or `Schema` constructor
    #[error("Construction error: {0}")]
    Construction(String),

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    /// One or more base or type rules were violated.
    ///
    /// Every violated rule contributes one line to `errors`.
    #[error("Field '{field}' errors: {} [value={}]", .errors.join("\n"), display_value(.value))]
    Validation {
        field: String,
        errors: Vec<String>,
        value: Value,
    },

    #[error("Field '{0}' is read-only")]
    ReadOnly(String),

    // -------------------------------------------------------------------------
    // Registry Errors
    // -------------------------------------------------------------------------
    #[error("Unknown field type '{0}'")]
    UnknownType(String),

    #[error("Field type '{0}' is already registered")]
    DuplicateType(String),

    // -------------------------------------------------------------------------
    // Fallback Errors
    // -------------------------------------------------------------------------
    #[error("Fallback from '{field}' to '{target}' would create a cycle")]
    FallbackCycle { field: String, target: String },

    #[error("Fallback path '{0}' does not resolve to a field")]
    FallbackPathNotFound(String),
}

impl Error {
    /// Check if this is a base-rule or type-rule violation
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. } | Error::ReadOnly(_))
    }

    /// Check if this is a malformed-input error
    #[must_use]
    pub fn is_construction(&self) -> bool {
        matches!(self, Error::Construction(_))
    }

    /// Check if this error came from the type registry
    #[must_use]
    pub fn is_registry_error(&self) -> bool {
        matches!(self, Error::UnknownType(_) | Error::DuplicateType(_))
    }

    /// Rule lines aggregated into a validation error (empty for other kinds)
    #[must_use]
    pub fn violations(&self) -> &[String] {
        match self {
            Error::Validation { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Render a value the way it appears in error messages.
///
/// Strings are shown bare and `Null` is shown as `nil`.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
