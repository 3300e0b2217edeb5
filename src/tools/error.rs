//! Validation and execution errors for tool forms.

use thiserror::Error;

use crate::auth::ClientError;

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("{0} is required")]
    Required(String),

    #[error("{key} must be between {min} and {max}")]
    OutOfRange { key: String, min: String, max: String },

    #[error("{0} is not a valid URL")]
    InvalidUrl(String),

    #[error("{key} must be one of: {allowed}")]
    NotAnOption { key: String, allowed: String },
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("no field named `{0}`")]
    UnknownField(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("{}", join(.0))]
    Validation(Vec<FieldError>),

    /// Includes the backend's message verbatim for non-2xx answers.
    #[error(transparent)]
    Client(#[from] ClientError),
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
