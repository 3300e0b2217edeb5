//! Client-side error taxonomy.

use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::coordinator::RefreshError;
use crate::auth::storage::StorageError;

/// Errors surfaced to callers of the authenticated client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network unreachable, DNS, timeout. Never retried.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx answer. `message` is the backend's text, verbatim.
    #[error("{message}")]
    Status {
        status: StatusCode,
        message: String,
        /// Field-level validation messages, when the backend sent any.
        errors: Option<serde_json::Value>,
    },

    /// Refresh failed; credentials are gone and the user must sign in again.
    #[error("session expired: {0}")]
    SessionExpired(RefreshError),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build a `Status` error from a failed response body.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();

        let message = parsed
            .as_ref()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        let errors = parsed
            .as_ref()
            .and_then(|v| v.get("errors"))
            .filter(|e| !e.is_null())
            .cloned();

        ClientError::Status {
            status,
            message,
            errors,
        }
    }
}
