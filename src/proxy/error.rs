//! Gateway-side failures and their HTTP mapping.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors raised while relaying a request upstream.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The inbound body could not be read.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// The inbound multipart body was malformed.
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    /// Something in the inbound request cannot be expressed upstream.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The upstream URL could not be built.
    #[error("invalid upstream target `{0}`")]
    Target(String),

    /// Upstream did not answer in time.
    #[error("upstream timed out")]
    Timeout,

    /// Connection-level failure talking to upstream.
    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Body(_) | ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            // 413 when a field overruns the body limit.
            ProxyError::Multipart(e) => e.status(),
            ProxyError::Target(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProxyError::Timeout
        } else {
            ProxyError::Upstream(e.to_string())
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProxyError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ProxyError::Upstream("refused".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ProxyError::Body("eof".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_error_body_is_json_message() {
        let response = ProxyError::Upstream("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "upstream request failed: connection refused");
    }
}
