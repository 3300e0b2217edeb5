//! Request header allowlist for forwarded requests.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Content type assumed for non-multipart bodies that arrive without one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// True when the content type announces a multipart form body.
pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("multipart/form-data"))
        .unwrap_or(false)
}

/// Builds the outbound header set.
///
/// Only `Authorization` and `Content-Type` survive, plus any `extra` names.
/// For multipart bodies `Content-Type` is dropped so the outbound form can
/// announce its own boundary. For other bodies a missing `Content-Type`
/// becomes `application/json`. Bodiless requests carry no `Content-Type`.
pub fn forwardable_headers(
    inbound: &HeaderMap,
    extra: &[HeaderName],
    has_body: bool,
) -> HeaderMap {
    let mut out = HeaderMap::new();

    if let Some(auth) = inbound.get(header::AUTHORIZATION) {
        out.insert(header::AUTHORIZATION, auth.clone());
    }

    for name in extra {
        for value in inbound.get_all(name) {
            out.append(name.clone(), value.clone());
        }
    }

    if has_body && !is_multipart(inbound) {
        let content_type = inbound
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        out.insert(header::CONTENT_TYPE, content_type);
    } else {
        out.remove(header::CONTENT_TYPE);
    }

    out
}
