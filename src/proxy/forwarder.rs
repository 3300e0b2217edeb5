//! Relays one inbound request to the upstream API.
//!
//! The forwarder is a dumb relay: no retries, no response rewriting.
//! Status, content type and body bytes come back exactly as upstream sent
//! them.

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart},
    http::{header, HeaderName, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::proxy::error::ProxyError;
use crate::proxy::headers::{forwardable_headers, is_multipart, DEFAULT_CONTENT_TYPE};
use crate::proxy::multipart::{read_fields, to_form};

/// What upstream answered.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// Upstream relay bound to one base URL.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    base_url: String,
    extra_headers: Vec<HeaderName>,
    max_body_size: usize,
}

impl Forwarder {
    pub fn new(
        upstream: &UpstreamConfig,
        timeouts: &TimeoutConfig,
        max_body_size: usize,
    ) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            // Redirects are the caller's business.
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let extra_headers = upstream
            .extra_forward_headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| ProxyError::BadRequest(format!("invalid header name `{}`", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            client,
            base_url: upstream.base_url().to_string(),
            extra_headers,
            max_body_size,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{path}{?query}`. `path` is the part after the `/api` prefix,
    /// still percent-encoded.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let path = path.trim_start_matches('/');
        let mut url = if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        };
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }

    /// Forward `request` to upstream under `path`.
    pub async fn forward(
        &self,
        request: Request<Body>,
        path: &str,
    ) -> Result<UpstreamResponse, ProxyError> {
        let method = request.method().clone();
        let url = self.target_url(path, request.uri().query());
        reqwest::Url::parse(&url).map_err(|_| ProxyError::Target(url.clone()))?;

        let has_body = method != Method::GET && method != Method::HEAD;
        let multipart = has_body && is_multipart(request.headers());
        let headers = forwardable_headers(request.headers(), &self.extra_headers, has_body);

        tracing::debug!(method = %method, url = %url, multipart, "Forwarding upstream");

        let mut outbound = self.client.request(method, &url).headers(headers);

        if multipart {
            let form = Multipart::from_request(request, &())
                .await
                .map_err(|rejection| ProxyError::BadRequest(rejection.body_text()))?;
            let fields = read_fields(form).await?;
            tracing::debug!(fields = fields.len(), "Re-encoding multipart body");
            outbound = outbound.multipart(to_form(fields)?);
        } else if has_body {
            let body = axum::body::to_bytes(request.into_body(), self.max_body_size)
                .await
                .map_err(|e| ProxyError::Body(e.to_string()))?;
            outbound = outbound.body(body);
        }

        let response = outbound.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
