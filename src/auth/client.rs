//! Authenticated HTTP client for the dashboard API.
//!
//! Wraps `reqwest::Client` with bearer injection and transparent recovery
//! from access-token expiry. A 401 on a first attempt goes through the
//! shared [`RefreshCoordinator`]; the request is then replayed once with the
//! new token. A replayed request that 401s again is handed back untouched.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::coordinator::{Outcome, RefreshCoordinator, RefreshError};
use crate::auth::error::ClientError;
use crate::auth::session::SessionObserver;
use crate::auth::storage::Storage;
use crate::auth::tokens::{Credentials, TokenPair, TokenPayload};
use crate::config::{ClientConfig, ImageConfig};
use crate::images::{compress_image, UploadFile};
use crate::observability::metrics;

/// `{data: ...}` response envelope used by the backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// One multipart part.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadPart {
    Text { name: String, value: String },
    File { name: String, file: UploadFile },
}

/// Request body, kept in a replayable form.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<UploadPart>),
}

/// A request that can be sent more than once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the client base URL, query included.
    pub path: String,
    pub body: RequestBody,
    /// Set once the request has been replayed after a refresh.
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(method: Method, path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            body: RequestBody::Json(body),
            ..Self::new(method, path)
        }
    }

    pub fn multipart(method: Method, path: impl Into<String>, parts: Vec<UploadPart>) -> Self {
        Self {
            body: RequestBody::Multipart(parts),
            ..Self::new(method, path)
        }
    }
}

/// Run every image file part through the compressor.
pub fn prepare_upload(parts: Vec<UploadPart>, images: &ImageConfig) -> Vec<UploadPart> {
    parts
        .into_iter()
        .map(|part| match part {
            UploadPart::File { name, file } if file.is_image() => UploadPart::File {
                name,
                file: compress_image(file, images),
            },
            other => other,
        })
        .collect()
}

/// Bearer-authenticated client sharing one refresh coordinator.
pub struct AuthenticatedClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    bearer: RwLock<Option<String>>,
    coordinator: Arc<RefreshCoordinator>,
    observer: Arc<dyn SessionObserver>,
    login_path: String,
    images: ImageConfig,
}

impl AuthenticatedClient {
    pub fn new(
        base_url: &str,
        storage: Arc<dyn Storage>,
        coordinator: Arc<RefreshCoordinator>,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self, ClientError> {
        Self::build(base_url, Duration::from_secs(30), storage, coordinator, observer)
    }

    /// Client driven by the `[client]` and `[images]` config sections.
    pub fn from_config(
        config: &ClientConfig,
        images: &ImageConfig,
        storage: Arc<dyn Storage>,
        coordinator: Arc<RefreshCoordinator>,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self, ClientError> {
        let client = Self::build(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            storage,
            coordinator,
            observer,
        )?;
        Ok(client
            .with_login_path(config.login_path.clone())
            .with_images(images.clone()))
    }

    fn build(
        base_url: &str,
        timeout: Duration,
        storage: Arc<dyn Storage>,
        coordinator: Arc<RefreshCoordinator>,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let credentials = Credentials::new(storage);
        let bearer = RwLock::new(credentials.access_token());

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            bearer,
            coordinator,
            observer,
            login_path: "/login".to_string(),
            images: ImageConfig::default(),
        })
    }

    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    pub fn with_images(mut self, images: ImageConfig) -> Self {
        self.images = images;
        self
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Token currently attached to outgoing requests.
    pub fn bearer(&self) -> Option<String> {
        self.bearer.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_bearer(&self, token: Option<String>) {
        *self.bearer.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    /// Exchange credentials for a token pair and persist it.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ClientError> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let response = check_status(response).await?;

        let envelope: Envelope<TokenPayload> = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        let pair = TokenPair::from(envelope.data);

        self.credentials.store(pair.clone()).await?;
        self.set_bearer(Some(pair.access_token.clone()));
        tracing::info!(username = %username, "Logged in");
        Ok(pair)
    }

    /// Forget the stored token pair.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.set_bearer(None);
        self.credentials.clear()?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Send `request`, recovering once from an expired access token.
    pub async fn send(&self, mut request: ApiRequest) -> Result<Response, ClientError> {
        let token = self.bearer();
        let response = self.dispatch(&request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || request.retried {
            return Ok(response);
        }

        request.retried = true;

        // The token was rotated while this request was in flight.
        let current = self.bearer();
        if let Some(current) = current.filter(|c| token.as_deref() != Some(c.as_str())) {
            tracing::debug!(method = %request.method, path = %request.path, "Unauthorized with a stale token, replaying");
            return self.dispatch(&request, Some(&current)).await;
        }

        tracing::debug!(method = %request.method, path = %request.path, "Unauthorized, recovering session");
        let token = self
            .coordinator
            .refresh_or_wait(|| self.refresh_session())
            .await
            .map_err(ClientError::SessionExpired)?;

        self.dispatch(&request, Some(&token)).await
    }

    /// Send and decode the JSON body; non-2xx becomes [`ClientError::Status`].
    /// An empty body decodes as `null`.
    pub async fn json(&self, request: ApiRequest) -> Result<serde_json::Value, ClientError> {
        let response = check_status(self.send(request).await?).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Send and unwrap the `{data: ...}` envelope.
    pub async fn data<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let value = self.json(request).await?;
        let envelope: Envelope<T> =
            serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.data(ApiRequest::get(path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<serde_json::Value, ClientError> {
        self.json(ApiRequest::delete(path)).await
    }

    pub async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<serde_json::Value, ClientError> {
        self.json(ApiRequest::json(Method::POST, path, to_value(body)?)).await
    }

    pub async fn put_json<B: Serialize>(&self, path: &str, body: &B) -> Result<serde_json::Value, ClientError> {
        self.json(ApiRequest::json(Method::PUT, path, to_value(body)?)).await
    }

    pub async fn patch_json<B: Serialize>(&self, path: &str, body: &B) -> Result<serde_json::Value, ClientError> {
        self.json(ApiRequest::json(Method::PATCH, path, to_value(body)?)).await
    }

    /// Multipart upload with image parts compressed first.
    pub async fn upload(
        &self,
        method: Method,
        path: &str,
        parts: Vec<UploadPart>,
    ) -> Result<serde_json::Value, ClientError> {
        let parts = prepare_upload(parts, &self.images);
        self.json(ApiRequest::multipart(method, path, parts)).await
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ClientError> {
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            retried = request.retried,
            "Sending request"
        );

        let mut builder = self.http.request(request.method.clone(), self.url(&request.path));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(parts) => builder.multipart(to_form(parts)?),
        };

        Ok(builder.send().await?)
    }

    /// Leader side of a refresh: persist the new pair, or end the session.
    async fn refresh_session(&self) -> Outcome {
        match self.request_token_pair().await {
            Ok(pair) => {
                if let Err(e) = self.credentials.store(pair.clone()).await {
                    return self.end_session(RefreshError::Storage(e.to_string())).await;
                }
                self.set_bearer(Some(pair.access_token.clone()));
                metrics::record_token_refresh("success");
                tracing::info!("Access token refreshed");
                Ok(pair.access_token)
            }
            Err(e) => self.end_session(e).await,
        }
    }

    async fn request_token_pair(&self) -> Result<TokenPair, RefreshError> {
        let refresh_token = self
            .credentials
            .refresh_token()
            .ok_or(RefreshError::NoRefreshToken)?;

        let response = self
            .http
            .post(self.url("/refresh"))
            .json(&RefreshRequest { refresh_token: &refresh_token })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message: ClientError::from_body(status, &body).to_string(),
            });
        }

        let envelope: Envelope<TokenPayload> = response
            .json()
            .await
            .map_err(|e| RefreshError::Decode(e.to_string()))?;
        Ok(envelope.data.into())
    }

    /// Terminal for the session: wipe credentials and send the user to login.
    async fn end_session(&self, error: RefreshError) -> Outcome {
        tracing::warn!(error = %error, "Token refresh failed, ending session");
        metrics::record_token_refresh("failure");

        self.set_bearer(None);
        if let Err(e) = self.credentials.wipe().await {
            tracing::error!(error = %e, "Failed to clear stored credentials");
        }
        self.observer.navigate(&self.login_path);
        Err(error)
    }
}

/// Pass 2xx through; turn anything else into [`ClientError::Status`].
pub async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::from_body(status, &body))
}

fn to_value<B: Serialize>(body: &B) -> Result<serde_json::Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}

fn to_form(parts: &[UploadPart]) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            UploadPart::Text { name, value } => form.text(name.clone(), value.clone()),
            UploadPart::File { name, file } => {
                let body = Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.content_type)?;
                form.part(name.clone(), body)
            }
        };
    }
    Ok(form)
}
