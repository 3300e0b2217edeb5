//! Shared utilities for integration tests: mock upstream APIs and a gateway
//! bound to an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use folio_gateway::auth::SessionObserver;
use folio_gateway::config::GatewayConfig;
use folio_gateway::http::HttpServer;
use folio_gateway::lifecycle::Shutdown;

/// Serve `router` on 127.0.0.1 with an OS-assigned port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

// ---------------------------------------------------------------------------
// Recording upstream
// ---------------------------------------------------------------------------

/// A request as the upstream saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    pub fn all(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.all().pop().expect("upstream saw no request")
    }
}

/// Upstream under `/api` that records every request.
///
/// - `/api/settings` answers `{"data": {"theme": "dark"}}`
/// - `/api/plain` answers `text/plain`
/// - `/api/stall` answers after 3 s
/// - `/api/missing` answers 404 `{"message": "Not found"}`
/// - anything else answers `{"data": {"ok": true}}`
pub async fn start_recording_upstream() -> (SocketAddr, Recorder) {
    let recorder = Recorder::default();
    let router = Router::new()
        .route("/api/{*path}", any(record_handler))
        .with_state(recorder.clone());
    (serve(router).await, recorder)
}

async fn record_handler(State(recorder): State<Recorder>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let path = parts.uri.path().to_string();

    recorder.requests.lock().unwrap().push(Recorded {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers: parts.headers,
        body,
    });

    match path.as_str() {
        "/api/settings" => Json(json!({"data": {"theme": "dark"}})).into_response(),
        "/api/stall" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"data": {"late": true}})).into_response()
        }
        "/api/plain" => ([(header::CONTENT_TYPE, "text/plain")], "hello").into_response(),
        "/api/missing" => {
            (StatusCode::NOT_FOUND, Json(json!({"message": "Not found"}))).into_response()
        }
        _ => Json(json!({"data": {"ok": true}})).into_response(),
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct Gateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub fn gateway_config(api_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.upstream.api_url = api_url.to_string();
    config.timeouts.upstream_secs = 2;
    config
}

pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    Gateway { addr, shutdown, updates }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Auth-aware backend
// ---------------------------------------------------------------------------

pub const PASSWORD: &str = "secret";
pub const REFRESHED_TOKEN: &str = "access-2";
pub const ROTATED_REFRESH: &str = "refresh-2";
pub const VALID_REFRESH: &str = "refresh-1";

/// Mutable state of the fake API.
pub struct BackendState {
    pub access_token: Mutex<String>,
    pub refresh_calls: AtomicUsize,
    pub refresh_ok: AtomicBool,
    pub refresh_delay: Duration,
    pub unauthorized_hits: AtomicUsize,
    pub tool_runs: Mutex<Vec<Value>>,
}

#[derive(Clone)]
pub struct Backend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
}

impl Backend {
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn fail_refreshes(&self) {
        self.state.refresh_ok.store(false, Ordering::SeqCst);
    }
}

/// Fake API with login, refresh, a protected profile and tools.
pub async fn start_backend() -> Backend {
    let state = Arc::new(BackendState {
        access_token: Mutex::new("access-1".to_string()),
        refresh_calls: AtomicUsize::new(0),
        refresh_ok: AtomicBool::new(true),
        refresh_delay: Duration::from_millis(300),
        unauthorized_hits: AtomicUsize::new(0),
        tool_runs: Mutex::new(Vec::new()),
    });

    let router = Router::new()
        .route("/api/login", post(login))
        .route("/api/refresh", post(refresh))
        .route("/api/profile", get(profile))
        .route("/api/slow-profile", get(slow_profile))
        .route("/api/always-401", get(always_unauthorized))
        .route("/api/media", post(media))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/{slug}", get(get_tool))
        .route("/api/tools/{slug}/run", post(run_tool))
        .with_state(state.clone());

    Backend { addr: serve(router).await, state }
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

async fn login(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return unauthorized("Invalid credentials");
    }
    let token = state.access_token.lock().unwrap().clone();
    Json(json!({"data": {"token": token, "refresh_token": VALID_REFRESH}})).into_response()
}

async fn refresh(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.refresh_delay).await;

    if !state.refresh_ok.load(Ordering::SeqCst) || body["refresh_token"] != VALID_REFRESH {
        return unauthorized("Refresh token expired");
    }

    *state.access_token.lock().unwrap() = REFRESHED_TOKEN.to_string();
    Json(json!({"data": {"token": REFRESHED_TOKEN, "refresh_token": ROTATED_REFRESH}}))
        .into_response()
}

async fn profile(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    let current = state.access_token.lock().unwrap().clone();
    if bearer(&headers).as_deref() != Some(current.as_str()) {
        return unauthorized("Token expired");
    }
    Json(json!({"data": {"name": "Ada"}})).into_response()
}

/// Checks the token on arrival, answers 800 ms later.
async fn slow_profile(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    let current = state.access_token.lock().unwrap().clone();
    let authorized = bearer(&headers).as_deref() == Some(current.as_str());
    tokio::time::sleep(Duration::from_millis(800)).await;
    if !authorized {
        return unauthorized("Token expired");
    }
    Json(json!({"data": {"name": "Ada"}})).into_response()
}

async fn always_unauthorized(State(state): State<Arc<BackendState>>) -> Response {
    state.unauthorized_hits.fetch_add(1, Ordering::SeqCst);
    unauthorized("Nope")
}

/// Echoes the multipart fields it received.
async fn media(mut multipart: Multipart) -> Response {
    let mut fields = serde_json::Map::new();
    let mut files = Vec::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let size = field.bytes().await.map(|b| b.len()).unwrap_or_default();
                files.push(json!({
                    "name": name,
                    "file_name": file_name,
                    "content_type": content_type,
                    "size": size,
                }));
            }
            None => {
                let value = field.text().await.unwrap_or_default();
                fields.insert(name, Value::String(value));
            }
        }
    }

    Json(json!({"data": {"fields": fields, "files": files}})).into_response()
}

fn tool_schemas() -> Value {
    json!([
        {
            "slug": "word-counter",
            "name": "Word Counter",
            "fields": [{"key": "text", "type": "textarea", "required": true}]
        },
        {
            "slug": "uuid-generator",
            "name": "UUID Generator",
            "repeatable": true,
            "fields": [{"key": "count", "type": "number", "min": 1, "max": 5, "default": 1}]
        }
    ])
}

async fn list_tools() -> Json<Value> {
    Json(json!({ "data": tool_schemas() }))
}

async fn get_tool(Path(slug): Path<String>) -> Response {
    let schemas = tool_schemas();
    match schemas
        .as_array()
        .and_then(|all| all.iter().find(|t| t["slug"] == slug.as_str()))
    {
        Some(schema) => Json(json!({ "data": schema })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Unknown tool"}))).into_response(),
    }
}

async fn run_tool(
    State(state): State<Arc<BackendState>>,
    Path(slug): Path<String>,
    Json(values): Json<Value>,
) -> Response {
    state.tool_runs.lock().unwrap().push(values.clone());

    match slug.as_str() {
        "word-counter" => {
            let text = values["text"].as_str().unwrap_or_default();
            if text.len() > 100 {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"message": "Text is too long"})),
                )
                    .into_response();
            }
            Json(json!({"data": {
                "words": text.split_whitespace().count(),
                "characters": text.chars().count(),
                "summary": text,
            }}))
            .into_response()
        }
        "uuid-generator" => {
            let n = state.tool_runs.lock().unwrap().len();
            Json(json!({"data": {"uuid": format!("uuid-{n}")}})).into_response()
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Unknown tool"}))).into_response(),
    }
}

// ---------------------------------------------------------------------------
// Session observer
// ---------------------------------------------------------------------------

/// Records every navigation request.
#[derive(Default)]
pub struct RecordingObserver {
    pub visits: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn navigate(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_string());
    }
}
