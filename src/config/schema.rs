//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway
//! and the dashboard client. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Backend API the `/api` prefix forwards to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Body limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Dashboard client settings.
    pub client: ClientConfig,

    /// Upload image preprocessing.
    pub images: ImageConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Upstream backend API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL requests under `/api` are forwarded to.
    /// Overridden by the `API_URL` environment variable.
    pub api_url: String,

    /// Request headers forwarded in addition to `Authorization` and `Content-Type`.
    pub extra_forward_headers: Vec<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000/api".to_string(),
            extra_forward_headers: Vec::new(),
        }
    }
}

impl UpstreamConfig {
    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Overall inbound request timeout in seconds.
    pub request_secs: u64,

    /// Upstream connect timeout in seconds.
    pub connect_secs: u64,

    /// Upstream response timeout in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            connect_secs: 5,
            upstream_secs: 30,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 20 * 1024 * 1024, // 20MB, uploads go through here
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Dashboard client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the gateway's `/api` prefix.
    pub base_url: String,

    /// File the token pair is persisted to.
    pub storage_path: String,

    /// Where an expired session is sent.
    pub login_path: String,

    /// Client request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api".to_string(),
            storage_path: ".folio/credentials.json".to_string(),
            login_path: "/login".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Image preprocessing applied before uploads.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Target size in bytes.
    pub max_bytes: usize,

    /// Longest edge in pixels.
    pub max_dimension: u32,

    /// First JPEG quality tried (0.0 - 1.0).
    pub initial_quality: f32,

    /// Quality decrement per attempt.
    pub quality_step: f32,

    /// Lowest JPEG quality tried.
    pub min_quality: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024,
            max_dimension: 1920,
            initial_quality: 0.85,
            quality_step: 0.1,
            min_quality: 0.4,
        }
    }
}
