//! Folio gateway and dashboard client library.
//!
//! ```text
//!   browser ──▶ /api/{path} ──▶ http::server ──▶ proxy::Forwarder ──▶ API_URL/{path}
//!
//!   dashboard ──▶ auth::AuthenticatedClient ──▶ gateway or API
//!                    ├── auth::RefreshCoordinator (one refresh per burst of 401s)
//!                    ├── images (shrink uploads before multipart encode)
//!                    └── tools (schema-driven forms and result rendering)
//! ```

pub mod auth;
pub mod config;
pub mod http;
pub mod images;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod tools;

pub use auth::AuthenticatedClient;
pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
