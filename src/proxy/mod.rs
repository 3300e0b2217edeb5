//! Same-origin API relay.
//!
//! # Data Flow
//! ```text
//! ANY /api/{path}?{query}
//!     → headers.rs (Authorization / Content-Type allowlist)
//!     → multipart.rs (re-encode form bodies with a fresh boundary)
//!     → forwarder.rs (send to {API_URL}/{path}?{query})
//!     → status + content type + body, untouched
//! ```
//!
//! # Design Decisions
//! - No retries and no circuit breaking; failures surface as 502/504
//! - Responses are never parsed

pub mod error;
pub mod forwarder;
pub mod headers;
pub mod multipart;

pub use error::ProxyError;
pub use forwarder::{Forwarder, UpstreamResponse};
