//! Network layer subsystem.
//!
//! Plain TCP listeners come straight from tokio; this module only holds
//! the optional TLS setup.

pub mod tls;
