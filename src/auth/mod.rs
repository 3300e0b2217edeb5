//! Authenticated client subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → client.rs (attach bearer, send through the gateway)
//!     → 401? coordinator.rs (one refresh in flight, others queue)
//!         → success: tokens.rs persists pair, request replayed once
//!         → failure: credentials cleared, session.rs navigates to login
//! ```
//!
//! Stored credentials live under the `token` and `refresh_token` keys of a
//! [`Storage`] (see storage.rs).

pub mod client;
pub mod coordinator;
pub mod error;
pub mod session;
pub mod storage;
pub mod tokens;

pub use client::{ApiRequest, AuthenticatedClient, Envelope, RequestBody, UploadPart};
pub use coordinator::{RefreshCoordinator, RefreshError};
pub use error::ClientError;
pub use session::{LogObserver, SessionObserver};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, REFRESH_TOKEN_KEY, TOKEN_KEY};
pub use tokens::{Credentials, TokenPair};
