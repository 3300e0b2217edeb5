//! Upload preprocessing.
//!
//! Image parts are shrunk before they leave the client so uploads stay
//! under the backend's size budget.

pub mod compress;
pub mod file;

pub use compress::{compress_image, ImageError};
pub use file::{content_type_for, UploadFile};
