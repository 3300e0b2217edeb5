//! Schema-driven tool forms: backend-defined tools run without per-tool code.

pub mod error;
pub mod form;
pub mod history;
pub mod result;
pub mod runner;
pub mod schema;

pub use error::{FieldError, ToolError};
pub use form::ToolForm;
pub use history::{GeneratorHistory, HISTORY_LIMIT};
pub use result::{classify, humanize, render, ResultEntry, ResultValue, ToolResult};
pub use runner::{ToolRunner, ToolSession};
pub use schema::{FieldDescriptor, FieldKind, SelectOption, ToolSchema};
