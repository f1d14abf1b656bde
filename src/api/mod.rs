//! Caller-facing capture API
//!
//! - **Callback**: [`CaptureSession`] for event-driven hosts
//! - **Formatting**: renderers for reduced coordinates

pub mod callback;
pub mod formatting;
pub mod types;

pub use callback::{CallbackHandle, CaptureSession, CompletionCallback, EventCallback};
pub use formatting::{render, CoordinateFormatter, CsvFormatter, JsonFormatter, TextFormatter};
pub use types::{CaptureEvent, OutputFormat, SessionStatus};
