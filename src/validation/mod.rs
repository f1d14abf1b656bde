//! Capture error types

pub mod error;

pub use error::{CaptureError, CaptureResult};
