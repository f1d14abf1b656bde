//! GPS point capture
//!
//! Samples raw GPS fixes over a fixed window, corrects each fix from
//! ellipsoidal to orthometric (mean-sea-level) height with the EGM96 geoid,
//! and reduces the window to one best-estimate coordinate using a tiered
//! accuracy filter and a trimmed mean.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod location;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use core::{CorrectedFix, PoolTier, RawFix, ReducedCoordinate};
pub use algorithms::{normalize_longitude, GeoidCorrector, GeoidGrid, Reducer, ReductionPolicy};
pub use processing::{FixDisposition, Sampler, SamplerState};
pub use validation::{CaptureError, CaptureResult};
pub use location::{LocationError, LocationSource, MockLocationSource, RecoveryStrategy, SourceStatus};
pub use utils::config::{CaptureConfig, ConfigError, ConfigurationManager, LogLevel};
pub use api::{
    CallbackHandle, CaptureEvent, CaptureSession, CoordinateFormatter, CsvFormatter, JsonFormatter,
    OutputFormat, SessionStatus, TextFormatter,
};
