//! Common API types and data structures

use crate::location::{LocationError, SourceStatus};
use crate::processing::SamplerState;
use serde::{Deserialize, Serialize};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable single line
    Text,
    /// JSON object
    Json,
    /// CSV row with header
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Events emitted by a capture session for UI feedback
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// A window was opened
    WindowStarted { duration_secs: u64 },
    /// A fix was added to the open window
    SampleAccepted {
        sample_count: usize,
        accuracy_m: Option<f64>,
    },
    /// A fix failed coordinate validation
    FixRejected { reason: String },
    /// Live accuracy readout changed (None while the signal is lost)
    InstantAccuracyChanged { accuracy_m: Option<f64> },
    /// The location service reported a failure
    LocationFailed { error: LocationError },
    /// The open window was abandoned
    WindowCancelled { discarded: usize },
    /// The window was reduced (successfully or not)
    WindowCompleted { sample_count: usize, success: bool },
}

/// Snapshot of a capture session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    /// Sampler state
    pub state: SamplerState,
    /// Fixes in the open window
    pub sample_count: usize,
    /// Countdown seconds left in the open window
    pub remaining_secs: u64,
    /// Latest accuracy reported by the location source
    pub instant_accuracy_m: Option<f64>,
    /// Windows reduced to a coordinate
    pub windows_completed: u32,
    /// Windows that ended without a coordinate
    pub windows_failed: u32,
    /// Location source counters
    pub source: SourceStatus,
}
