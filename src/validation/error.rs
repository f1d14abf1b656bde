//! Error classification for the capture pipeline

use crate::location::LocationError;
use thiserror::Error;

/// Result type for capture and reduction operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors raised by the sampler, reducer and geoid lookup
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// Reduction attempted on a window that collected no fixes
    #[error("no fixes collected during the capture window")]
    NoData,
    /// Coordinate rejected by strict validation
    #[error("invalid coordinate ({latitude}, {longitude}): {reason}")]
    InvalidCoordinate {
        latitude: f64,
        longitude: f64,
        reason: String,
    },
    /// Operation not allowed in the sampler's current state
    #[error("cannot {operation} while sampler is {state}")]
    InvalidState { operation: String, state: String },
    /// Geoid grid does not cover the globe on a regular step
    #[error("invalid geoid grid: {reason}")]
    InvalidGrid { reason: String },
    /// Platform location service reported a failure
    #[error("location service error: {error}")]
    Location { error: LocationError },
}

impl From<LocationError> for CaptureError {
    fn from(error: LocationError) -> Self {
        CaptureError::Location { error }
    }
}

impl CaptureError {
    /// Whether the caller can reasonably re-arm a window and try again
    pub fn is_retryable(&self) -> bool {
        match self {
            CaptureError::NoData => true,
            CaptureError::InvalidCoordinate { .. } => true,
            CaptureError::InvalidState { .. } => false,
            CaptureError::InvalidGrid { .. } => false,
            CaptureError::Location { error } => error.is_recoverable(),
        }
    }
}
