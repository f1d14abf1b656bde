//! Location service error types and handling

use thiserror::Error;

/// Failures reported by the platform location service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// User or OS refused location access
    #[error("location permission denied")]
    PermissionDenied,
    /// No usable signal (indoors, GPS off, cold start)
    #[error("position unavailable, GPS signal too weak or disabled")]
    PositionUnavailable,
    /// The service did not produce a fix in time
    #[error("location request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u32 },
    /// Device has no location capability
    #[error("location service not supported on this device")]
    Unsupported,
    /// Fix requested from a source that was never started
    #[error("location source is not watching")]
    NotWatching,
}

/// Result type for location source operations
pub type LocationResult<T> = Result<T, LocationError>;

/// What a caller should do after a location failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Keep watching, the next fix may arrive
    KeepWaiting,
    /// Restart the watch after a delay
    RetryWithDelay { delay_ms: u32 },
    /// Needs user action (settings, permissions)
    UserIntervention,
    /// Cannot recover on this device
    Fail,
}

impl LocationError {
    /// Get the recommended recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            LocationError::PermissionDenied => RecoveryStrategy::UserIntervention,
            LocationError::PositionUnavailable => RecoveryStrategy::KeepWaiting,
            LocationError::Timeout { .. } => RecoveryStrategy::RetryWithDelay { delay_ms: 1000 },
            LocationError::Unsupported => RecoveryStrategy::Fail,
            LocationError::NotWatching => RecoveryStrategy::RetryWithDelay { delay_ms: 0 },
        }
    }

    /// Check if this error can clear up without user action
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.recovery_strategy(),
            RecoveryStrategy::Fail | RecoveryStrategy::UserIntervention
        )
    }
}
