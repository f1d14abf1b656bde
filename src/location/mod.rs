//! Location source abstraction
//!
//! The platform location service is an external capability. This module
//! defines the port through which raw fixes reach a capture session, plus a
//! scripted mock used by tests and the demo binary.

pub mod error;
pub mod mock;

pub use error::{LocationError, LocationResult, RecoveryStrategy};
pub use mock::MockLocationSource;

use crate::core::RawFix;

/// Push-style location provider (platform watch API)
pub trait LocationSource: Send {
    /// Begin watching for fixes
    fn start(&mut self) -> LocationResult<()>;

    /// Stop watching. Safe to call when already stopped.
    fn stop(&mut self);

    /// Non-blocking read of the next delivered fix.
    /// Returns Ok(None) when nothing is pending.
    fn read_fix(&mut self) -> LocationResult<Option<RawFix>>;

    /// Whether the watch is currently running
    fn is_watching(&self) -> bool;

    /// Delivery counters for diagnostics
    fn status(&self) -> SourceStatus;
}

/// Delivery counters of a location source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceStatus {
    pub watching: bool,
    pub fixes_delivered: u32,
    pub error_count: u32,
    pub last_fix_time_ms: Option<u64>,
}

impl SourceStatus {
    pub fn is_healthy(&self) -> bool {
        self.watching && self.error_count < 10
    }
}
