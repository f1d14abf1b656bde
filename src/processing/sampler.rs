//! Capture-window accumulator
//!
//! The sampler is an explicit three-state machine. Its state is consulted on
//! every incoming fix, so a location stream that was started earlier can never
//! push samples into a window that is not open.

use crate::algorithms::{validate_coordinate, GeoidCorrector, Reducer};
use crate::core::{CorrectedFix, RawFix, ReducedCoordinate, DEFAULT_WINDOW_SECS};
use crate::validation::error::{CaptureError, CaptureResult};
use log::{debug, info, warn};
use std::fmt;
use std::time::Duration;

/// Lifecycle of one capture window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// No window open
    Idle,
    /// Window open and collecting fixes
    Armed,
    /// Window elapsed or force-closed, waiting for reduction
    Completed,
}

impl fmt::Display for SamplerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerState::Idle => write!(f, "Idle"),
            SamplerState::Armed => write!(f, "Armed"),
            SamplerState::Completed => write!(f, "Completed"),
        }
    }
}

/// What happened to a fix handed to the sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixDisposition {
    /// Corrected and appended to the buffer
    Accepted,
    /// Dropped because no window is open
    Ignored,
}

/// Accumulates corrected fixes for a single timed window
#[derive(Debug, Clone)]
pub struct Sampler {
    corrector: GeoidCorrector,
    reducer: Reducer,
    state: SamplerState,
    buffer: Vec<CorrectedFix>,
    window: Duration,
    elapsed: Duration,
    reject_invalid_coordinates: bool,
    rejected_count: usize,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(GeoidCorrector::egm96(), Reducer::default())
    }
}

impl Sampler {
    /// Create an idle sampler around the given corrector and reducer
    pub fn new(corrector: GeoidCorrector, reducer: Reducer) -> Self {
        Self {
            corrector,
            reducer,
            state: SamplerState::Idle,
            buffer: Vec::new(),
            window: Duration::from_secs(DEFAULT_WINDOW_SECS as u64),
            elapsed: Duration::ZERO,
            reject_invalid_coordinates: true,
            rejected_count: 0,
        }
    }

    /// Enable or disable fail-fast coordinate validation on incoming fixes
    pub fn with_coordinate_validation(mut self, enabled: bool) -> Self {
        self.reject_invalid_coordinates = enabled;
        self
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Fixes collected in the current window (informational)
    pub fn sample_count(&self) -> usize {
        self.buffer.len()
    }

    /// Fixes rejected by validation since the window opened
    pub fn rejected_count(&self) -> usize {
        self.rejected_count
    }

    pub fn buffer(&self) -> &[CorrectedFix] {
        &self.buffer
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Time left before the window closes, zero unless armed
    pub fn remaining(&self) -> Duration {
        match self.state {
            SamplerState::Armed => self.window.saturating_sub(self.elapsed),
            _ => Duration::ZERO,
        }
    }

    /// Whole seconds left, rounded up, for countdown displays
    pub fn remaining_secs(&self) -> u64 {
        let remaining = self.remaining();
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    /// Open a new window. Any window in progress is discarded and restarted.
    pub fn start_window(&mut self, duration: Duration) -> CaptureResult<()> {
        if duration.is_zero() {
            return Err(CaptureError::InvalidState {
                operation: "start a zero-length window".to_string(),
                state: self.state.to_string(),
            });
        }
        if self.state != SamplerState::Idle {
            debug!("restarting capture window, discarding {} fixes", self.buffer.len());
        }

        self.buffer.clear();
        self.rejected_count = 0;
        self.window = duration;
        self.elapsed = Duration::ZERO;
        self.state = SamplerState::Armed;
        info!("capture window opened for {:?}", duration);
        Ok(())
    }

    /// Hand a fix from the location stream to the sampler
    pub fn on_fix(&mut self, raw: RawFix) -> CaptureResult<FixDisposition> {
        if self.state != SamplerState::Armed {
            return Ok(FixDisposition::Ignored);
        }

        if self.reject_invalid_coordinates {
            if let Err(err) = validate_coordinate(raw.lat, raw.lon) {
                self.rejected_count += 1;
                warn!("rejected fix: {}", err);
                return Err(err);
            }
        }

        let corrected = self.correct(raw);
        debug!(
            "fix #{} at ({:.7}, {:.7}) accuracy {:?} m",
            self.buffer.len() + 1,
            corrected.lat(),
            corrected.lon(),
            corrected.accuracy_m()
        );
        self.buffer.push(corrected);
        Ok(FixDisposition::Accepted)
    }

    /// Apply geoid correction to a raw fix
    pub fn correct(&self, mut raw: RawFix) -> CorrectedFix {
        if let Some(acc) = raw.accuracy_m {
            if !acc.is_finite() || acc <= 0.0 {
                warn!("discarding unusable accuracy {} m, fix ranks last", acc);
                raw.accuracy_m = None;
            }
        }

        let undulation_m = self.corrector.undulation(raw.lat, raw.lon);
        let orthometric_altitude_m = raw.ellipsoidal_altitude_m.map(|h| h - undulation_m);
        CorrectedFix {
            raw,
            undulation_m,
            orthometric_altitude_m,
        }
    }

    /// Advance the window clock. Closes the window once its duration has elapsed.
    pub fn tick(&mut self, elapsed: Duration) -> SamplerState {
        if self.state == SamplerState::Armed {
            self.elapsed = self.elapsed.saturating_add(elapsed);
            if self.elapsed >= self.window {
                self.state = SamplerState::Completed;
                info!("capture window elapsed with {} fixes", self.buffer.len());
            }
        }
        self.state
    }

    /// Force an open window closed ahead of its deadline
    pub fn close_window(&mut self) -> CaptureResult<()> {
        match self.state {
            SamplerState::Armed => {
                self.state = SamplerState::Completed;
                Ok(())
            }
            SamplerState::Completed => Ok(()),
            SamplerState::Idle => Err(CaptureError::InvalidState {
                operation: "close window".to_string(),
                state: self.state.to_string(),
            }),
        }
    }

    /// Abandon the current window without producing a coordinate.
    /// Returns false if there was nothing to cancel.
    pub fn cancel_window(&mut self) -> bool {
        if self.state == SamplerState::Idle {
            return false;
        }
        info!("capture window cancelled, discarding {} fixes", self.buffer.len());
        self.reset();
        true
    }

    /// Reduce a completed window and return to idle.
    /// The buffer is cleared whether or not reduction succeeds.
    pub fn complete(&mut self) -> CaptureResult<ReducedCoordinate> {
        if self.state != SamplerState::Completed {
            return Err(CaptureError::InvalidState {
                operation: "complete window".to_string(),
                state: self.state.to_string(),
            });
        }

        let result = self.reducer.reduce(&self.buffer);
        self.reset();
        result
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.elapsed = Duration::ZERO;
        self.state = SamplerState::Idle;
    }
}
