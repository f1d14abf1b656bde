//! Callback-based capture session
//!
//! Drives one location source and one sampler from a caller-supplied clock.
//! The host calls [`CaptureSession::poll`] regularly (UI tick, timer
//! interrupt); fixes are drained from the source, the window clock advances,
//! and registered callbacks are fired when a window completes.

use crate::api::types::{CaptureEvent, SessionStatus};
use crate::core::ReducedCoordinate;
use crate::location::{LocationError, LocationSource, RecoveryStrategy};
use crate::processing::{FixDisposition, Sampler, SamplerState};
use crate::utils::config::CaptureConfig;
use crate::validation::error::{CaptureError, CaptureResult};
use log::{info, warn};
use std::collections::HashMap;
use std::time::Duration;

/// Callback function type for window completion
pub type CompletionCallback = Box<dyn Fn(&CaptureResult<ReducedCoordinate>) + Send>;

/// Callback function type for session events
pub type EventCallback = Box<dyn Fn(&CaptureEvent) + Send>;

/// Callback registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle(u32);

impl CallbackHandle {
    fn new(id: u32) -> Self {
        CallbackHandle(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Owns a sampler and its location source for a single capture point
pub struct CaptureSession {
    config: CaptureConfig,
    sampler: Sampler,
    source: Box<dyn LocationSource>,
    /// Latest accuracy seen on the stream, None while the signal is lost
    instant_accuracy_m: Option<f64>,
    /// Clock reading of the previous poll while a window is open
    last_poll_ms: Option<u64>,
    /// Back-off requested by the last location error, applied by the next poll
    retry_delay_ms: Option<u32>,
    /// Clock reading before which the source is not read again
    resume_at_ms: Option<u64>,
    windows_completed: u32,
    windows_failed: u32,
    callback_counter: u32,
    completion_callbacks: HashMap<CallbackHandle, CompletionCallback>,
    event_callbacks: HashMap<CallbackHandle, EventCallback>,
}

impl CaptureSession {
    /// Create a session around a location source
    pub fn new(config: CaptureConfig, source: Box<dyn LocationSource>) -> Self {
        Self {
            sampler: config.build_sampler(),
            config,
            source,
            instant_accuracy_m: None,
            last_poll_ms: None,
            retry_delay_ms: None,
            resume_at_ms: None,
            windows_completed: 0,
            windows_failed: 0,
            callback_counter: 0,
            completion_callbacks: HashMap::new(),
            event_callbacks: HashMap::new(),
        }
    }

    /// Register a window-complete callback
    pub fn register_completion_callback(&mut self, callback: CompletionCallback) -> CallbackHandle {
        self.callback_counter += 1;
        let handle = CallbackHandle::new(self.callback_counter);
        self.completion_callbacks.insert(handle, callback);
        handle
    }

    /// Register an event callback
    pub fn register_event_callback(&mut self, callback: EventCallback) -> CallbackHandle {
        self.callback_counter += 1;
        let handle = CallbackHandle::new(self.callback_counter);
        self.event_callbacks.insert(handle, callback);
        handle
    }

    /// Unregister a callback. Returns false for an unknown handle.
    pub fn unregister_callback(&mut self, handle: CallbackHandle) -> bool {
        self.completion_callbacks.remove(&handle).is_some()
            || self.event_callbacks.remove(&handle).is_some()
    }

    /// Get number of registered callbacks (completion, event)
    pub fn callback_count(&self) -> (usize, usize) {
        (self.completion_callbacks.len(), self.event_callbacks.len())
    }

    /// Start the location watch so the instant accuracy readout is live
    pub fn start_monitoring(&mut self) -> CaptureResult<()> {
        if self.source.is_watching() {
            return Ok(());
        }
        if let Err(error) = self.source.start() {
            warn!("location source failed to start: {}", error);
            self.trigger_event(CaptureEvent::LocationFailed {
                error: error.clone(),
            });
            return Err(error.into());
        }
        Ok(())
    }

    /// Stop the location watch. An open window keeps its fixes but receives no more.
    pub fn stop_monitoring(&mut self) {
        self.source.stop();
        self.set_instant_accuracy(None);
    }

    /// Open a capture window at clock reading `now_ms`
    pub fn start_window(&mut self, now_ms: u64) -> CaptureResult<()> {
        self.start_monitoring()?;
        let window = self.config.window();
        self.sampler.start_window(window)?;
        self.last_poll_ms = Some(now_ms);
        self.retry_delay_ms = None;
        self.resume_at_ms = None;
        self.trigger_event(CaptureEvent::WindowStarted {
            duration_secs: window.as_secs(),
        });
        Ok(())
    }

    /// Abandon the open window. No completion callback fires.
    pub fn cancel_window(&mut self) -> bool {
        let discarded = self.sampler.sample_count();
        if !self.sampler.cancel_window() {
            return false;
        }
        self.last_poll_ms = None;
        self.trigger_event(CaptureEvent::WindowCancelled { discarded });
        true
    }

    /// Drain everything the source has delivered. Returns the number of fixes read.
    ///
    /// Draining stops at the first location error; the source is read again
    /// on a later call. A non-recoverable error stops the watch and closes the
    /// open window early so the fixes already collected are still reduced.
    pub fn pump(&mut self) -> usize {
        let mut fixes_read = 0;
        loop {
            match self.source.read_fix() {
                Ok(Some(fix)) => {
                    fixes_read += 1;
                    self.set_instant_accuracy(fix.accuracy_m);
                    match self.sampler.on_fix(fix) {
                        Ok(FixDisposition::Accepted) => {
                            let accuracy_m = self.sampler.buffer().last().and_then(|f| f.accuracy_m());
                            self.trigger_event(CaptureEvent::SampleAccepted {
                                sample_count: self.sampler.sample_count(),
                                accuracy_m,
                            });
                        }
                        Ok(FixDisposition::Ignored) => {}
                        Err(err) => self.trigger_event(CaptureEvent::FixRejected {
                            reason: err.to_string(),
                        }),
                    }
                }
                Ok(None) | Err(LocationError::NotWatching) => break,
                Err(error) => {
                    self.set_instant_accuracy(None);
                    self.trigger_event(CaptureEvent::LocationFailed {
                        error: error.clone(),
                    });
                    match error.recovery_strategy() {
                        RecoveryStrategy::KeepWaiting => {
                            warn!("location error during capture, still waiting: {}", error);
                        }
                        RecoveryStrategy::RetryWithDelay { delay_ms } => {
                            warn!("location error, retrying in {}ms: {}", delay_ms, error);
                            self.retry_delay_ms = Some(delay_ms);
                        }
                        RecoveryStrategy::UserIntervention | RecoveryStrategy::Fail => {
                            warn!("location error is not recoverable: {}", error);
                            self.source.stop();
                            if self.sampler.state() == SamplerState::Armed {
                                if let Err(err) = self.sampler.close_window() {
                                    warn!("could not close window: {}", err);
                                }
                            }
                        }
                    }
                    break;
                }
            }
        }
        fixes_read
    }

    /// Drain the source and advance the window clock to `now_ms`.
    /// Returns the window outcome once the window has ended.
    pub fn poll(&mut self, now_ms: u64) -> Option<CaptureResult<ReducedCoordinate>> {
        if self.resume_at_ms.map_or(true, |at| now_ms >= at) {
            self.resume_at_ms = None;
            self.pump();
            if let Some(delay_ms) = self.retry_delay_ms.take() {
                self.resume_at_ms = Some(now_ms.saturating_add(u64::from(delay_ms)));
            }
        }

        if let Some(last) = self.last_poll_ms {
            let elapsed = Duration::from_millis(now_ms.saturating_sub(last));
            self.sampler.tick(elapsed);
            self.last_poll_ms = Some(now_ms);
        }

        match self.sampler.state() {
            SamplerState::Completed => Some(self.finish()),
            _ => None,
        }
    }

    /// Close the open window ahead of its deadline and reduce it
    pub fn finish_now(&mut self) -> CaptureResult<ReducedCoordinate> {
        if self.sampler.state() == SamplerState::Idle {
            return Err(CaptureError::InvalidState {
                operation: "finish window".to_string(),
                state: self.sampler.state().to_string(),
            });
        }
        self.pump();
        self.sampler.close_window()?;
        self.finish()
    }

    fn finish(&mut self) -> CaptureResult<ReducedCoordinate> {
        let sample_count = self.sampler.sample_count();
        let result = self.sampler.complete();
        self.last_poll_ms = None;
        self.retry_delay_ms = None;
        self.resume_at_ms = None;
        self.stop_monitoring();
        self.deliver(result, sample_count)
    }

    fn deliver(
        &mut self,
        result: CaptureResult<ReducedCoordinate>,
        sample_count: usize,
    ) -> CaptureResult<ReducedCoordinate> {
        match &result {
            Ok(coord) => {
                self.windows_completed += 1;
                info!(
                    "window reduced to ({:.7}, {:.7}) from {} of {} fixes",
                    coord.lat, coord.lon, coord.kept_count, coord.sample_count
                );
            }
            Err(err) => {
                self.windows_failed += 1;
                warn!("window ended without a coordinate: {}", err);
            }
        }

        self.trigger_event(CaptureEvent::WindowCompleted {
            sample_count,
            success: result.is_ok(),
        });
        for callback in self.completion_callbacks.values() {
            callback(&result);
        }
        result
    }

    fn set_instant_accuracy(&mut self, accuracy_m: Option<f64>) {
        if self.instant_accuracy_m != accuracy_m {
            self.instant_accuracy_m = accuracy_m;
            self.trigger_event(CaptureEvent::InstantAccuracyChanged { accuracy_m });
        }
    }

    fn trigger_event(&self, event: CaptureEvent) {
        for callback in self.event_callbacks.values() {
            callback(&event);
        }
    }

    /// Live accuracy of the most recent fix
    pub fn instant_accuracy(&self) -> Option<f64> {
        self.instant_accuracy_m
    }

    pub fn state(&self) -> SamplerState {
        self.sampler.state()
    }

    pub fn sample_count(&self) -> usize {
        self.sampler.sample_count()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.sampler.remaining_secs()
    }

    pub fn get_config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Replace the configuration. Takes effect for the next window.
    pub fn update_config(&mut self, config: CaptureConfig) -> CaptureResult<()> {
        if self.sampler.state() != SamplerState::Idle {
            return Err(CaptureError::InvalidState {
                operation: "update configuration".to_string(),
                state: self.sampler.state().to_string(),
            });
        }
        self.sampler = config.build_sampler();
        self.config = config;
        Ok(())
    }

    /// Snapshot of the session for status displays
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.sampler.state(),
            sample_count: self.sampler.sample_count(),
            remaining_secs: self.sampler.remaining_secs(),
            instant_accuracy_m: self.instant_accuracy_m,
            windows_completed: self.windows_completed,
            windows_failed: self.windows_failed,
            source: self.source.status(),
        }
    }
}
