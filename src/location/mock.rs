//! Scripted location source for testing and development

use crate::core::RawFix;
use crate::location::{LocationError, LocationResult, LocationSource, SourceStatus};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum ScriptedEvent {
    Fix(RawFix),
    Error(LocationError),
}

/// Location source that replays queued fixes and errors in order
#[derive(Debug, Default)]
pub struct MockLocationSource {
    script: VecDeque<ScriptedEvent>,
    status: SourceStatus,
    start_error: Option<LocationError>,
}

impl MockLocationSource {
    /// Create an empty mock source
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source that will deliver the given fixes in order
    pub fn with_fixes(fixes: impl IntoIterator<Item = RawFix>) -> Self {
        let mut source = Self::new();
        for fix in fixes {
            source.push_fix(fix);
        }
        source
    }

    /// Queue a fix for delivery
    pub fn push_fix(&mut self, fix: RawFix) {
        self.script.push_back(ScriptedEvent::Fix(fix));
    }

    /// Queue an error for delivery
    pub fn push_error(&mut self, error: LocationError) {
        self.script.push_back(ScriptedEvent::Error(error));
    }

    /// Make the next `start` call fail
    pub fn fail_start_with(&mut self, error: LocationError) {
        self.start_error = Some(error);
    }

    /// Number of events still queued
    pub fn pending(&self) -> usize {
        self.script.len()
    }
}

impl LocationSource for MockLocationSource {
    fn start(&mut self) -> LocationResult<()> {
        if let Some(error) = self.start_error.take() {
            self.status.error_count += 1;
            return Err(error);
        }
        self.status.watching = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.status.watching = false;
    }

    fn read_fix(&mut self) -> LocationResult<Option<RawFix>> {
        if !self.status.watching {
            return Err(LocationError::NotWatching);
        }

        match self.script.pop_front() {
            Some(ScriptedEvent::Fix(fix)) => {
                self.status.fixes_delivered += 1;
                self.status.last_fix_time_ms = Some(fix.timestamp_ms);
                Ok(Some(fix))
            }
            Some(ScriptedEvent::Error(error)) => {
                self.status.error_count += 1;
                Err(error)
            }
            None => Ok(None),
        }
    }

    fn is_watching(&self) -> bool {
        self.status.watching
    }

    fn status(&self) -> SourceStatus {
        self.status.clone()
    }
}
