//! Core data types for the capture pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One instantaneous reading from the platform location service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees (any real value, wrapped for lookups)
    #[serde(alias = "lng")]
    pub lon: f64,
    /// Horizontal accuracy radius in meters, smaller is better
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    /// Height above the reference ellipsoid in meters
    #[serde(default)]
    pub ellipsoidal_altitude_m: Option<f64>,
    /// Capture time (milliseconds since epoch)
    pub timestamp_ms: u64,
}

impl RawFix {
    pub fn new(lat: f64, lon: f64, timestamp_ms: u64) -> Self {
        Self {
            lat,
            lon,
            accuracy_m: None,
            ellipsoidal_altitude_m: None,
            timestamp_ms,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    pub fn with_altitude(mut self, ellipsoidal_altitude_m: f64) -> Self {
        self.ellipsoidal_altitude_m = Some(ellipsoidal_altitude_m);
        self
    }
}

/// A raw fix whose altitude has been referred to mean sea level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedFix {
    /// The reading as delivered by the location service
    pub raw: RawFix,
    /// Geoid undulation applied at this fix's position (meters)
    pub undulation_m: f64,
    /// Orthometric (MSL) altitude, absent when the raw altitude was absent
    pub orthometric_altitude_m: Option<f64>,
}

impl CorrectedFix {
    pub fn lat(&self) -> f64 {
        self.raw.lat
    }

    pub fn lon(&self) -> f64 {
        self.raw.lon
    }

    pub fn accuracy_m(&self) -> Option<f64> {
        self.raw.accuracy_m
    }

    /// Accuracy used for ranking. A missing accuracy ranks last.
    pub fn rank_accuracy(&self) -> f64 {
        self.raw.accuracy_m.unwrap_or(f64::INFINITY)
    }
}

/// Which accuracy tier supplied the working pool of a reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolTier {
    /// Enough fixes met the high-accuracy threshold
    High,
    /// Fell back to fixes within the medium threshold
    Medium,
    /// No fix met either threshold, the whole buffer was used
    Degraded,
}

impl PoolTier {
    pub fn is_degraded(&self) -> bool {
        matches!(self, PoolTier::Degraded)
    }
}

/// The single coordinate produced from one completed capture window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedCoordinate {
    /// Mean latitude of the kept fixes
    pub lat: f64,
    /// Mean longitude of the kept fixes
    pub lon: f64,
    /// Mean horizontal accuracy of the kept fixes (meters)
    pub accuracy_m: Option<f64>,
    /// Mean MSL altitude over kept fixes that reported one
    pub orthometric_altitude_m: Option<f64>,
    /// When the reduction ran
    pub produced_at: DateTime<Utc>,
    /// Number of fixes collected during the window
    pub sample_count: usize,
    /// Tier the working pool came from
    pub pool_tier: PoolTier,
    /// Number of fixes that survived the trim
    pub kept_count: usize,
}

impl ReducedCoordinate {
    pub fn produced_at_ms(&self) -> i64 {
        self.produced_at.timestamp_millis()
    }
}
