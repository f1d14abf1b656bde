//! Capture policy and geoid grid parameters

/// Fixes at or below this accuracy (meters) form the preferred pool
pub const HIGH_ACCURACY_THRESHOLD_M: f64 = 20.0;

/// Fallback pool threshold (meters)
pub const MID_ACCURACY_THRESHOLD_M: f64 = 100.0;

/// The high tier is only used when it holds at least this many fixes
pub const MIN_HIGH_TIER_FIXES: usize = 2;

/// Fraction of the ranked pool kept by the trimmed mean
pub const KEEP_FRACTION: f64 = 0.8;

/// Default capture window length (seconds)
pub const DEFAULT_WINDOW_SECS: u32 = 5;

/// Latitude/longitude spacing of the bundled EGM96 grid (degrees)
pub const EGM96_GRID_STEP_DEG: f64 = 10.0;
