//! Geoid undulation lookup over a regular global grid
//!
//! Converts ellipsoidal (raw GPS) heights to orthometric (MSL) heights by
//! bilinear interpolation of the geoid-ellipsoid separation. The bundled table
//! is a coarse EGM96 sampling on a 10° step: 19 rows from +90° to -90° and 37
//! columns from -180° to +180°, the last column repeating the first.

use crate::core::EGM96_GRID_STEP_DEG;
use crate::validation::error::{CaptureError, CaptureResult};
use nalgebra::DMatrix;
use std::sync::{Arc, OnceLock};

const EGM96_ROWS: usize = 19;
const EGM96_COLS: usize = 37;

#[rustfmt::skip]
const EGM96_UNDULATION_M: [[i8; EGM96_COLS]; EGM96_ROWS] = [
    [13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13],
    [3, 1, -2, -3, -3, -3, -1, 3, 1, 5, 9, 11, 19, 27, 31, 34, 33, 34, 33, 34, 28, 23, 17, 13, 11, 4, 1, 1, 2, 2, 3, 2, 1, 1, 1, 1, 3],
    [-13, -15, -18, -14, -11, -7, -2, 1, -9, -1, 1, 11, 21, 21, 23, 26, 31, 35, 39, 45, 45, 45, 39, 34, 21, 18, 15, 14, 8, 5, 1, -3, -7, -10, -11, -12, -13],
    [-21, -27, -23, -14, -2, 7, 13, 18, 19, 20, 19, 13, 11, 13, 15, 14, 15, 20, 31, 42, 53, 59, 61, 62, 53, 39, 28, 14, 2, -5, -15, -23, -27, -26, -24, -22, -21],
    [-21, -25, -26, -15, 4, 16, 21, 23, 25, 25, 19, 7, -3, -10, -16, -20, -18, -12, 0, 15, 30, 43, 57, 60, 50, 42, 29, 21, 10, -3, -13, -20, -23, -24, -23, -22, -21],
    [-16, -18, -19, -15, -4, 11, 19, 23, 23, 21, 13, 2, -12, -26, -33, -34, -31, -21, -5, 14, 28, 33, 35, 34, 31, 25, 19, 16, 11, -1, -11, -18, -20, -20, -19, -17, -16],
    [4, 1, -5, -11, -12, 2, 14, 21, 25, 23, 11, 1, -13, -29, -38, -42, -43, -37, -19, 2, 16, 17, 15, 12, 11, 14, 16, 18, 13, 6, -3, -11, -13, -11, -5, 1, 4],
    [13, 11, 7, 1, -5, -3, 8, 15, 22, 21, 13, 1, -15, -31, -43, -51, -56, -55, -43, -21, -1, 3, 5, 5, 7, 11, 13, 15, 15, 11, 5, -2, -7, -6, -2, 6, 13],
    [15, 13, 10, 7, 5, 8, 12, 16, 21, 23, 17, 3, -14, -30, -42, -52, -58, -62, -53, -34, -15, -6, -3, -1, 3, 7, 10, 13, 15, 14, 11, 6, 2, 3, 5, 10, 15],
    [16, 15, 14, 14, 16, 21, 24, 26, 29, 29, 22, 11, -4, -20, -31, -40, -47, -53, -47, -33, -16, -8, -5, -2, 2, 6, 9, 13, 15, 16, 15, 13, 11, 12, 13, 14, 16],
    [13, 15, 17, 21, 24, 29, 32, 34, 34, 32, 26, 18, 8, -5, -15, -24, -31, -34, -31, -23, -11, -4, -1, 1, 4, 8, 10, 13, 15, 16, 16, 15, 14, 13, 13, 13, 13],
    [1, 5, 11, 17, 23, 29, 34, 38, 38, 34, 28, 22, 15, 6, -1, -9, -15, -18, -17, -13, -7, -2, 0, 2, 5, 9, 11, 12, 12, 11, 9, 7, 4, 3, 1, 1, 1],
    [-16, -11, -6, 2, 11, 19, 25, 29, 31, 31, 28, 25, 21, 16, 10, 4, 1, -1, -1, -1, 0, 1, 3, 5, 8, 11, 12, 11, 8, 4, 1, -4, -8, -12, -15, -17, -16],
    [-29, -25, -19, -11, -2, 8, 16, 22, 25, 27, 28, 28, 28, 26, 22, 17, 13, 11, 11, 11, 12, 12, 13, 15, 17, 18, 17, 13, 7, 1, -6, -14, -21, -26, -29, -30, -29],
    [-30, -31, -29, -23, -15, -6, 2, 10, 15, 19, 23, 26, 28, 28, 26, 24, 22, 21, 21, 23, 24, 24, 25, 26, 26, 24, 19, 11, 1, -8, -17, -25, -30, -32, -32, -31, -30],
    [-21, -24, -28, -28, -25, -19, -12, -5, 1, 7, 13, 18, 22, 24, 24, 23, 23, 24, 26, 28, 28, 28, 27, 26, 22, 17, 8, -1, -11, -20, -25, -28, -27, -26, -24, -22, -21],
    [-11, -15, -20, -25, -26, -26, -21, -15, -8, -1, 4, 10, 15, 19, 21, 22, 23, 24, 27, 29, 29, 28, 25, 21, 13, 4, -5, -13, -19, -21, -19, -15, -13, -11, -11, -10, -11],
    [-13, -14, -16, -19, -22, -25, -26, -24, -21, -16, -11, -5, -1, 4, 7, 10, 13, 16, 19, 21, 22, 21, 18, 13, 7, 1, -5, -10, -13, -13, -12, -11, -11, -11, -11, -12, -13],
    [-29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29, -29],
];

static EGM96_GRID: OnceLock<Arc<GeoidGrid>> = OnceLock::new();

/// Immutable table of undulation values (meters) on a fixed lat/lon step
#[derive(Debug, Clone, PartialEq)]
pub struct GeoidGrid {
    /// Grid spacing in degrees, identical for latitude and longitude
    step_deg: f64,
    /// Row 0 is +90°, column 0 is -180°
    values: DMatrix<f64>,
}

impl GeoidGrid {
    /// Build a grid from row-major values covering +90..=-90 and -180..=+180.
    ///
    /// The last column must be the 180° meridian, i.e. the same meridian as
    /// column 0, so longitude interpolation wraps onto column 0.
    pub fn new(step_deg: f64, rows: Vec<Vec<f64>>) -> CaptureResult<Self> {
        if !(step_deg > 0.0) || (180.0 / step_deg).fract() != 0.0 {
            return Err(CaptureError::InvalidGrid {
                reason: format!("step {} does not divide 180°", step_deg),
            });
        }

        let expected_rows = (180.0 / step_deg) as usize + 1;
        let expected_cols = (360.0 / step_deg) as usize + 1;

        if rows.len() != expected_rows {
            return Err(CaptureError::InvalidGrid {
                reason: format!("expected {} rows, got {}", expected_rows, rows.len()),
            });
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != expected_cols) {
            return Err(CaptureError::InvalidGrid {
                reason: format!(
                    "row {} has {} columns, expected {}",
                    bad,
                    rows[bad].len(),
                    expected_cols
                ),
            });
        }

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Self {
            step_deg,
            values: DMatrix::from_row_slice(expected_rows, expected_cols, &flat),
        })
    }

    /// The bundled EGM96 table, built once per process and shared
    pub fn egm96() -> Arc<GeoidGrid> {
        EGM96_GRID
            .get_or_init(|| {
                let flat: Vec<f64> = EGM96_UNDULATION_M
                    .iter()
                    .flat_map(|row| row.iter().map(|&v| v as f64))
                    .collect();
                Arc::new(Self {
                    step_deg: EGM96_GRID_STEP_DEG,
                    values: DMatrix::from_row_slice(EGM96_ROWS, EGM96_COLS, &flat),
                })
            })
            .clone()
    }

    pub fn step_deg(&self) -> f64 {
        self.step_deg
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn columns(&self) -> usize {
        self.values.ncols()
    }

    /// Raw table value at a grid node
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows() && col < self.columns() {
            Some(self.values[(row, col)])
        } else {
            None
        }
    }

    /// Bilinear interpolation at fractional grid coordinates.
    /// Rows clamp at the south pole, columns wrap at the date line.
    fn interpolate(&self, row: f64, col: f64) -> f64 {
        let last_row = self.rows() - 1;
        let wrap = self.columns() - 1;

        let r0 = (row.floor().max(0.0) as usize).min(last_row);
        let r1 = (r0 + 1).min(last_row);
        let c0 = (col.floor().max(0.0) as usize).min(wrap);
        let c1 = (c0 + 1) % wrap;

        let dr = row - r0 as f64;
        let dc = col - c0 as f64;

        let n00 = self.values[(r0, c0)];
        let n01 = self.values[(r0, c1)];
        let n10 = self.values[(r1, c0)];
        let n11 = self.values[(r1, c1)];

        (1.0 - dr) * (1.0 - dc) * n00
            + (1.0 - dr) * dc * n01
            + dr * (1.0 - dc) * n10
            + dr * dc * n11
    }
}

/// Wrap any longitude into [-180, 180)
pub fn normalize_longitude(lon: f64) -> f64 {
    let mut wrapped = (lon + 180.0) % 360.0;
    if wrapped < 0.0 {
        wrapped += 360.0;
    }
    wrapped - 180.0
}

/// Geoid undulation and MSL height conversion
#[derive(Debug, Clone)]
pub struct GeoidCorrector {
    grid: Arc<GeoidGrid>,
}

impl Default for GeoidCorrector {
    fn default() -> Self {
        Self::egm96()
    }
}

impl GeoidCorrector {
    /// Corrector backed by the bundled EGM96 table
    pub fn egm96() -> Self {
        Self { grid: GeoidGrid::egm96() }
    }

    /// Corrector backed by a caller-supplied grid
    pub fn with_grid(grid: Arc<GeoidGrid>) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &GeoidGrid {
        &self.grid
    }

    /// Undulation (meters) at the given point. Positive means the geoid lies
    /// above the ellipsoid.
    ///
    /// Latitude is not validated; values outside [-90, 90] are clamped to the
    /// nearest pole so the lookup stays inside the table.
    pub fn undulation(&self, lat: f64, lon: f64) -> f64 {
        let step = self.grid.step_deg();
        let lon = normalize_longitude(lon);
        let row = (90.0 - lat.clamp(-90.0, 90.0)) / step;
        let col = (lon + 180.0) / step;
        self.grid.interpolate(row, col)
    }

    /// Same as [`undulation`](Self::undulation) but rejects coordinates that
    /// are not finite or whose latitude is outside [-90, 90].
    pub fn checked_undulation(&self, lat: f64, lon: f64) -> CaptureResult<f64> {
        validate_coordinate(lat, lon)?;
        Ok(self.undulation(lat, lon))
    }

    /// Ellipsoidal height minus undulation, or `None` without an input height
    pub fn orthometric_altitude(
        &self,
        lat: f64,
        lon: f64,
        ellipsoidal_altitude_m: Option<f64>,
    ) -> Option<f64> {
        ellipsoidal_altitude_m.map(|h| h - self.undulation(lat, lon))
    }
}

/// Reject non-finite coordinates and latitudes beyond the poles
pub fn validate_coordinate(lat: f64, lon: f64) -> CaptureResult<()> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(CaptureError::InvalidCoordinate {
            latitude: lat,
            longitude: lon,
            reason: "coordinate is not finite".to_string(),
        });
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(CaptureError::InvalidCoordinate {
            latitude: lat,
            longitude: lon,
            reason: "latitude outside [-90, 90]".to_string(),
        });
    }
    Ok(())
}
