//! Geoid correction and window reduction

pub mod geoid;
pub mod reduction;

pub use geoid::{normalize_longitude, validate_coordinate, GeoidCorrector, GeoidGrid};
pub use reduction::{Reducer, ReductionPolicy};
