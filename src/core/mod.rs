//! Core types and constants for the capture pipeline

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
