//! Capture-window processing

pub mod sampler;

pub use sampler::{FixDisposition, Sampler, SamplerState};
