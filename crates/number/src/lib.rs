//! Fixed width integer helpers shared by the order model and the engine.

pub mod ratio;
pub mod serialization;

pub use ratio::{mul_ratio, mul_ratio_ceil};
