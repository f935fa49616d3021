//! This crate is intended to contain code that is required to provide or
//! improve the observability of the engine and its tooling. For now that is
//! the logging initialization shared between binaries and tests.
pub mod config;
pub mod tracing;

pub use config::Config;
