//! Fill engine for signed limit orders: the per maker ledger, the engine
//! settling fills against it and the tooling around both.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod interactions;
pub mod ledger;
mod run;

pub use {
    engine::{Engine, Env, Fill},
    error::Error,
    interactions::{AssetLedger, Interactions},
    ledger::RemainingAmount,
    run::{run, start},
};
