//! Application logic for the `phasetrack` binary.

pub mod app;
pub mod config;
pub mod errors;
