//! # phasetrack-cli
//!
//! Terminal rendering, output formatting, and shell completion.

pub mod completion;
pub mod output;
pub mod presenter;
pub mod ui;

pub use presenter::TerminalRenderer;
