//! # phasetrack-session
//!
//! Live progress sessions: one aggregator, its elapsed-time ticker, and the
//! render sink it feeds.

pub mod errors;
pub mod session;
pub mod ticker;

pub use errors::SessionError;
pub use session::LiveSession;
pub use ticker::Ticker;
