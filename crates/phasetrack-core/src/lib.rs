//! # phasetrack-core
//!
//! Core library for PhaseTrack: weighted multi-phase progress aggregation,
//! smoothed ETA estimation, step timing history, and keyed list diffing for
//! live-updating dashboards.

pub mod aggregator;
pub mod catalog;
pub mod clock;
pub mod constants;
pub mod diff;
pub mod errors;
pub mod eta;
pub mod event;
pub mod history;
pub mod ledger;
pub mod options;
pub mod render;
pub mod sink;
pub mod sinks;

// Re-exports
pub use aggregator::ProgressAggregator;
pub use catalog::{Step, StepCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use constants::{exit_codes, HISTORY_KEY, WEIGHT_TOTAL};
pub use errors::TrackError;
pub use eta::EtaDisplay;
pub use event::{CanonicalEvent, EventVariant, PhaseEvent, RawEvent};
pub use history::{HistoricalAverages, JsonFileTimingStore, MemoryTimingStore, TimingStore};
pub use ledger::StepStatus;
pub use options::AggregatorOptions;
pub use render::{RenderState, StepView};
pub use sink::{RenderSink, SinkSet};
