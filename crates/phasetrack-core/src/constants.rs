//! Constants for progress aggregation, ETA estimation, and timing history.

use std::time::Duration;

/// Sum every step catalog's weights must add up to.
pub const WEIGHT_TOTAL: u32 = 100;

/// Overall percentage below which no ETA is produced.
pub const DEFAULT_ETA_MIN_PCT: f64 = 5.0;

/// Number of trailing raw ETA samples averaged by the URL-validation dashboard.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Remaining time under which the ETA is shown qualitatively.
pub const DEFAULT_ALMOST_DONE_SECS: f64 = 2.0;

/// Interval of the elapsed-time refresh timer.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Weight of a new duration sample when blending historical averages.
pub const DEFAULT_HISTORY_ALPHA: f64 = 0.3;

/// Maximum number of detail messages retained in the activity feed.
pub const ACTIVITY_FEED_CAPACITY: usize = 50;

/// Well-known persistence key holding the historical step averages.
pub const HISTORY_KEY: &str = "phasetrack.step_timings";

/// Exit codes for the `phasetrack` binary.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Generic error.
    pub const ERROR_GENERIC: i32 = 1;
    /// Input stream could not be read.
    pub const ERROR_INPUT: i32 = 2;
    /// Timing store could not be opened.
    pub const ERROR_STORE: i32 = 3;
    /// Invalid configuration or step catalog.
    pub const ERROR_CONFIG: i32 = 4;
    /// Replay cancelled by user (Ctrl+C).
    pub const ERROR_CANCELED: i32 = 130;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_alpha_is_a_fraction() {
        assert!(DEFAULT_HISTORY_ALPHA > 0.0 && DEFAULT_HISTORY_ALPHA < 1.0);
    }

    #[test]
    fn eta_threshold_within_percent_range() {
        assert!((0.0..100.0).contains(&DEFAULT_ETA_MIN_PCT));
    }

    #[test]
    fn exit_codes_distinct() {
        let codes = [
            exit_codes::SUCCESS,
            exit_codes::ERROR_GENERIC,
            exit_codes::ERROR_INPUT,
            exit_codes::ERROR_STORE,
            exit_codes::ERROR_CONFIG,
            exit_codes::ERROR_CANCELED,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
