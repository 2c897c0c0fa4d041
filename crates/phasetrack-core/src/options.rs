//! Aggregator tunables.

use std::time::Duration;

use crate::constants::{
    DEFAULT_ALMOST_DONE_SECS, DEFAULT_ETA_MIN_PCT, DEFAULT_HISTORY_ALPHA,
    DEFAULT_SMOOTHING_WINDOW, DEFAULT_TICK_INTERVAL,
};

/// Options controlling ETA estimation and history blending.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorOptions {
    /// Overall percentage below which the ETA stays "calculating".
    pub eta_min_pct: f64,
    /// Trailing window of raw ETA samples (1 = unsmoothed).
    pub smoothing_window: usize,
    /// Remaining seconds under which the ETA reads "almost done".
    pub almost_done_secs: f64,
    /// Interval of the elapsed-time refresh.
    pub tick_interval: Duration,
    /// Weight of a new sample when blending historical averages.
    pub history_alpha: f64,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            eta_min_pct: DEFAULT_ETA_MIN_PCT,
            smoothing_window: 1,
            almost_done_secs: DEFAULT_ALMOST_DONE_SECS,
            tick_interval: DEFAULT_TICK_INTERVAL,
            history_alpha: DEFAULT_HISTORY_ALPHA,
        }
    }
}

impl AggregatorOptions {
    /// Options used by the document-analysis dashboard (raw ETA).
    #[must_use]
    pub fn document_analysis() -> Self {
        Self::default()
    }

    /// Options used by the URL-validation dashboard (5-sample smoothing).
    #[must_use]
    pub fn url_validation() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            ..Self::default()
        }
    }

    /// Normalize options, replacing out-of-range values with defaults.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if !self.eta_min_pct.is_finite() || !(0.0..100.0).contains(&self.eta_min_pct) {
            self.eta_min_pct = DEFAULT_ETA_MIN_PCT;
        }
        if self.smoothing_window == 0 {
            self.smoothing_window = 1;
        }
        if !self.almost_done_secs.is_finite() || self.almost_done_secs < 0.0 {
            self.almost_done_secs = DEFAULT_ALMOST_DONE_SECS;
        }
        if self.tick_interval.is_zero() {
            self.tick_interval = DEFAULT_TICK_INTERVAL;
        }
        if !self.history_alpha.is_finite() || self.history_alpha <= 0.0 || self.history_alpha > 1.0
        {
            self.history_alpha = DEFAULT_HISTORY_ALPHA;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = AggregatorOptions::default();
        assert!((opts.eta_min_pct - DEFAULT_ETA_MIN_PCT).abs() < f64::EPSILON);
        assert_eq!(opts.smoothing_window, 1);
        assert_eq!(opts.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn url_validation_smooths() {
        assert_eq!(
            AggregatorOptions::url_validation().smoothing_window,
            DEFAULT_SMOOTHING_WINDOW
        );
        assert_eq!(AggregatorOptions::document_analysis().smoothing_window, 1);
    }

    #[test]
    fn normalize_out_of_range() {
        let opts = AggregatorOptions {
            eta_min_pct: f64::NAN,
            smoothing_window: 0,
            almost_done_secs: -1.0,
            tick_interval: Duration::ZERO,
            history_alpha: 1.5,
        }
        .normalize();
        assert!((opts.eta_min_pct - DEFAULT_ETA_MIN_PCT).abs() < f64::EPSILON);
        assert_eq!(opts.smoothing_window, 1);
        assert!((opts.almost_done_secs - DEFAULT_ALMOST_DONE_SECS).abs() < f64::EPSILON);
        assert_eq!(opts.tick_interval, DEFAULT_TICK_INTERVAL);
        assert!((opts.history_alpha - DEFAULT_HISTORY_ALPHA).abs() < f64::EPSILON);
    }

    #[test]
    fn normalize_keeps_valid_values() {
        let opts = AggregatorOptions {
            eta_min_pct: 10.0,
            smoothing_window: 3,
            almost_done_secs: 0.0,
            tick_interval: Duration::from_millis(250),
            history_alpha: 1.0,
        };
        assert_eq!(opts.clone().normalize(), opts);
    }
}
