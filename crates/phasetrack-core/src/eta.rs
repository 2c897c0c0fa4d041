//! ETA estimation and smoothing.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Linear-rate ETA estimator.
///
/// Projects remaining time from the average completion rate since the run
/// started. No estimate is produced below `min_pct`, where early rates are
/// too unstable to be useful.
#[derive(Debug, Clone, Copy)]
pub struct EtaEstimator {
    min_pct: f64,
}

impl EtaEstimator {
    #[must_use]
    pub fn new(min_pct: f64) -> Self {
        Self { min_pct }
    }

    /// Raw remaining seconds for `pct` percent done after `elapsed`.
    #[must_use]
    pub fn estimate(&self, pct: f64, elapsed: Duration) -> Option<f64> {
        if !pct.is_finite() || pct <= 0.0 || pct < self.min_pct || pct >= 100.0 {
            return None;
        }
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }
        let rate = pct / secs;
        Some((100.0 - pct) / rate).filter(|eta| eta.is_finite())
    }
}

/// Fixed-size trailing mean over raw ETA samples.
#[derive(Debug, Clone)]
pub struct EtaSmoother {
    window: VecDeque<f64>,
    capacity: usize,
}

impl EtaSmoother {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a raw sample, evicting the oldest when full.
    pub fn push(&mut self, sample: f64) {
        if !sample.is_finite() || sample < 0.0 {
            return;
        }
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    /// Mean of the window, if any samples are present.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

/// User-facing ETA state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "secs", rename_all = "snake_case")]
pub enum EtaDisplay {
    /// Not enough progress for a stable estimate.
    Calculating,
    /// Less than the almost-done threshold remains.
    AlmostDone,
    /// Numeric countdown.
    Remaining(Duration),
    /// Run finished.
    Complete,
}

impl EtaDisplay {
    /// Classify an ETA value for display.
    #[must_use]
    pub fn classify(eta_secs: Option<f64>, almost_done_secs: f64) -> Self {
        match eta_secs {
            None => Self::Calculating,
            Some(secs) if secs < almost_done_secs => Self::AlmostDone,
            Some(secs) => Duration::try_from_secs_f64(secs.round())
                .map_or(Self::Calculating, Self::Remaining),
        }
    }
}

impl fmt::Display for EtaDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calculating => f.write_str("calculating…"),
            Self::AlmostDone => f.write_str("almost done"),
            Self::Complete => f.write_str("done"),
            Self::Remaining(d) => {
                let total = d.as_secs();
                let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
                if h > 0 {
                    write!(f, "about {h}h {m:02}m")
                } else if m > 0 {
                    write!(f, "about {m}m {s:02}s")
                } else {
                    write!(f, "about {s}s")
                }
            }
        }
    }
}
