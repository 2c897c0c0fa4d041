//! Per-run step ledger.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::constants::ACTIVITY_FEED_CAPACITY;
use crate::event::{ItemCounts, PhaseEvent, StatValue};

/// Lifecycle of one step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Active,
    Done,
}

/// Runtime state of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRuntimeState {
    pub status: StepStatus,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    /// Partial completion in [0, 100]; meaningful while active.
    pub sub_progress_pct: f64,
}

impl StepRuntimeState {
    fn pending() -> Self {
        Self {
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            sub_progress_pct: 0.0,
        }
    }
}

/// One line of the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Monotonic sequence number, unique within a run.
    pub seq: u64,
    pub message: String,
    /// Seconds since run start.
    pub at_secs: f64,
}

/// Sparse fields carried by events; absent fields keep their last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveFields {
    pub items: ItemCounts,
    pub item_label: Option<String>,
    pub stats: BTreeMap<String, StatValue>,
    pub detail: Option<String>,
    pub activity: VecDeque<ActivityEntry>,
    next_seq: u64,
}

impl LiveFields {
    fn merge(&mut self, event: &PhaseEvent, at_secs: f64) {
        if let Some(items) = event.items {
            if items.completed.is_some() {
                self.items.completed = items.completed;
            }
            if items.total.is_some() {
                self.items.total = items.total;
            }
        }
        if let Some(label) = &event.item_label {
            self.item_label = Some(label.clone());
        }
        for (key, value) in &event.stats {
            self.stats.insert(key.clone(), value.clone());
        }
        if let Some(detail) = &event.detail {
            self.record_detail(detail, at_secs);
        }
    }

    /// Set the detail message, appending it to the feed unless it repeats.
    pub(crate) fn record_detail(&mut self, detail: &str, at_secs: f64) {
        if self.detail.as_deref() == Some(detail) {
            return;
        }
        self.detail = Some(detail.to_string());
        self.activity.push_back(ActivityEntry {
            seq: self.next_seq,
            message: detail.to_string(),
            at_secs,
        });
        self.next_seq += 1;
        while self.activity.len() > ACTIVITY_FEED_CAPACITY {
            self.activity.pop_front();
        }
    }
}

/// One progress session: step ledger plus live fields.
#[derive(Debug, Clone)]
pub struct Run {
    steps: Vec<StepRuntimeState>,
    start_time: Instant,
    current: Option<usize>,
    pub(crate) live: LiveFields,
}

impl Run {
    /// Create a run with every step pending.
    #[must_use]
    pub fn new(step_count: usize, now: Instant) -> Self {
        Self {
            steps: vec![StepRuntimeState::pending(); step_count],
            start_time: now,
            current: None,
            live: LiveFields::default(),
        }
    }

    #[must_use]
    pub fn steps(&self) -> &[StepRuntimeState] {
        &self.steps
    }

    #[must_use]
    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// Index of the active step; `None` before the first mapped event.
    #[must_use]
    pub fn current_step_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn live(&self) -> &LiveFields {
        &self.live
    }

    /// Mark every step from the current one up to (not including) `to` as done.
    ///
    /// Returns the index and observed duration of each newly finished step.
    pub fn catch_up(&mut self, to: usize, now: Instant) -> Vec<(usize, Duration)> {
        let from = self.current.unwrap_or(0);
        let to = to.min(self.steps.len());
        (from..to)
            .filter_map(|i| self.finish_step(i, now).map(|d| (i, d)))
            .collect()
    }

    /// Make `index` the active step, stamping its start time once.
    pub fn activate(&mut self, index: usize, now: Instant) {
        let Some(step) = self.steps.get_mut(index) else {
            return;
        };
        if step.status != StepStatus::Done {
            step.status = StepStatus::Active;
        }
        step.started_at.get_or_insert(now);
        self.current = Some(index);
    }

    /// Mark a step done. `finished_at` is set only on the first transition.
    ///
    /// Steps never activated are timed from the run start.
    pub fn finish_step(&mut self, index: usize, now: Instant) -> Option<Duration> {
        let start_time = self.start_time;
        let step = self.steps.get_mut(index)?;
        if step.status == StepStatus::Done {
            return None;
        }
        step.status = StepStatus::Done;
        step.sub_progress_pct = 100.0;
        step.finished_at = Some(now);
        Some(now.saturating_duration_since(step.started_at.unwrap_or(start_time)))
    }

    /// Store sub-progress on a step, clamped to [0, 100] and never regressing.
    pub fn set_sub_progress(&mut self, index: usize, pct: f64) {
        if !pct.is_finite() {
            return;
        }
        if let Some(step) = self.steps.get_mut(index) {
            step.sub_progress_pct = step.sub_progress_pct.max(pct.clamp(0.0, 100.0));
        }
    }

    /// Duration of a finished step.
    #[must_use]
    pub fn observed_duration(&self, index: usize) -> Option<Duration> {
        let step = self.steps.get(index)?;
        let finished = step.finished_at?;
        Some(finished.saturating_duration_since(step.started_at.unwrap_or(self.start_time)))
    }

    pub(crate) fn merge_live(&mut self, event: &PhaseEvent, now: Instant) {
        let at = now.saturating_duration_since(self.start_time).as_secs_f64();
        self.live.merge(event, at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(n: usize) -> (Run, Instant) {
        let t0 = Instant::now();
        (Run::new(n, t0), t0)
    }

    #[test]
    fn new_run_is_pending() {
        let (run, _) = run(3);
        assert_eq!(run.current_step_index(), None);
        assert!(run
            .steps()
            .iter()
            .all(|s| s.status == StepStatus::Pending && s.started_at.is_none()));
    }

    #[test]
    fn activate_stamps_start_once() {
        let (mut run, t0) = run(2);
        run.activate(0, t0 + Duration::from_secs(1));
        run.activate(0, t0 + Duration::from_secs(5));
        assert_eq!(
            run.steps()[0].started_at,
            Some(t0 + Duration::from_secs(1))
        );
        assert_eq!(run.steps()[0].status, StepStatus::Active);
        assert_eq!(run.current_step_index(), Some(0));
    }

    #[test]
    fn activate_out_of_range_ignored() {
        let (mut run, t0) = run(2);
        run.activate(7, t0);
        assert_eq!(run.current_step_index(), None);
    }

    #[test]
    fn finish_sets_finished_at_once() {
        let (mut run, t0) = run(1);
        run.activate(0, t0 + Duration::from_secs(2));
        let first = run.finish_step(0, t0 + Duration::from_secs(7));
        let second = run.finish_step(0, t0 + Duration::from_secs(9));
        assert_eq!(first, Some(Duration::from_secs(5)));
        assert_eq!(second, None);
        assert_eq!(run.steps()[0].finished_at, Some(t0 + Duration::from_secs(7)));
    }

    #[test]
    fn catch_up_times_unstarted_from_run_start() {
        let (mut run, t0) = run(4);
        run.activate(0, t0 + Duration::from_secs(1));
        let finished = run.catch_up(3, t0 + Duration::from_secs(4));
        assert_eq!(
            finished,
            vec![
                (0, Duration::from_secs(3)),
                (1, Duration::from_secs(4)),
                (2, Duration::from_secs(4)),
            ]
        );
        assert_eq!(run.steps()[3].status, StepStatus::Pending);
    }

    #[test]
    fn sub_progress_clamped_and_monotonic() {
        let (mut run, t0) = run(1);
        run.activate(0, t0);
        run.set_sub_progress(0, 140.0);
        assert!((run.steps()[0].sub_progress_pct - 100.0).abs() < f64::EPSILON);

        let (mut run, t0) = self::run(1);
        run.activate(0, t0);
        run.set_sub_progress(0, 60.0);
        run.set_sub_progress(0, 20.0);
        run.set_sub_progress(0, -5.0);
        run.set_sub_progress(0, f64::NAN);
        assert!((run.steps()[0].sub_progress_pct - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn live_fields_are_sparse() {
        let (mut run, t0) = run(1);
        let mut first = PhaseEvent::new("upload", None);
        first.items = Some(ItemCounts {
            completed: Some(1),
            total: Some(10),
        });
        first.item_label = Some("a".into());
        first.stats.insert("ok".into(), StatValue::Number(1.0));
        run.merge_live(&first, t0);

        let mut second = PhaseEvent::new("upload", None);
        second.items = Some(ItemCounts {
            completed: Some(4),
            total: None,
        });
        second.stats.insert("bad".into(), StatValue::Number(2.0));
        run.merge_live(&second, t0);

        let live = run.live();
        assert_eq!(live.items.completed, Some(4));
        assert_eq!(live.items.total, Some(10));
        assert_eq!(live.item_label.as_deref(), Some("a"));
        assert_eq!(live.stats.len(), 2);
    }

    #[test]
    fn activity_feed_dedupes_and_caps() {
        let (mut run, t0) = run(1);
        for i in 0..(ACTIVITY_FEED_CAPACITY + 10) {
            let mut ev = PhaseEvent::new("upload", None);
            ev.detail = Some(format!("message {i}"));
            run.merge_live(&ev, t0);
            run.merge_live(&ev, t0);
        }
        let feed = &run.live().activity;
        assert_eq!(feed.len(), ACTIVITY_FEED_CAPACITY);
        assert_eq!(feed.front().map(|e| e.seq), Some(10));
        assert_eq!(
            feed.back().map(|e| e.message.as_str()),
            Some("message 59")
        );
    }
}
