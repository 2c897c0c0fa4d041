//! Weighted multi-phase progress aggregation.
//!
//! [`ProgressAggregator`] turns an arbitrary backend phase stream into a
//! monotonic per-step state machine and derives an overall percentage and a
//! (optionally smoothed) ETA from it. Ingestion never fails: unknown phases
//! and stale events are dropped, out-of-range numbers are clamped.
//!
//! The aggregator owns no timers. Periodic refresh lives with whoever drives
//! the UI lifecycle and calls [`ProgressAggregator::tick`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::catalog::StepCatalog;
use crate::clock::{Clock, SystemClock};
use crate::eta::{EtaDisplay, EtaEstimator, EtaSmoother};
use crate::event::{CanonicalEvent, PhaseEvent};
use crate::history::{HistoricalAverages, TimingStore};
use crate::ledger::{Run, StepRuntimeState, StepStatus};
use crate::options::AggregatorOptions;
use crate::render::{RenderState, StepView};

/// Progress aggregator for one dashboard.
pub struct ProgressAggregator {
    catalog: StepCatalog,
    options: AggregatorOptions,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn TimingStore>>,
    history: HistoricalAverages,
    estimator: EtaEstimator,
    smoother: EtaSmoother,
    run: Option<Run>,
    active: bool,
    completed: bool,
    failure: Option<String>,
    ended_at: Option<Instant>,
}

impl ProgressAggregator {
    /// Create an aggregator using the system clock and no timing store.
    #[must_use]
    pub fn new(catalog: StepCatalog, options: AggregatorOptions) -> Self {
        let options = options.normalize();
        Self {
            estimator: EtaEstimator::new(options.eta_min_pct),
            smoother: EtaSmoother::new(options.smoothing_window),
            catalog,
            options,
            clock: Arc::new(SystemClock),
            store: None,
            history: HistoricalAverages::default(),
            run: None,
            active: false,
            completed: false,
            failure: None,
            ended_at: None,
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a timing store and load its historical averages.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TimingStore>) -> Self {
        self.history = HistoricalAverages::load(store.as_ref());
        self.store = Some(store);
        self
    }

    /// Begin a new run, discarding any previous one.
    pub fn start(&mut self) {
        let now = self.clock.now();
        self.run = Some(Run::new(self.catalog.len(), now));
        self.smoother.clear();
        self.active = true;
        self.completed = false;
        self.failure = None;
        self.ended_at = None;
        info!(steps = self.catalog.len(), "Progress run started");
    }

    /// Handle one progress tick from the job runner.
    ///
    /// A `None` or unknown phase leaves the run untouched.
    pub fn on_phase_event(
        &mut self,
        backend_phase: Option<&str>,
        sub_progress_pct: Option<f64>,
        detail_message: Option<&str>,
    ) -> RenderState {
        let Some(phase) = backend_phase else {
            return self.snapshot();
        };
        let mut event = PhaseEvent::new(phase, sub_progress_pct);
        event.detail = detail_message.map(str::to_string);
        self.apply_phase(&event)
    }

    /// Handle a normalized event.
    pub fn on_event(&mut self, event: &CanonicalEvent) -> RenderState {
        match event {
            CanonicalEvent::Progress(phase) => self.apply_phase(phase),
            CanonicalEvent::Completed => self.complete(),
            CanonicalEvent::Failed { message } => self.halt(message),
        }
    }

    /// Apply a canonical phase event to the run.
    pub fn apply_phase(&mut self, event: &PhaseEvent) -> RenderState {
        if !self.active {
            debug!(phase = %event.phase, "Ignoring event outside an active run");
            return self.snapshot();
        }
        let Some(index) = self.catalog.index_of_phase(&event.phase) else {
            debug!(phase = %event.phase, "Ignoring unknown phase");
            return self.snapshot();
        };
        let now = self.clock.now();
        let Some(run) = self.run.as_mut() else {
            return self.snapshot();
        };

        match run.current_step_index() {
            Some(current) if index < current => {
                debug!(phase = %event.phase, index, current, "Ignoring stale phase");
                return self.snapshot();
            }
            Some(current) if index == current => {}
            _ => {
                for (i, took) in run.catch_up(index, now) {
                    debug!(
                        step = %self.catalog.steps()[i].id,
                        secs = took.as_secs_f64(),
                        "Step finished"
                    );
                }
            }
        }

        run.activate(index, now);
        if let Some(pct) = event.sub_progress {
            run.set_sub_progress(index, pct);
        }
        run.merge_live(event, now);

        if let Some(raw) = self.raw_eta_at(now) {
            self.smoother.push(raw);
        }
        self.snapshot()
    }

    /// Refresh elapsed time and ETA without ingesting an event.
    pub fn tick(&self) -> RenderState {
        self.snapshot()
    }

    /// Force every step to done and persist the blended step durations.
    ///
    /// Calling this again after completion has no effect.
    pub fn complete(&mut self) -> RenderState {
        if self.completed {
            return self.snapshot();
        }
        let now = self.clock.now();
        let Some(run) = self.run.as_mut() else {
            return self.snapshot();
        };

        for i in 0..self.catalog.len() {
            if run.steps()[i].status == StepStatus::Pending {
                run.activate(i, now);
            }
            run.finish_step(i, now);
        }

        for (i, step) in self.catalog.steps().iter().enumerate() {
            if let Some(took) = run.observed_duration(i).filter(|d| !d.is_zero()) {
                self.history
                    .blend_with(&step.id, took.as_secs_f64(), self.options.history_alpha);
            }
        }

        self.completed = true;
        self.active = false;
        self.ended_at = Some(now);
        info!(
            elapsed_secs = now.saturating_duration_since(run.start_time()).as_secs_f64(),
            "Progress run complete"
        );

        if let Some(store) = &self.store {
            if let Err(e) = self.history.save(store.as_ref()) {
                warn!(error = %e, "Failed to persist step timing history");
            }
        }
        self.snapshot()
    }

    /// Stop the run after a backend failure. Nothing is persisted.
    pub fn halt(&mut self, reason: &str) -> RenderState {
        if self.active {
            let now = self.clock.now();
            self.active = false;
            self.failure = Some(reason.to_string());
            self.ended_at = Some(now);
            if let Some(run) = self.run.as_mut() {
                let at = now.saturating_duration_since(run.start_time()).as_secs_f64();
                run.live.record_detail(reason, at);
            }
            warn!(reason, "Progress run halted");
        }
        self.snapshot()
    }

    /// Drop the current run.
    pub fn reset(&mut self) {
        self.run = None;
        self.smoother.clear();
        self.active = false;
        self.completed = false;
        self.failure = None;
        self.ended_at = None;
    }

    /// Alias of [`reset`](Self::reset) for lifecycle symmetry.
    pub fn destroy(&mut self) {
        self.reset();
    }

    /// Exact overall completion in [0, 100].
    #[must_use]
    pub fn overall_exact(&self) -> f64 {
        if self.completed {
            return 100.0;
        }
        let Some(run) = &self.run else {
            return 0.0;
        };
        let total = self.catalog.total_weight();
        let Some(current) = run.current_step_index() else {
            return 0.0;
        };
        let done = f64::from(self.catalog.weight_before(current));
        let partial = self.catalog.get(current).map_or(0.0, |step| {
            f64::from(step.weight) * run.steps()[current].sub_progress_pct / 100.0
        });
        ((done + partial) / f64::from(total) * 100.0).clamp(0.0, 100.0)
    }

    /// Overall completion rounded for display.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn overall_pct(&self) -> u8 {
        self.overall_exact().round() as u8
    }

    /// Wall-clock time since the run started, frozen once it ends.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.run.as_ref().map_or(Duration::ZERO, |run| {
            let end = self.ended_at.unwrap_or_else(|| self.clock.now());
            end.saturating_duration_since(run.start_time())
        })
    }

    fn raw_eta_at(&self, now: Instant) -> Option<f64> {
        let run = self.run.as_ref()?;
        let elapsed = now.saturating_duration_since(run.start_time());
        self.estimator.estimate(self.overall_exact(), elapsed)
    }

    /// Estimated seconds remaining; `None` while still calculating.
    ///
    /// With smoothing enabled this is the mean of the trailing raw samples.
    #[must_use]
    pub fn eta_seconds(&self) -> Option<f64> {
        if self.completed {
            return Some(0.0);
        }
        if !self.active {
            return None;
        }
        let raw = self.raw_eta_at(self.clock.now())?;
        if self.smoother.capacity() > 1 {
            return self.smoother.mean().or(Some(raw));
        }
        Some(raw)
    }

    #[must_use]
    pub fn eta_display(&self) -> EtaDisplay {
        if self.completed {
            return EtaDisplay::Complete;
        }
        EtaDisplay::classify(self.eta_seconds(), self.options.almost_done_secs)
    }

    /// Index of the active step; `None` before the first mapped event.
    #[must_use]
    pub fn current_step_index(&self) -> Option<usize> {
        self.run.as_ref().and_then(Run::current_step_index)
    }

    #[must_use]
    pub fn step_states(&self) -> &[StepRuntimeState] {
        match &self.run {
            Some(run) => run.steps(),
            None => &[],
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    #[must_use]
    pub fn history(&self) -> &HistoricalAverages {
        &self.history
    }

    /// Build the render frame for the current state.
    #[must_use]
    pub fn snapshot(&self) -> RenderState {
        let Some(run) = &self.run else {
            return RenderState::idle();
        };

        let steps = self
            .catalog
            .steps()
            .iter()
            .zip(run.steps())
            .enumerate()
            .map(|(i, (step, state))| StepView {
                id: step.id.clone(),
                name: step.name.clone(),
                status: state.status,
                sub_progress_pct: match state.status {
                    StepStatus::Pending => 0.0,
                    _ => state.sub_progress_pct,
                },
                duration_secs_if_done: match state.status {
                    StepStatus::Done => run.observed_duration(i).map(|d| d.as_secs_f64()),
                    _ => None,
                },
            })
            .collect();

        let eta_secs = self.eta_seconds();
        let eta = self.eta_display();
        let live = run.live();
        let prior_remaining_secs = if self.active {
            let from = run.current_step_index().unwrap_or(0);
            let fraction = run.steps().get(from).map_or(0.0, |s| s.sub_progress_pct / 100.0);
            self.history
                .prior_remaining_secs(&self.catalog, from, fraction)
        } else {
            None
        };

        RenderState {
            overall_pct: self.overall_pct(),
            eta_secs,
            eta_display: eta.to_string(),
            eta: Some(eta),
            elapsed: self.elapsed(),
            steps,
            current_step: run.current_step_index(),
            detail: live.detail.clone(),
            items: live.items,
            item_label: live.item_label.clone(),
            stats: live.stats.clone(),
            activity: live.activity.iter().cloned().collect(),
            prior_remaining_secs,
            finished: self.completed,
            failed: self.failure.clone(),
        }
    }
}
