//! Terminal renderer.

use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

use phasetrack_core::diff::{apply_patches, diff_keyed, Patch};
use phasetrack_core::ledger::ActivityEntry;
use phasetrack_core::render::StatPill;
use phasetrack_core::{RenderSink, RenderState, StepStatus, StepView};

use crate::output::{format_duration, format_secs, format_stat_pills, format_status_message};
use crate::ui::styled_marker;

const BAR_TEMPLATE: &str = "{spinner:.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}";

/// A step line worth printing above the bar.
#[derive(Debug, Clone, PartialEq)]
pub enum StepTransition {
    Started { name: String },
    Finished { name: String, secs: Option<f64> },
}

/// Step status changes between two frames.
#[must_use]
pub fn step_transitions(prev: &[StepView], next: &[StepView]) -> Vec<StepTransition> {
    let mut out = Vec::new();
    for patch in diff_keyed(prev, next) {
        let item = match patch {
            Patch::Insert { item, .. } => item,
            Patch::Update { item } => {
                let unchanged = prev
                    .iter()
                    .find(|p| p.id == item.id)
                    .is_some_and(|p| p.status == item.status);
                if unchanged {
                    tracing::trace!(step = %item.id, "step refreshed without status change");
                    continue;
                }
                item
            }
            Patch::Remove { .. } | Patch::Move { .. } => continue,
        };
        match item.status {
            StepStatus::Active => out.push(StepTransition::Started { name: item.name }),
            StepStatus::Done => out.push(StepTransition::Finished {
                name: item.name,
                secs: item.duration_secs_if_done,
            }),
            StepStatus::Pending => {}
        }
    }
    out
}

#[derive(Default)]
struct ViewState {
    steps: Vec<StepView>,
    pills: Vec<StatPill>,
    activity: Vec<ActivityEntry>,
    closed: bool,
}

/// Renders frames as an indicatif progress bar with step lines above it.
///
/// Only what changed since the previous frame is printed.
pub struct TerminalRenderer {
    bar: ProgressBar,
    verbose: bool,
    view: Mutex<ViewState>,
}

impl TerminalRenderer {
    /// Create a renderer drawing to stderr. `quiet` hides the bar entirely.
    #[must_use]
    pub fn new(quiet: bool, verbose: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(100)
        };
        Self::with_bar(bar, verbose)
    }

    /// Create a renderer around an existing bar.
    #[must_use]
    pub fn with_bar(bar: ProgressBar, verbose: bool) -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_length(100);
        Self {
            bar,
            verbose,
            view: Mutex::new(ViewState::default()),
        }
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.view.lock().closed
    }

    fn print_transition(&self, transition: &StepTransition) {
        let line = match transition {
            StepTransition::Started { name } => {
                format!("{} {name}", styled_marker(StepStatus::Active))
            }
            StepTransition::Finished { name, secs } => match secs {
                Some(s) => format!(
                    "{} {name} ({})",
                    styled_marker(StepStatus::Done),
                    format_secs(*s)
                ),
                None => format!("{} {name}", styled_marker(StepStatus::Done)),
            },
        };
        self.bar.println(line);
    }
}

impl RenderSink for TerminalRenderer {
    fn render(&self, state: &RenderState) {
        let mut view = self.view.lock();

        // A fresh run after a finished one.
        if view.closed && !state.finished && state.failed.is_none() {
            self.bar.reset();
            view.closed = false;
        }

        let transitions = step_transitions(&view.steps, &state.steps);
        if !transitions.is_empty() {
            tracing::debug!(count = transitions.len(), pct = state.overall_pct, "step transitions");
        }
        for transition in &transitions {
            self.print_transition(transition);
        }
        view.steps.clone_from(&state.steps);

        let activity = diff_keyed(&view.activity, &state.activity);
        if self.verbose {
            for patch in &activity {
                if let Patch::Insert { item, .. } = patch {
                    self.bar
                        .println(format!("  [{}] {}", format_secs(item.at_secs), item.message));
                }
            }
        }
        apply_patches(&mut view.activity, &activity);

        let pills = diff_keyed(&view.pills, &state.stat_pills());
        apply_patches(&mut view.pills, &pills);

        if view.closed {
            return;
        }
        self.bar.set_position(u64::from(state.overall_pct));

        if let Some(reason) = &state.failed {
            tracing::debug!(%reason, "closing bar on failure");
            self.bar.abandon_with_message(format!("failed: {reason}"));
            view.closed = true;
        } else if state.finished {
            self.bar
                .finish_with_message(format!("done in {}", format_duration(state.elapsed)));
            view.closed = true;
        } else {
            let mut msg = format_status_message(state);
            if self.verbose && !view.pills.is_empty() {
                msg.push_str("  ");
                msg.push_str(&format_stat_pills(&view.pills));
            }
            self.bar.set_message(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use phasetrack_core::{AggregatorOptions, ManualClock, ProgressAggregator, StepCatalog};

    fn view(id: &str, status: StepStatus, dur: Option<f64>) -> StepView {
        StepView {
            id: id.into(),
            name: id.to_uppercase(),
            status,
            sub_progress_pct: 0.0,
            duration_secs_if_done: dur,
        }
    }

    #[test]
    fn first_frame_reports_active_step() {
        let next = vec![
            view("a", StepStatus::Active, None),
            view("b", StepStatus::Pending, None),
        ];
        assert_eq!(
            step_transitions(&[], &next),
            vec![StepTransition::Started { name: "A".into() }]
        );
    }

    #[test]
    fn status_changes_only() {
        let prev = vec![
            view("a", StepStatus::Active, None),
            view("b", StepStatus::Pending, None),
        ];
        let mut a = view("a", StepStatus::Active, None);
        a.sub_progress_pct = 50.0;
        let same = vec![a, view("b", StepStatus::Pending, None)];
        assert!(step_transitions(&prev, &same).is_empty());

        let next = vec![
            view("a", StepStatus::Done, Some(1.0)),
            view("b", StepStatus::Active, None),
        ];
        assert_eq!(
            step_transitions(&prev, &next),
            vec![
                StepTransition::Finished {
                    name: "A".into(),
                    secs: Some(1.0)
                },
                StepTransition::Started { name: "B".into() },
            ]
        );
    }

    #[test]
    fn reset_to_pending_is_silent() {
        let prev = vec![view("a", StepStatus::Done, Some(1.0))];
        let next = vec![view("a", StepStatus::Pending, None)];
        assert!(step_transitions(&prev, &next).is_empty());
    }

    #[test]
    fn renderer_follows_run() {
        let clock = ManualClock::new();
        let mut agg = ProgressAggregator::new(
            StepCatalog::document_analysis(),
            AggregatorOptions::document_analysis(),
        )
        .with_clock(Arc::new(clock.clone()));
        let renderer = TerminalRenderer::with_bar(ProgressBar::hidden(), true);

        agg.start();
        renderer.render(&agg.snapshot());
        clock.advance(Duration::from_secs(2));
        renderer.render(&agg.on_phase_event(Some("analysis"), Some(50.0), Some("page 3")));
        // upload 5 + extract 15 + analyze 20 * 0.5
        assert_eq!(renderer.position(), 30);
        assert!(!renderer.is_closed());

        renderer.render(&agg.complete());
        assert_eq!(renderer.position(), 100);
        assert!(renderer.is_closed());

        agg.start();
        renderer.render(&agg.snapshot());
        assert!(!renderer.is_closed());
        assert_eq!(renderer.position(), 0);
    }

    #[test]
    fn failure_abandons_bar() {
        let renderer = TerminalRenderer::with_bar(ProgressBar::hidden(), false);
        let mut state = RenderState::idle();
        state.overall_pct = 40;
        state.failed = Some("disk full".into());
        renderer.render(&state);
        assert!(renderer.is_closed());
        assert_eq!(renderer.position(), 40);
    }

    #[test]
    fn quiet_renderer_constructs() {
        let renderer = TerminalRenderer::new(true, false);
        renderer.render(&RenderState::idle());
        assert_eq!(renderer.position(), 0);
    }
}
