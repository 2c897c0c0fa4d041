//! Outbound render contract.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diff::Keyed;
use crate::eta::EtaDisplay;
use crate::event::{ItemCounts, StatValue};
use crate::ledger::{ActivityEntry, StepStatus};

/// Per-step line of the render contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepView {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    /// Sub-progress of the active step, 100 when done, 0 when pending.
    pub sub_progress_pct: f64,
    pub duration_secs_if_done: Option<f64>,
}

impl Keyed for StepView {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// One named live statistic ("domain health" pill).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatPill {
    pub name: String,
    pub value: StatValue,
}

impl Keyed for StatPill {
    type Key = String;

    fn key(&self) -> String {
        self.name.clone()
    }
}

impl Keyed for ActivityEntry {
    type Key = u64;

    fn key(&self) -> u64 {
        self.seq
    }
}

/// Everything a renderer needs to paint one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Overall completion, rounded, in [0, 100].
    pub overall_pct: u8,
    /// Smoothed ETA in seconds, `None` while calculating.
    pub eta_secs: Option<f64>,
    pub eta_display: String,
    #[serde(skip)]
    pub eta: Option<EtaDisplay>,
    pub elapsed: Duration,
    pub steps: Vec<StepView>,
    pub current_step: Option<usize>,
    pub detail: Option<String>,
    pub items: ItemCounts,
    pub item_label: Option<String>,
    pub stats: BTreeMap<String, StatValue>,
    pub activity: Vec<ActivityEntry>,
    /// Informational prior from historical averages.
    pub prior_remaining_secs: Option<f64>,
    pub finished: bool,
    pub failed: Option<String>,
}

impl RenderState {
    /// Frame shown before any run starts.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            overall_pct: 0,
            eta_secs: None,
            eta_display: EtaDisplay::Calculating.to_string(),
            eta: Some(EtaDisplay::Calculating),
            elapsed: Duration::ZERO,
            steps: Vec::new(),
            current_step: None,
            detail: None,
            items: ItemCounts::default(),
            item_label: None,
            stats: BTreeMap::new(),
            activity: Vec::new(),
            prior_remaining_secs: None,
            finished: false,
            failed: None,
        }
    }

    /// Live statistics as keyed pills, sorted by name.
    #[must_use]
    pub fn stat_pills(&self) -> Vec<StatPill> {
        self.stats
            .iter()
            .map(|(name, value)| StatPill {
                name: name.clone(),
                value: value.clone(),
            })
            .collect()
    }

    /// Name of the active step, if any.
    #[must_use]
    pub fn current_step_name(&self) -> Option<&str> {
        self.current_step
            .and_then(|i| self.steps.get(i))
            .map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_frame() {
        let state = RenderState::idle();
        assert_eq!(state.overall_pct, 0);
        assert_eq!(state.eta_display, "calculating…");
        assert!(state.current_step_name().is_none());
    }

    #[test]
    fn stat_pills_sorted() {
        let mut state = RenderState::idle();
        state.stats.insert("timeouts".into(), StatValue::Number(2.0));
        state.stats.insert("healthy".into(), StatValue::Number(9.0));
        let names: Vec<_> = state.stat_pills().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["healthy", "timeouts"]);
    }

    #[test]
    fn serializes_render_contract() {
        let mut state = RenderState::idle();
        state.steps.push(StepView {
            id: "upload".into(),
            name: "Uploading".into(),
            status: StepStatus::Done,
            sub_progress_pct: 100.0,
            duration_secs_if_done: Some(1.5),
        });
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["overall_pct"], 0);
        assert_eq!(json["steps"][0]["status"], "done");
        assert_eq!(json["steps"][0]["duration_secs_if_done"], 1.5);
        assert!(json.get("eta").is_none());
    }
}
