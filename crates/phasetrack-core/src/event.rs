//! Inbound progress events and their normalization.
//!
//! Producers emit sparse, loosely shaped JSON objects. [`RawEvent`] accepts
//! the union of their field names; the two normalizers turn it into a
//! [`CanonicalEvent`], the only shape the aggregator consumes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::canonical_phase;

/// A live statistic value: producers send either numbers or labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            Self::Number(n) => write!(f, "{n:.2}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Sparse event as received on the wire. Unknown keys are ignored.
///
/// Deserialization goes through [`WireEvent`] so producer aliases never
/// collide with canonical keys and a malformed field only loses itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireEvent")]
pub struct RawEvent {
    pub phase: Option<String>,
    pub overall_progress_hint: Option<f64>,
    pub urls_or_items_completed: Option<u64>,
    pub urls_or_items_total: Option<u64>,
    pub current_item_label: Option<String>,
    pub live_stats: Option<BTreeMap<String, StatValue>>,
    pub detail_message: Option<String>,
}

/// Every key any producer is known to send, each kept as raw JSON.
///
/// Canonical keys win over aliases when both are present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireEvent {
    phase: Option<Value>,
    status: Option<Value>,
    stage: Option<Value>,
    overall_progress_hint: Option<Value>,
    progress: Option<Value>,
    percent: Option<Value>,
    urls_or_items_completed: Option<Value>,
    completed: Option<Value>,
    processed: Option<Value>,
    urls_or_items_total: Option<Value>,
    total: Option<Value>,
    current_item_label: Option<Value>,
    current_url: Option<Value>,
    current_file: Option<Value>,
    live_stats: Option<Value>,
    stats: Option<Value>,
    detail_message: Option<Value>,
    message: Option<Value>,
    detail: Option<Value>,
}

impl From<WireEvent> for RawEvent {
    fn from(w: WireEvent) -> Self {
        Self {
            phase: first(&[w.phase, w.status, w.stage], wire_text),
            overall_progress_hint: first(
                &[w.overall_progress_hint, w.progress, w.percent],
                wire_number,
            ),
            urls_or_items_completed: first(
                &[w.urls_or_items_completed, w.completed, w.processed],
                wire_count,
            ),
            urls_or_items_total: first(&[w.urls_or_items_total, w.total], wire_count),
            current_item_label: first(
                &[w.current_item_label, w.current_url, w.current_file],
                wire_text,
            ),
            live_stats: first(&[w.live_stats, w.stats], wire_stats),
            detail_message: first(&[w.detail_message, w.message, w.detail], wire_text),
        }
    }
}

/// First key, in priority order, whose value converts.
fn first<T>(candidates: &[Option<Value>], convert: fn(&Value) -> Option<T>) -> Option<T> {
    candidates.iter().flatten().find_map(convert)
}

fn wire_text(v: &Value) -> Option<String> {
    v.as_str().map(str::to_string)
}

fn wire_number(v: &Value) -> Option<f64> {
    let n: f64 = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Non-negative counter; fractional values round, negatives are dropped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn wire_count(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    wire_number(v)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u64)
}

fn wire_stats(v: &Value) -> Option<BTreeMap<String, StatValue>> {
    let map = v.as_object()?;
    Some(
        map.iter()
            .filter_map(|(k, v)| {
                let value = match v {
                    Value::Number(n) => StatValue::Number(n.as_f64()?),
                    Value::String(s) => StatValue::Text(s.clone()),
                    _ => return None,
                };
                Some((k.clone(), value))
            })
            .collect(),
    )
}

impl RawEvent {
    /// Parse one JSON object.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Event carrying only a phase key.
    #[must_use]
    pub fn phase(phase: &str) -> Self {
        Self {
            phase: Some(phase.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_progress(mut self, pct: f64) -> Self {
        self.overall_progress_hint = Some(pct);
        self
    }

    #[must_use]
    pub fn with_items(mut self, completed: u64, total: u64) -> Self {
        self.urls_or_items_completed = Some(completed);
        self.urls_or_items_total = Some(total);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.detail_message = Some(message.to_string());
        self
    }
}

/// Item counters reported by batch-style producers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounts {
    pub completed: Option<u64>,
    pub total: Option<u64>,
}

impl ItemCounts {
    /// Completion ratio in percent, if both counters are known and `total > 0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        match (self.completed, self.total) {
            (Some(done), Some(total)) if total > 0 => {
                Some((done.min(total) as f64 / total as f64) * 100.0)
            }
            _ => None,
        }
    }
}

/// A progress tick mapped onto the canonical shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseEvent {
    /// Canonicalized backend phase key.
    pub phase: String,
    /// Sub-progress of the phase, unclamped.
    pub sub_progress: Option<f64>,
    pub detail: Option<String>,
    pub items: Option<ItemCounts>,
    pub item_label: Option<String>,
    pub stats: BTreeMap<String, StatValue>,
}

impl PhaseEvent {
    #[must_use]
    pub fn new(phase: &str, sub_progress: Option<f64>) -> Self {
        Self {
            phase: canonical_phase(phase),
            sub_progress,
            ..Self::default()
        }
    }
}

/// Event shape consumed by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalEvent {
    Progress(PhaseEvent),
    Completed,
    Failed { message: String },
}

/// Which producer a stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventVariant {
    /// Document-analysis job poller.
    #[default]
    Job,
    /// URL-validation job poller.
    Validation,
}

impl EventVariant {
    /// Normalize a raw event with this producer's rules.
    #[must_use]
    pub fn normalize(self, raw: RawEvent) -> Option<CanonicalEvent> {
        match self {
            Self::Job => normalize_job_event(raw),
            Self::Validation => normalize_validation_event(raw),
        }
    }
}

const COMPLETED_PHASES: &[&str] = &["complete", "completed", "done", "finished"];
const FAILED_PHASES: &[&str] = &["error", "failed", "failure"];

/// Normalize an event from the document-analysis job poller.
///
/// Sub-progress comes only from the progress hint.
#[must_use]
pub fn normalize_job_event(raw: RawEvent) -> Option<CanonicalEvent> {
    let hint = finite(raw.overall_progress_hint);
    normalize_with(raw, hint)
}

/// Normalize an event from the URL-validation poller.
///
/// Falls back to the completed/total ratio when no hint is present.
#[must_use]
pub fn normalize_validation_event(raw: RawEvent) -> Option<CanonicalEvent> {
    let counts = ItemCounts {
        completed: raw.urls_or_items_completed,
        total: raw.urls_or_items_total,
    };
    let sub = finite(raw.overall_progress_hint).or_else(|| counts.percent());
    normalize_with(raw, sub)
}

fn normalize_with(raw: RawEvent, sub_progress: Option<f64>) -> Option<CanonicalEvent> {
    let phase = canonical_phase(raw.phase.as_deref()?);
    if phase.is_empty() {
        return None;
    }

    if COMPLETED_PHASES.contains(&phase.as_str()) {
        return Some(CanonicalEvent::Completed);
    }
    if FAILED_PHASES.contains(&phase.as_str()) {
        return Some(CanonicalEvent::Failed {
            message: raw
                .detail_message
                .unwrap_or_else(|| "job failed".to_string()),
        });
    }

    let items = if raw.urls_or_items_completed.is_some() || raw.urls_or_items_total.is_some() {
        Some(ItemCounts {
            completed: raw.urls_or_items_completed,
            total: raw.urls_or_items_total,
        })
    } else {
        None
    };

    let stats = raw
        .live_stats
        .unwrap_or_default()
        .into_iter()
        .filter(|(_, v)| !matches!(v, StatValue::Number(n) if !n.is_finite()))
        .collect();

    Some(CanonicalEvent::Progress(PhaseEvent {
        phase,
        sub_progress,
        detail: raw.detail_message.filter(|m| !m.trim().is_empty()),
        items,
        item_label: raw.current_item_label,
        stats,
    }))
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
