//! CLI output formatting.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::time::Duration;

use phasetrack_core::event::ItemCounts;
use phasetrack_core::render::{StatPill, StepView};
use phasetrack_core::{RenderState, StepStatus};

/// Format a duration for display.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    let millis = (secs * 1000.0).round();
    let tenths = (secs * 10.0).round();
    if millis < 1000.0 {
        format!("{millis:.0}ms")
    } else if tenths < 600.0 {
        format!("{:.1}s", tenths / 10.0)
    } else {
        // Whole seconds first so a carry never shows up as "60".
        let total = secs.round() as u64;
        if total < 3600 {
            format!("{}m{:02}s", total / 60, total % 60)
        } else {
            format!("{}h{:02}m", total / 3600, (total % 3600) / 60)
        }
    }
}

/// Format seconds (as produced by the aggregator) for display.
#[must_use]
pub fn format_secs(secs: f64) -> String {
    Duration::try_from_secs_f64(secs).map_or_else(|_| "-".into(), format_duration)
}

/// Format a number with thousand separators.
#[must_use]
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// "1,204 / 5,000" style item counter, or `None` if nothing is known.
#[must_use]
pub fn format_items(items: &ItemCounts) -> Option<String> {
    match (items.completed, items.total) {
        (Some(done), Some(total)) => Some(format!(
            "{} / {}",
            format_number(done),
            format_number(total)
        )),
        (Some(done), None) => Some(format_number(done)),
        (None, Some(total)) => Some(format!("0 / {}", format_number(total))),
        (None, None) => None,
    }
}

/// Single-line description of a step.
#[must_use]
pub fn format_step_line(step: &StepView) -> String {
    match step.status {
        StepStatus::Done => match step.duration_secs_if_done {
            Some(secs) => format!("{} ({})", step.name, format_secs(secs)),
            None => step.name.clone(),
        },
        StepStatus::Active => format!("{} {:.0}%", step.name, step.sub_progress_pct),
        StepStatus::Pending => step.name.clone(),
    }
}

/// "name: value" pairs joined for a status line.
#[must_use]
pub fn format_stat_pills(pills: &[StatPill]) -> String {
    pills
        .iter()
        .map(|p| format!("{}: {}", p.name, p.value))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Progress bar message: current step, items, and ETA.
#[must_use]
pub fn format_status_message(state: &RenderState) -> String {
    let mut msg = String::new();
    if let Some(name) = state.current_step_name() {
        msg.push_str(name);
    }
    if let Some(items) = format_items(&state.items) {
        let _ = write!(msg, " [{items}]");
    }
    if let Some(label) = &state.item_label {
        let _ = write!(msg, " {label}");
    }
    let _ = write!(msg, " · {}", state.eta_display);
    msg.trim_start().to_string()
}

/// Write an end-of-run summary: one line per step plus totals.
///
/// # Errors
///
/// Returns an I/O error if the writer fails.
pub fn write_summary(out: &mut dyn Write, state: &RenderState) -> io::Result<()> {
    for step in &state.steps {
        let marker = match step.status {
            StepStatus::Done => "done",
            StepStatus::Active => "active",
            StepStatus::Pending => "pending",
        };
        writeln!(out, "  {marker:<8} {}", format_step_line(step))?;
    }
    writeln!(
        out,
        "Overall: {}%  Elapsed: {}",
        state.overall_pct,
        format_duration(state.elapsed)
    )?;
    if let Some(reason) = &state.failed {
        writeln!(out, "Failed: {reason}")?;
    }
    Ok(())
}
