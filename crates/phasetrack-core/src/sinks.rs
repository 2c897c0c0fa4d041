//! Concrete render sinks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::render::RenderState;
use crate::sink::RenderSink;

/// Sink that forwards frames through a channel (non-blocking).
///
/// Frames are dropped when the channel is full; the next frame supersedes them.
pub struct ChannelSink {
    sender: Sender<RenderState>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(sender: Sender<RenderState>) -> Self {
        Self { sender }
    }
}

impl RenderSink for ChannelSink {
    fn render(&self, state: &RenderState) {
        let _ = self.sender.try_send(state.clone());
    }
}

/// Sink that logs frames with temporal throttling.
pub struct LoggingSink {
    min_interval_ms: u64,
    last_time: AtomicU64,
    last_pct: AtomicU64,
}

impl LoggingSink {
    #[must_use]
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_time: AtomicU64::new(0),
            last_pct: AtomicU64::new(u64::MAX),
        }
    }
}

impl RenderSink for LoggingSink {
    #[allow(clippy::cast_possible_truncation)]
    fn render(&self, state: &RenderState) {
        if let Some(reason) = &state.failed {
            warn!(reason = %reason, pct = state.overall_pct, "Run failed");
            return;
        }
        if state.finished {
            info!(elapsed = ?state.elapsed, "Run complete");
            return;
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let last_time = self.last_time.load(Ordering::Relaxed);
        let pct = u64::from(state.overall_pct);
        if now.saturating_sub(last_time) < self.min_interval_ms
            || self.last_pct.load(Ordering::Relaxed) == pct
        {
            return;
        }

        debug!(
            pct,
            eta = %state.eta_display,
            step = state.current_step_name().unwrap_or("-"),
            "Progress update"
        );
        self.last_pct.store(pct, Ordering::Relaxed);
        self.last_time.store(now, Ordering::Relaxed);
    }
}

/// Null object: discards every frame.
pub struct NoOpSink;

impl NoOpSink {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSink for NoOpSink {
    fn render(&self, _state: &RenderState) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_does_nothing() {
        NoOpSink::new().render(&RenderState::idle());
    }

    #[test]
    fn channel_sink_sends() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let sink = ChannelSink::new(tx);
        let mut state = RenderState::idle();
        state.overall_pct = 42;
        sink.render(&state);
        assert_eq!(rx.try_recv().unwrap().overall_pct, 42);
    }

    #[test]
    fn channel_sink_drops_when_full() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let sink = ChannelSink::new(tx);
        sink.render(&RenderState::idle());
        sink.render(&RenderState::idle());
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn channel_sink_survives_closed_receiver() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        ChannelSink::new(tx).render(&RenderState::idle());
    }

    #[test]
    fn logging_sink_handles_all_states() {
        let sink = LoggingSink::new(0);
        let mut state = RenderState::idle();
        sink.render(&state);
        state.overall_pct = 10;
        sink.render(&state);
        state.finished = true;
        sink.render(&state);
        state.failed = Some("backend error".into());
        sink.render(&state);
    }
}
