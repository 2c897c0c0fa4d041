//! Live progress session.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use phasetrack_core::{
    CanonicalEvent, EventVariant, ProgressAggregator, RawEvent, RenderSink, RenderState,
};

use crate::ticker::Ticker;

/// One dashboard's live progress: aggregator, elapsed ticker, and sink.
///
/// The ticker and incoming events are the only writers of the run. Every
/// lifecycle transition stops the ticker (joining its thread) before touching
/// the run, so a stale tick can never observe a superseded run.
pub struct LiveSession {
    aggregator: Arc<Mutex<ProgressAggregator>>,
    sink: Arc<dyn RenderSink>,
    variant: EventVariant,
    interval: Duration,
    ticker: Option<Ticker>,
}

impl LiveSession {
    #[must_use]
    pub fn new(
        aggregator: ProgressAggregator,
        variant: EventVariant,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        let interval = aggregator.options().tick_interval;
        Self {
            aggregator: Arc::new(Mutex::new(aggregator)),
            sink,
            variant,
            interval,
            ticker: None,
        }
    }

    /// Start a new run, tearing down the previous run's ticker first.
    pub fn start(&mut self) {
        self.stop_ticker();
        let frame = {
            let mut agg = self.aggregator.lock();
            agg.start();
            agg.snapshot()
        };
        self.sink.render(&frame);

        let aggregator = Arc::clone(&self.aggregator);
        let sink = Arc::clone(&self.sink);
        match Ticker::spawn(self.interval, move || {
            let frame = aggregator.lock().tick();
            sink.render(&frame);
        }) {
            Ok(ticker) => self.ticker = Some(ticker),
            Err(e) => warn!(error = %e, "Running without elapsed-time refresh"),
        }
    }

    /// Normalize and apply a raw event. Dropped events return the current frame.
    pub fn ingest(&mut self, raw: RawEvent) -> RenderState {
        match self.variant.normalize(raw) {
            Some(event) => self.apply(&event),
            None => {
                debug!("Dropping event without a usable phase");
                self.snapshot()
            }
        }
    }

    /// Apply a canonical event and push the resulting frame.
    pub fn apply(&mut self, event: &CanonicalEvent) -> RenderState {
        match event {
            CanonicalEvent::Progress(_) => {
                let frame = self.aggregator.lock().on_event(event);
                self.sink.render(&frame);
                frame
            }
            CanonicalEvent::Completed => self.complete(),
            CanonicalEvent::Failed { .. } => {
                self.stop_ticker();
                let frame = self.aggregator.lock().on_event(event);
                self.sink.render(&frame);
                frame
            }
        }
    }

    /// Complete the run: stop refreshing, finish all steps, persist timings.
    pub fn complete(&mut self) -> RenderState {
        self.stop_ticker();
        let frame = self.aggregator.lock().complete();
        self.sink.render(&frame);
        frame
    }

    /// Stop refreshing and drop the run.
    pub fn destroy(&mut self) {
        self.stop_ticker();
        self.aggregator.lock().destroy();
    }

    /// Alias of [`destroy`](Self::destroy).
    pub fn reset(&mut self) {
        self.destroy();
    }

    /// Current frame without side effects.
    #[must_use]
    pub fn snapshot(&self) -> RenderState {
        self.aggregator.lock().snapshot()
    }

    /// Whether the elapsed-time ticker is running.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(Ticker::is_running)
    }

    #[must_use]
    pub fn variant(&self) -> EventVariant {
        self.variant
    }

    /// Run a closure against the aggregator under the session lock.
    pub fn with_aggregator<R>(&self, f: impl FnOnce(&ProgressAggregator) -> R) -> R {
        f(&self.aggregator.lock())
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
