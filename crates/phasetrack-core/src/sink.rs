//! Render sinks: where computed frames go.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::render::RenderState;

/// Receiver of render frames.
pub trait RenderSink: Send + Sync {
    /// Paint one frame. Must not block.
    fn render(&self, state: &RenderState);
}

/// Fan-out over a collection of sinks.
pub struct SinkSet {
    sinks: RwLock<Vec<Arc<dyn RenderSink>>>,
}

impl SinkSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sinks: RwLock::new(Vec::new()),
        }
    }

    /// Register a sink.
    pub fn register(&self, sink: Arc<dyn RenderSink>) {
        self.sinks.write().push(sink);
    }

    /// Unregister all sinks.
    pub fn clear(&self) {
        self.sinks.write().clear();
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.sinks.read().len()
    }
}

impl Default for SinkSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSink for SinkSet {
    fn render(&self, state: &RenderState) {
        let sinks = self.sinks.read();
        for sink in sinks.iter() {
            sink.render(state);
        }
    }
}
