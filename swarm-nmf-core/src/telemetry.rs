//! Telemetry integration (optional).
//!
//! Bridges [`crate::observe`] events into `tracing`. The optimizer itself also
//! emits `debug` events at run start and finish when this feature is enabled.

use crate::observe::{IterationEvent, Observer};

/// Forwards every iteration event as a `tracing` info event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_iteration(&mut self, event: &IterationEvent) {
        tracing::info!(
            iteration = event.iteration,
            best_fitness = event.best_fitness,
            improved = event.improved,
            "pso iteration"
        );
    }
}
