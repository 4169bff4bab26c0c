//! Per-iteration progress events.
//!
//! The optimizer only produces [`IterationEvent`]s; where they go (tracing,
//! artifact files, an in-memory trace) is decided by the [`Observer`] the
//! caller passes in.

use alloc::vec::Vec;

/// Progress after one completed update pass.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IterationEvent {
    /// 1-based iteration number
    pub iteration: usize,
    /// Global best fitness after the iteration's reduction
    pub best_fitness: f64,
    /// Whether this iteration produced a new global best
    pub improved: bool,
}

/// A sink for iteration events.
pub trait Observer {
    fn on_iteration(&mut self, event: &IterationEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_iteration(&mut self, _event: &IterationEvent) {}
}

/// Records every event it receives, in order.
#[derive(Debug, Clone, Default)]
pub struct HistoryObserver {
    events: Vec<IterationEvent>,
}

impl HistoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[IterationEvent] {
        &self.events
    }

    /// Best fitness per recorded iteration
    pub fn best_fitness_trace(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.best_fitness).collect()
    }

    pub fn into_events(self) -> Vec<IterationEvent> {
        self.events
    }
}

impl Observer for HistoryObserver {
    fn on_iteration(&mut self, event: &IterationEvent) {
        self.events.push(*event);
    }
}

/// Fan an event out to two observers.
#[derive(Debug)]
pub struct Tee<A, B>(pub A, pub B);

impl<A: Observer, B: Observer> Observer for Tee<A, B> {
    fn on_iteration(&mut self, event: &IterationEvent) {
        self.0.on_iteration(event);
        self.1.on_iteration(event);
    }
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn on_iteration(&mut self, event: &IterationEvent) {
        (**self).on_iteration(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(iteration: usize, best_fitness: f64) -> IterationEvent {
        IterationEvent {
            iteration,
            best_fitness,
            improved: iteration == 1,
        }
    }

    #[test]
    fn tee_forwards_to_both_sides_in_order() {
        let mut left = HistoryObserver::new();
        let mut right = HistoryObserver::new();
        {
            let mut tee = Tee(&mut left, &mut right);
            tee.on_iteration(&event(1, 3.0));
            tee.on_iteration(&event(2, 3.0));
        }
        assert_eq!(left.events(), right.events());
        assert_eq!(left.best_fitness_trace(), vec![3.0, 3.0]);
        assert_eq!(right.into_events()[0], event(1, 3.0));
    }
}
