//! The shared rolling aggregate.

use std::sync::{Mutex, PoisonError};

use crate::types::AggregateSnapshot;

/// Running total, count and average of every accumulated score.
///
/// All three values sit behind one mutex, so a reader always sees a triple
/// produced by the same update. The lock is never held across an `.await`.
/// There is no reset: the aggregate covers the whole process lifetime.
#[derive(Debug, Default)]
pub struct RollingAggregate {
    state: Mutex<AggregateSnapshot>,
}

impl RollingAggregate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `score` into the aggregate and return the post-update view.
    pub fn accumulate(&self, score: f64) -> AggregateSnapshot {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.total += score;
        state.count += 1;
        #[allow(clippy::cast_precision_loss)]
        let denom = state.count as f64;
        state.average = state.total / denom;
        *state
    }

    /// Consistent point-in-time view. Side-effect free.
    #[must_use]
    pub fn snapshot(&self) -> AggregateSnapshot {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
