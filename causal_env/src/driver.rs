//! The stepping contract between a clock engine and its presentation.

use crate::snapshot::StateSnapshot;

/// The central interface a presentation layer drives.
///
/// # Implementations
///
/// - **Engine**: `causal_core::CausalEngine`
///
/// # Determinism
///
/// Implementations are synchronous and single-threaded. Replaying the same
/// configuration from `reset()` must yield the same snapshot sequence.
pub trait SimulationDriver {
    /// Fatal error type. Only returned when an internal invariant breaks.
    type Error: std::error::Error;

    /// Applies exactly one script event and returns the new state.
    ///
    /// Once the script is exhausted this is a no-op returning the terminal
    /// snapshot unchanged.
    fn step(&mut self) -> Result<StateSnapshot, Self::Error>;

    /// Returns every participant to a zero clock and the cursor to 0.
    fn reset(&mut self) -> StateSnapshot;

    /// Returns the current state without mutating anything.
    fn current_snapshot(&self) -> StateSnapshot;

    /// Returns true once every script event has been applied.
    fn is_complete(&self) -> bool;
}

/// Anything that consumes snapshots for display or export.
///
/// # Implementations
///
/// - `causal_sim::TextPresenter` - renders to the log
/// - `causal_sim::SimExport` - collects frames for a JSON export
pub trait SnapshotSink {
    /// Consumes one snapshot.
    fn render(&mut self, snapshot: &StateSnapshot);
}

impl SnapshotSink for Vec<StateSnapshot> {
    fn render(&mut self, snapshot: &StateSnapshot) {
        self.push(snapshot.clone());
    }
}
