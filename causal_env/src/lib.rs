//! Causal Clock Boundary Layer
//!
//! This crate holds everything that crosses the line between the clock
//! engine (`causal_core`) and whatever presents it (`causal_sim`, a GUI,
//! a test harness):
//! - Identifiers (`ProcessId`, `MessageRef`)
//! - The clock discipline tag (`Discipline`) and engine `Phase`
//! - The read-only `StateSnapshot` projection
//! - The `SimulationDriver` stepping contract and the `SnapshotSink` trait
//!
//! # Core Concept: Snapshot-Only Presentation
//!
//! The presentation layer never touches participant clocks directly. It
//! drives the engine through `step()` / `reset()` and renders whatever
//! snapshot comes back.
//!
//! # Example
//!
//! ```ignore
//! use causal_env::{SimulationDriver, SnapshotSink};
//!
//! fn play<D: SimulationDriver, S: SnapshotSink>(driver: &mut D, sink: &mut S) -> Result<(), D::Error> {
//!     sink.render(&driver.reset());
//!     while !driver.is_complete() {
//!         let snapshot = driver.step()?;
//!         sink.render(&snapshot);
//!     }
//!     Ok(())
//! }
//! ```

mod driver;
mod error;
mod snapshot;
mod types;

pub use driver::{SimulationDriver, SnapshotSink};
pub use error::ParseError;
pub use snapshot::{
    ClockView, MessageSummary, ParticipantView, PendingMessage, PendingStatus, StateSnapshot,
};
pub use types::{Discipline, MessageRef, Phase, ProcessId};
