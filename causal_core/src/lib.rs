//! Causal Core - Clock Algebra and Causal Delivery
//!
//! This library runs scripted message exchanges between simulated processes
//! under three clock disciplines:
//! 1. **vector-bss**: vector clocks, causal broadcast, CBCAST delivery test
//! 2. **vector-ses**: vector clocks, receiver increments on delivery, SES
//!    dependency sets for causal unicast
//! 3. **matrix**: N x N matrix clocks recording pairwise knowledge
//!
//! # Usage
//!
//! ```ignore
//! use causal_core::{CausalEngine, EngineConfig, EventScript};
//! use causal_env::{Discipline, ProcessId, SimulationDriver};
//!
//! let p = |n| ProcessId::new(n).unwrap();
//! let mut script = EventScript::new();
//! let m1 = script.send(p(1), [p(2), p(3)], None);
//! script.receive(m1, p(2)).receive(m1, p(3));
//!
//! let mut engine = CausalEngine::new(EngineConfig::new(Discipline::VectorBss, 3, script))?;
//! while !engine.is_complete() {
//!     let snapshot = engine.step()?;
//!     println!("{:?}", snapshot.log.last());
//! }
//! ```

pub mod buffer;
pub mod clock;
pub mod discipline;
pub mod engine;
pub mod message;
pub mod participant;
pub mod script;

// Re-export key types for convenience
pub use buffer::DeliveryBuffer;
pub use clock::{Clock, ClockError, MatrixClock, VectorClock};
pub use discipline::{cbcast_ready, strategy, ClockDiscipline};
pub use engine::{CausalEngine, EngineConfig, EngineError};
pub use message::{DependencySet, Message};
pub use participant::Participant;
pub use script::{EventScript, ScriptError, ScriptEvent, MAX_PARTICIPANTS};
