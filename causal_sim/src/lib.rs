//! Causal Sim - scenario harness for the causal clock engine
//!
//! Drives `causal_core::CausalEngine` through built-in scenarios, JSON
//! script files and seeded random scripts, and judges every run with an
//! invariant oracle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    EngineConfig    ┌──────────────────┐
//! │  ScenarioId  │───────────────────►│                  │
//! │  Generator   │                    │  ScenarioRunner  │
//! │  JSON file   │                    │                  │
//! └──────────────┘                    └────────┬─────────┘
//!                                              │ step()
//!                                     ┌────────▼─────────┐
//!                                     │   CausalEngine   │
//!                                     └────────┬─────────┘
//!                                              │ StateSnapshot
//!                    ┌─────────────────────────┼───────────────────────┐
//!               ┌────▼────┐            ┌───────▼───────┐        ┌──────▼─────┐
//!               │ Oracle  │            │ TextPresenter │        │ SimExport  │
//!               └─────────┘            └───────────────┘        └────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use causal_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::BssReorder);
//! assert!(result.passed);
//! ```

mod exporter;
mod generator;
mod oracle;
mod presenter;
mod runner;
pub mod scenarios;

pub use exporter::SimExport;
pub use generator::ScriptGenerator;
pub use oracle::{Oracle, Violation};
pub use presenter::TextPresenter;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
