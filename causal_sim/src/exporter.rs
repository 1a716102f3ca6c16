//! JSON exporter for recorded runs.
//!
//! Exports every snapshot of a run so it can be replayed or inspected
//! outside the simulator.

use causal_env::{Discipline, SnapshotSink, StateSnapshot};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Discipline of the run
    pub discipline: Discipline,

    /// Seed used, for generated scripts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// One frame per snapshot, starting with the initial state
    pub frames: Vec<StateSnapshot>,

    /// Final result
    pub passed: bool,

    /// Failure message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, discipline: Discipline) -> Self {
        Self {
            scenario: scenario.to_string(),
            discipline,
            seed: None,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Records the seed of a generated script.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: StateSnapshot) {
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

impl SnapshotSink for SimExport {
    fn render(&mut self, snapshot: &StateSnapshot) {
        self.add_frame(snapshot.clone());
    }
}
