//! Scenario runner - steps an engine to completion under the oracle.

use crate::generator::ScriptGenerator;
use crate::oracle::Oracle;
use crate::scenarios::ScenarioId;

use causal_core::{CausalEngine, EngineConfig};
use causal_env::{Discipline, MessageRef, ProcessId, SimulationDriver, SnapshotSink, StateSnapshot};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario name (built-in, `random` or a script file)
    pub scenario: String,

    /// Discipline of the run
    pub discipline: Discipline,

    /// Seed used, for generated scripts
    pub seed: Option<u64>,

    /// Whether the run completed with every invariant intact
    pub passed: bool,

    /// Script events applied
    pub steps: usize,

    /// Last snapshot produced, if the engine could be built
    pub final_snapshot: Option<StateSnapshot>,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioMetrics {
    /// Message copies sent
    pub messages_sent: usize,

    /// Message copies delivered
    pub deliveries: usize,

    /// Arrivals that had to wait in a delivery buffer
    pub buffered_arrivals: usize,

    /// Largest number of messages held by one participant at once
    pub max_buffer_depth: usize,
}

impl ScenarioMetrics {
    fn record(&mut self, snapshot: &StateSnapshot, seen: &mut BTreeSet<(MessageRef, ProcessId)>) {
        for view in &snapshot.participants {
            let mut depth = 0;
            for held in view.buffered() {
                depth += 1;
                if seen.insert((held.message.id, view.id)) {
                    self.buffered_arrivals += 1;
                }
            }
            self.max_buffer_depth = self.max_buffer_depth.max(depth);
        }

        self.deliveries = snapshot.participants.iter().map(|v| v.delivered.len()).sum();
        self.messages_sent = self.deliveries + snapshot.pending_count();
    }
}

/// Runs scenarios and scripts.
pub struct ScenarioRunner {
    /// Seed for generated scripts
    seed: u64,

    /// Participants in generated scripts
    participants: usize,

    /// Sends per generated script
    events: usize,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            participants: 3,
            events: 8,
        }
    }

    /// Sets the participant count for generated scripts.
    pub fn with_participants(mut self, participants: usize) -> Self {
        self.participants = participants;
        self
    }

    /// Sets the number of sends in generated scripts.
    pub fn with_events(mut self, events: usize) -> Self {
        self.events = events;
        self
    }

    /// Runs a built-in scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} ({})", scenario.name(), scenario.description());
        self.run_config(scenario.name(), scenario.config(), None, &mut [])
    }

    /// Runs a freshly generated script under `discipline`.
    pub fn run_random(&self, discipline: Discipline) -> ScenarioResult {
        let config = self.random_config(discipline);
        info!(
            "Starting random run: {} (seed={}, {} events)",
            discipline,
            self.seed,
            config.script.len()
        );
        self.run_config("random", config, Some(self.seed), &mut [])
    }

    /// Returns the script `run_random` would use.
    pub fn random_config(&self, discipline: Discipline) -> EngineConfig {
        ScriptGenerator::new(self.seed, discipline, self.participants)
            .with_sends(self.events)
            .config()
    }

    /// Runs `config`, feeding every snapshot to `sinks` and the oracle.
    pub fn run_config(
        &self,
        name: &str,
        config: EngineConfig,
        seed: Option<u64>,
        sinks: &mut [&mut dyn SnapshotSink],
    ) -> ScenarioResult {
        let discipline = config.discipline;
        let mut result = ScenarioResult {
            scenario: name.to_string(),
            discipline,
            seed,
            passed: false,
            steps: 0,
            final_snapshot: None,
            failure_reason: None,
            metrics: ScenarioMetrics::default(),
        };

        let mut engine = match CausalEngine::new(config) {
            Ok(engine) => engine,
            Err(e) => {
                warn!("{}: {}", name, e);
                result.failure_reason = Some(e.to_string());
                return result;
            }
        };

        let mut oracle = Oracle::new(discipline);
        let mut seen = BTreeSet::new();
        let mut snapshot = engine.current_snapshot();

        loop {
            for sink in sinks.iter_mut() {
                sink.render(&snapshot);
            }
            result.metrics.record(&snapshot, &mut seen);
            result.steps = snapshot.cursor;

            if let Err(violation) = oracle.observe(&snapshot) {
                result.failure_reason = Some(violation.to_string());
                result.final_snapshot = Some(snapshot);
                return result;
            }

            if engine.is_complete() {
                break;
            }

            snapshot = match engine.step() {
                Ok(next) => next,
                Err(e) => {
                    result.failure_reason = Some(e.to_string());
                    result.final_snapshot = Some(snapshot);
                    return result;
                }
            };
        }

        if let Err(violation) = oracle.verify_terminal(&snapshot) {
            result.failure_reason = Some(violation.to_string());
        } else {
            result.passed = true;
        }

        debug!(
            "{}: {} steps, {} sent, {} delivered, {} buffered",
            name,
            result.steps,
            result.metrics.messages_sent,
            result.metrics.deliveries,
            result.metrics.buffered_arrivals
        );

        result.final_snapshot = Some(snapshot);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::SimExport;
    use causal_core::EventScript;
    use causal_env::{ClockView, Phase};

    fn p(n: u32) -> ProcessId {
        ProcessId::new(n).unwrap()
    }

    #[test]
    fn test_all_scenarios_pass() {
        let runner = ScenarioRunner::new(42);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
            assert_eq!(result.final_snapshot.unwrap().phase, Phase::Completed);
        }
    }

    #[test]
    fn test_bss_scenario_metrics() {
        let result = ScenarioRunner::new(42).run(ScenarioId::Bss);
        assert_eq!(result.steps, 3);
        assert_eq!(
            result.metrics,
            ScenarioMetrics {
                messages_sent: 2,
                deliveries: 2,
                buffered_arrivals: 0,
                max_buffer_depth: 0,
            }
        );
    }

    #[test]
    fn test_reorder_scenarios_buffer() {
        let runner = ScenarioRunner::new(42);
        for scenario in [ScenarioId::BssReorder, ScenarioId::SesReorder] {
            let result = runner.run(scenario);
            assert!(result.passed);
            assert_eq!(result.metrics.buffered_arrivals, 1);
            assert_eq!(result.metrics.max_buffer_depth, 1);
        }
    }

    #[test]
    fn test_supply_chain_final_clocks() {
        let result = ScenarioRunner::new(42).run(ScenarioId::SupplyChain);
        let terminal = result.final_snapshot.unwrap();

        assert_eq!(
            terminal.clock_of(p(3)),
            Some(&ClockView::Matrix(vec![
                vec![1, 0, 0],
                vec![1, 1, 0],
                vec![1, 1, 1],
            ]))
        );
        assert_eq!(
            terminal.clock_of(p(1)),
            Some(&ClockView::Matrix(vec![
                vec![1, 1, 1],
                vec![1, 1, 0],
                vec![1, 1, 1],
            ]))
        );
        assert!(terminal.log[0].ends_with("\"Shipment dispatched from W1\""));
    }

    #[test]
    fn test_random_runs_pass_and_are_deterministic() {
        for seed in 0..20 {
            let runner = ScenarioRunner::new(seed).with_participants(4).with_events(10);
            for discipline in Discipline::all() {
                let first = runner.run_random(discipline);
                assert!(first.passed, "seed {} {}: {:?}", seed, discipline, first.failure_reason);

                let second = runner.run_random(discipline);
                assert_eq!(first.final_snapshot, second.final_snapshot);
                assert_eq!(first.metrics, second.metrics);
            }
        }
    }

    #[test]
    fn test_invalid_script_fails_cleanly() {
        let mut script = EventScript::new();
        script.send(p(1), [p(2)], None);
        let config = EngineConfig::new(Discipline::VectorBss, 3, script);

        let result = ScenarioRunner::new(1).run_config("broken", config, None, &mut []);
        assert!(!result.passed);
        assert!(result.final_snapshot.is_none());
        assert!(result.failure_reason.unwrap().contains("every other participant"));
    }

    #[test]
    fn test_sinks_see_every_snapshot() {
        let mut frames: Vec<StateSnapshot> = Vec::new();
        let mut export = SimExport::new("ses_reorder", Discipline::VectorSes);

        let mut sinks: [&mut dyn SnapshotSink; 2] = [&mut frames, &mut export];
        let result = ScenarioRunner::new(1).run_config(
            "ses_reorder",
            ScenarioId::SesReorder.config(),
            None,
            &mut sinks,
        );

        assert!(result.passed);
        assert_eq!(frames.len(), 7);
        assert_eq!(export.frames, frames);
    }

    #[test]
    fn test_sample_scripts_pass() {
        let samples = [
            include_str!("../scripts/bss_reorder.json"),
            include_str!("../scripts/ses_chain.json"),
            include_str!("../scripts/matrix_gossip.json"),
        ];
        for json in samples {
            let config = EngineConfig::from_json(json).unwrap();
            let result = ScenarioRunner::new(1).run_config("sample", config, None, &mut []);
            assert!(result.passed, "{:?}", result.failure_reason);
        }
    }
}
