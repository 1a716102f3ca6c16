//! Built-in scenarios.

use causal_core::{EngineConfig, EventScript};
use causal_env::{Discipline, ProcessId};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// P1 broadcasts once, P2 and P3 receive in order
    Bss,

    /// A broadcast overtaken by a broadcast that depends on it
    BssReorder,

    /// P1 sends to P2, P2 increments on delivery
    Ses,

    /// Unicast overtaken by a causally later unicast
    SesReorder,

    /// P1 sends to P2 under matrix clocks
    Matrix,

    /// Three warehouses passing a shipment around
    SupplyChain,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Bss,
            ScenarioId::BssReorder,
            ScenarioId::Ses,
            ScenarioId::SesReorder,
            ScenarioId::Matrix,
            ScenarioId::SupplyChain,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Bss => "bss",
            ScenarioId::BssReorder => "bss_reorder",
            ScenarioId::Ses => "ses",
            ScenarioId::SesReorder => "ses_reorder",
            ScenarioId::Matrix => "matrix",
            ScenarioId::SupplyChain => "supply_chain",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Bss => "3 participants, one broadcast delivered in order",
            ScenarioId::BssReorder => "Dependent broadcast arrives first and waits in the buffer",
            ScenarioId::Ses => "Unicast P1 -> P2, receiver increments on delivery",
            ScenarioId::SesReorder => "P2's message to P3 overtakes P1's earlier one",
            ScenarioId::Matrix => "Unicast P1 -> P2, receiver folds the sender's row",
            ScenarioId::SupplyChain => "W1 -> W2 -> W3 -> W1 shipment under matrix clocks",
        }
    }

    /// Returns the discipline the scenario runs under.
    pub fn discipline(&self) -> Discipline {
        match self {
            ScenarioId::Bss | ScenarioId::BssReorder => Discipline::VectorBss,
            ScenarioId::Ses | ScenarioId::SesReorder => Discipline::VectorSes,
            ScenarioId::Matrix | ScenarioId::SupplyChain => Discipline::Matrix,
        }
    }

    /// Builds the engine configuration for this scenario.
    pub fn config(&self) -> EngineConfig {
        let p = ProcessId::from_index;
        let (p1, p2, p3) = (p(0), p(1), p(2));
        let mut script = EventScript::new();

        match self {
            ScenarioId::Bss => {
                let m1 = script.send(p1, [p2, p3], None);
                script.receive(m1, p2).receive(m1, p3);
            }
            ScenarioId::BssReorder => {
                let m1 = script.send(p1, [p2, p3], None);
                script.receive(m1, p2);
                let m2 = script.send(p2, [p1, p3], None);
                script.receive(m2, p3).receive(m1, p3).receive(m2, p1);
            }
            ScenarioId::Ses | ScenarioId::Matrix => {
                let m1 = script.send(p1, [p2], None);
                script.receive(m1, p2);
            }
            ScenarioId::SesReorder => {
                let m1 = script.send(p1, [p3], None);
                let m2 = script.send(p1, [p2], None);
                script.receive(m2, p2);
                let m3 = script.send(p2, [p3], None);
                script.receive(m3, p3).receive(m1, p3);
            }
            ScenarioId::SupplyChain => {
                let m1 = script.send(p1, [p2], Some("Shipment dispatched from W1"));
                script.receive(m1, p2);
                let m2 = script.send(p2, [p3], Some("Shipment en route from W2"));
                script.receive(m2, p3);
                let m3 = script.send(p3, [p1], Some("Shipment delivered to W3"));
                script.receive(m3, p1);
            }
        }

        EngineConfig::new(self.discipline(), 3, script)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "bss" | "vector_bss" => Ok(ScenarioId::Bss),
            "bss_reorder" => Ok(ScenarioId::BssReorder),
            "ses" | "vector_ses" => Ok(ScenarioId::Ses),
            "ses_reorder" => Ok(ScenarioId::SesReorder),
            "matrix" => Ok(ScenarioId::Matrix),
            "supply_chain" | "supplychain" => Ok(ScenarioId::SupplyChain),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// Parses a `--scenario` argument: a single name or `all`.
pub fn parse_selection(s: &str) -> Result<Vec<ScenarioId>, String> {
    if s.eq_ignore_ascii_case("all") {
        Ok(ScenarioId::all())
    } else {
        Ok(vec![s.parse()?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causal_core::CausalEngine;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert_eq!("vector-bss".parse::<ScenarioId>(), Ok(ScenarioId::Bss));
        assert!("lamport".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_selection() {
        assert_eq!(parse_selection("ALL").unwrap().len(), 6);
        assert_eq!(parse_selection("supply_chain").unwrap(), vec![ScenarioId::SupplyChain]);
    }

    #[test]
    fn test_every_scenario_builds_a_valid_engine() {
        for scenario in ScenarioId::all() {
            let config = scenario.config();
            assert_eq!(config.discipline, scenario.discipline());
            assert!(CausalEngine::new(config).is_ok(), "{} is invalid", scenario);
        }
    }

    #[test]
    fn test_supply_chain_payloads() {
        let config = ScenarioId::SupplyChain.config();
        assert_eq!(config.script.send_count(), 3);
        assert_eq!(config.script.len(), 6);
    }
}
