//! Seeded random scripts.
//!
//! Every generated script is valid for its discipline and receives every
//! message copy it sends. Arrivals are drawn at random from everything in
//! flight, so messages routinely overtake the ones they depend on.

use causal_core::{EngineConfig, EventScript, MAX_PARTICIPANTS};
use causal_env::{Discipline, MessageRef, ProcessId};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generates random valid scripts from a seed.
pub struct ScriptGenerator {
    /// Deterministic RNG
    rng: ChaCha8Rng,

    /// Discipline the scripts must satisfy
    discipline: Discipline,

    /// Number of participants
    participants: usize,

    /// Number of send events per script
    sends: usize,
}

impl ScriptGenerator {
    /// Creates a generator. `participants` is clamped to `2..=MAX_PARTICIPANTS`.
    pub fn new(seed: u64, discipline: Discipline, participants: usize) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            discipline,
            participants: participants.clamp(2, MAX_PARTICIPANTS),
            sends: 8,
        }
    }

    /// Sets the number of send events per script.
    pub fn with_sends(mut self, sends: usize) -> Self {
        self.sends = sends;
        self
    }

    /// Builds one script.
    pub fn generate(&mut self) -> EventScript {
        let mut script = EventScript::new();
        let mut in_flight: Vec<(MessageRef, ProcessId)> = Vec::new();

        for _ in 0..self.sends {
            let from = ProcessId::from_index(self.rng.gen_range(0..self.participants));
            let to = self.recipients(from);
            let message = script.send(from, to.iter().copied(), None);
            in_flight.extend(to.into_iter().map(|t| (message, t)));

            // Let a random share of the traffic land before the next send
            let arrivals = self.rng.gen_range(0..=in_flight.len());
            for _ in 0..arrivals {
                let pick = self.rng.gen_range(0..in_flight.len());
                let (message, at) = in_flight.swap_remove(pick);
                script.receive(message, at);
            }
        }

        in_flight.shuffle(&mut self.rng);
        for (message, at) in in_flight {
            script.receive(message, at);
        }
        script
    }

    /// Builds one script wrapped in an engine configuration.
    pub fn config(&mut self) -> EngineConfig {
        EngineConfig::new(self.discipline, self.participants, self.generate())
    }

    fn recipients(&mut self, from: ProcessId) -> Vec<ProcessId> {
        let others: Vec<ProcessId> = ProcessId::range(self.participants)
            .filter(|p| *p != from)
            .collect();

        if self.discipline == Discipline::VectorBss {
            return others;
        }

        let count = self.rng.gen_range(1..=others.len());
        let mut picked: Vec<ProcessId> = others
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();
        picked.sort();
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causal_core::ScriptEvent;
    use proptest::prelude::*;

    #[test]
    fn test_same_seed_same_script() {
        let a = ScriptGenerator::new(7, Discipline::VectorSes, 4).generate();
        let b = ScriptGenerator::new(7, Discipline::VectorSes, 4).generate();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bss_scripts_broadcast() {
        let script = ScriptGenerator::new(3, Discipline::VectorBss, 4).generate();
        for event in script.events() {
            if let ScriptEvent::Send { to, .. } = event {
                assert_eq!(to.len(), 3);
            }
        }
    }

    #[test]
    fn test_every_copy_is_received() {
        let script = ScriptGenerator::new(11, Discipline::Matrix, 3)
            .with_sends(5)
            .generate();

        let copies: usize = script
            .events()
            .iter()
            .map(|e| match e {
                ScriptEvent::Send { to, .. } => to.len(),
                ScriptEvent::Receive { .. } => 0,
            })
            .sum();
        assert_eq!(script.len() - script.send_count(), copies);
    }

    #[test]
    fn test_participants_clamped_to_limit() {
        let config = ScriptGenerator::new(7, Discipline::VectorSes, usize::MAX)
            .with_sends(0)
            .config();
        assert_eq!(config.participant_count, MAX_PARTICIPANTS);
    }

    proptest! {
        #[test]
        fn prop_generated_scripts_validate(
            seed in any::<u64>(),
            participants in 2usize..6,
            sends in 0usize..12,
        ) {
            for discipline in Discipline::all() {
                let script = ScriptGenerator::new(seed, discipline, participants)
                    .with_sends(sends)
                    .generate();
                prop_assert!(script.validate(discipline, participants).is_ok());
                prop_assert_eq!(script.send_count(), sends);
            }
        }
    }
}
