//! Invariant oracle - judges a run from its snapshot sequence.
//!
//! The oracle never looks inside the engine. It sees exactly what a
//! presentation layer sees and checks:
//!
//! - **Monotonicity**: no clock entry ever decreases between snapshots
//! - **Causal order** (vector disciplines): a participant never delivers a
//!   message whose stamp happens-before one it delivered earlier
//! - **Completeness**: once nothing is in transit, nothing is left buffered

use causal_core::VectorClock;
use causal_env::{
    ClockView, Discipline, MessageRef, PendingStatus, ProcessId, StateSnapshot,
};
use thiserror::Error;

/// An invariant broken by a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("Step {step}: clock of {participant} went backwards")]
    ClockRegressed { step: usize, participant: ProcessId },

    #[error("Step {step}: clock of {participant} changed shape")]
    ShapeChanged { step: usize, participant: ProcessId },

    #[error("Step {step}: {participant} delivered {later} after {earlier}, which it causally precedes")]
    CausalOrder {
        step: usize,
        participant: ProcessId,
        earlier: MessageRef,
        later: MessageRef,
    },

    #[error("{participant} still holds {message} after every message arrived")]
    Undelivered {
        participant: ProcessId,
        message: MessageRef,
    },

    #[error("Snapshot lists {found} participants, expected {expected}")]
    ParticipantCount { expected: usize, found: usize },
}

/// Stateful checker fed one snapshot at a time.
pub struct Oracle {
    /// Discipline of the observed run
    discipline: Discipline,

    /// Last snapshot observed
    previous: Option<StateSnapshot>,

    /// Number of snapshots observed
    observed: usize,
}

impl Oracle {
    /// Creates an oracle for a run under `discipline`.
    pub fn new(discipline: Discipline) -> Self {
        Self {
            discipline,
            previous: None,
            observed: 0,
        }
    }

    /// Number of snapshots checked so far.
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Checks `snapshot` against the previous one.
    ///
    /// A snapshot whose cursor is behind the previous one is treated as a
    /// reset and starts a fresh sequence.
    pub fn observe(&mut self, snapshot: &StateSnapshot) -> Result<(), Violation> {
        self.observed += 1;

        let previous = match self.previous.take() {
            Some(prev) if prev.cursor <= snapshot.cursor => prev,
            _ => {
                self.check_delivery_order(snapshot, None)?;
                self.previous = Some(snapshot.clone());
                return Ok(());
            }
        };

        if previous.participants.len() != snapshot.participants.len() {
            return Err(Violation::ParticipantCount {
                expected: previous.participants.len(),
                found: snapshot.participants.len(),
            });
        }

        for (before, after) in previous.participants.iter().zip(&snapshot.participants) {
            let old = before.clock.entries();
            let new = after.clock.entries();
            if old.len() != new.len() {
                return Err(Violation::ShapeChanged {
                    step: snapshot.cursor,
                    participant: after.id,
                });
            }
            if old.iter().zip(&new).any(|(a, b)| b < a) {
                return Err(Violation::ClockRegressed {
                    step: snapshot.cursor,
                    participant: after.id,
                });
            }
        }

        self.check_delivery_order(snapshot, Some(&previous))?;
        self.previous = Some(snapshot.clone());
        Ok(())
    }

    /// Checks the delivery histories of `snapshot`. Only deliveries made
    /// since `previous` are compared against the rest of the history.
    fn check_delivery_order(
        &self,
        snapshot: &StateSnapshot,
        previous: Option<&StateSnapshot>,
    ) -> Result<(), Violation> {
        if !self.discipline.is_vector() {
            return Ok(());
        }

        for (i, view) in snapshot.participants.iter().enumerate() {
            let seen = previous
                .and_then(|p| p.participants.get(i))
                .map(|v| v.delivered.len())
                .unwrap_or(0);

            let stamps: Vec<Option<VectorClock>> = view
                .delivered
                .iter()
                .map(|m| vector_of(&m.clock))
                .collect();

            for later in seen..stamps.len() {
                let Some(later_stamp) = &stamps[later] else {
                    continue;
                };
                for earlier in 0..later {
                    let Some(earlier_stamp) = &stamps[earlier] else {
                        continue;
                    };
                    if later_stamp.happens_before(earlier_stamp) {
                        return Err(Violation::CausalOrder {
                            step: snapshot.cursor,
                            participant: view.id,
                            earlier: view.delivered[earlier].id,
                            later: view.delivered[later].id,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Checks the terminal snapshot of a run.
    pub fn verify_terminal(&self, snapshot: &StateSnapshot) -> Result<(), Violation> {
        let in_transit = snapshot
            .participants
            .iter()
            .flat_map(|v| v.pending.iter())
            .any(|p| p.status == PendingStatus::InTransit);
        if in_transit {
            return Ok(());
        }

        for view in &snapshot.participants {
            if let Some(held) = view.buffered().next() {
                return Err(Violation::Undelivered {
                    participant: view.id,
                    message: held.message.id,
                });
            }
        }
        Ok(())
    }
}

fn vector_of(view: &ClockView) -> Option<VectorClock> {
    view.as_vector().map(|v| VectorClock::from_entries(v.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use causal_env::{MessageSummary, ParticipantView, PendingMessage, Phase};

    fn p(n: u32) -> ProcessId {
        ProcessId::new(n).unwrap()
    }

    fn summary(id: u32, clock: Vec<u64>) -> MessageSummary {
        MessageSummary {
            id: MessageRef(id),
            from: p(1),
            to: p(2),
            clock: ClockView::Vector(clock),
            payload: None,
        }
    }

    fn snapshot(cursor: usize, clocks: Vec<Vec<u64>>) -> StateSnapshot {
        StateSnapshot {
            discipline: Discipline::VectorBss,
            phase: Phase::Running,
            cursor,
            total_steps: 10,
            participants: clocks
                .into_iter()
                .enumerate()
                .map(|(i, c)| ParticipantView {
                    id: ProcessId::from_index(i),
                    clock: ClockView::Vector(c),
                    pending: Vec::new(),
                    delivered: Vec::new(),
                    log: Vec::new(),
                })
                .collect(),
            log: Vec::new(),
        }
    }

    #[test]
    fn test_monotone_sequence_passes() {
        let mut oracle = Oracle::new(Discipline::VectorBss);
        oracle.observe(&snapshot(0, vec![vec![0, 0], vec![0, 0]])).unwrap();
        oracle.observe(&snapshot(1, vec![vec![1, 0], vec![0, 0]])).unwrap();
        oracle.observe(&snapshot(2, vec![vec![1, 0], vec![1, 0]])).unwrap();
        assert_eq!(oracle.observed(), 3);
    }

    #[test]
    fn test_regression_detected() {
        let mut oracle = Oracle::new(Discipline::VectorBss);
        oracle.observe(&snapshot(1, vec![vec![1, 0], vec![0, 0]])).unwrap();
        let result = oracle.observe(&snapshot(2, vec![vec![0, 0], vec![0, 0]]));
        assert_eq!(
            result,
            Err(Violation::ClockRegressed {
                step: 2,
                participant: p(1)
            })
        );
    }

    #[test]
    fn test_reset_starts_fresh_sequence() {
        let mut oracle = Oracle::new(Discipline::VectorBss);
        oracle.observe(&snapshot(3, vec![vec![2, 1], vec![2, 1]])).unwrap();
        assert!(oracle.observe(&snapshot(0, vec![vec![0, 0], vec![0, 0]])).is_ok());
    }

    #[test]
    fn test_out_of_order_delivery_detected() {
        let mut bad = snapshot(4, vec![vec![2, 0], vec![2, 0]]);
        bad.participants[1].delivered = vec![summary(2, vec![2, 0]), summary(1, vec![1, 0])];

        let mut oracle = Oracle::new(Discipline::VectorBss);
        assert!(matches!(
            oracle.observe(&bad),
            Err(Violation::CausalOrder { earlier: MessageRef(2), later: MessageRef(1), .. })
        ));

        // Matrix runs deliver on arrival and are not order-checked
        let mut matrix = Oracle::new(Discipline::Matrix);
        assert!(matrix.observe(&bad).is_ok());
    }

    #[test]
    fn test_concurrent_deliveries_in_any_order() {
        let mut ok = snapshot(4, vec![vec![1, 1, 0], vec![1, 1, 0], vec![1, 1, 0]]);
        ok.participants[2].delivered = vec![summary(2, vec![0, 1, 0]), summary(1, vec![1, 0, 0])];

        let mut oracle = Oracle::new(Discipline::VectorBss);
        assert!(oracle.observe(&ok).is_ok());
    }

    #[test]
    fn test_leftover_buffer_is_incomplete() {
        let mut terminal = snapshot(5, vec![vec![1, 0], vec![0, 0]]);
        terminal.participants[1].pending = vec![PendingMessage {
            message: summary(2, vec![2, 0]),
            status: PendingStatus::AwaitingCausalDelivery,
        }];

        let oracle = Oracle::new(Discipline::VectorBss);
        assert_eq!(
            oracle.verify_terminal(&terminal),
            Err(Violation::Undelivered {
                participant: p(2),
                message: MessageRef(2)
            })
        );

        // Still waiting on an arrival: not judged yet
        terminal.participants[1].pending.push(PendingMessage {
            message: summary(1, vec![1, 0]),
            status: PendingStatus::InTransit,
        });
        assert!(oracle.verify_terminal(&terminal).is_ok());
    }
}
