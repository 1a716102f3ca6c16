//! Clock disciplines - the pluggable send/deliver rules.
//!
//! One engine runs all three disciplines. Everything that differs between
//! them lives behind the `ClockDiscipline` trait:
//!
//! | discipline   | clock  | send              | deliverable when                   | on delivery                 |
//! |--------------|--------|-------------------|------------------------------------|-----------------------------|
//! | `vector-bss` | vector | own entry += 1    | CBCAST precondition                | merge                       |
//! | `vector-ses` | vector | own entry += 1    | `V_M[receiver]` dominated by local | merge, own entry += 1       |
//! | `matrix`     | N x N  | own diagonal += 1 | on arrival                         | merge, fold sender row in   |

use crate::clock::{Clock, ClockError, MatrixClock, VectorClock};
use crate::message::Message;
use crate::participant::Participant;
use causal_env::{Discipline, ProcessId};

/// Send and delivery rules of one clock discipline.
pub trait ClockDiscipline: Sync {
    /// The tag this strategy implements.
    fn kind(&self) -> Discipline;

    /// A zero clock for `size` participants.
    fn zero_clock(&self, size: usize) -> Clock;

    /// The sender's clock after a send event. This value is piggybacked.
    fn stamp_send(&self, sender: ProcessId, clock: &Clock) -> Result<Clock, ClockError> {
        clock.increment(sender)
    }

    /// Whether `receiver` may deliver `message` right now.
    fn is_deliverable(&self, receiver: &Participant, message: &Message) -> bool;

    /// The receiver's clock after delivering `message`.
    fn merge_on_delivery(
        &self,
        receiver: ProcessId,
        local: &Clock,
        message: &Message,
    ) -> Result<Clock, ClockError>;

    /// Whether every send must reach all other participants.
    fn requires_broadcast(&self) -> bool {
        false
    }

    /// Whether participants maintain a `DependencySet`.
    fn tracks_dependencies(&self) -> bool {
        false
    }
}

/// CBCAST delivery test for vector clocks.
///
/// A message stamped `stamp` by `sender` is deliverable at a process whose
/// clock is `local` iff `local[sender] == stamp[sender] - 1` and
/// `local[k] >= stamp[k]` for every other k.
pub fn cbcast_ready(local: &VectorClock, stamp: &VectorClock, sender: ProcessId) -> bool {
    if local.len() != stamp.len() || sender.index() >= local.len() {
        return false;
    }
    let s = sender.index();
    local
        .entries()
        .iter()
        .zip(stamp.entries())
        .enumerate()
        .all(|(k, (have, want))| {
            if k == s {
                have.checked_add(1) == Some(*want)
            } else {
                have >= want
            }
        })
}

/// Birman-Schiper-Stephenson causal broadcast.
#[derive(Debug, Clone, Copy, Default)]
pub struct BssDiscipline;

impl ClockDiscipline for BssDiscipline {
    fn kind(&self) -> Discipline {
        Discipline::VectorBss
    }

    fn zero_clock(&self, size: usize) -> Clock {
        Clock::Vector(VectorClock::zero(size))
    }

    fn is_deliverable(&self, receiver: &Participant, message: &Message) -> bool {
        match (receiver.clock().as_vector(), message.clock.as_vector()) {
            (Some(local), Some(stamp)) => cbcast_ready(local, stamp, message.from),
            _ => false,
        }
    }

    fn merge_on_delivery(
        &self,
        _receiver: ProcessId,
        local: &Clock,
        message: &Message,
    ) -> Result<Clock, ClockError> {
        local.merge(&message.clock)
    }

    fn requires_broadcast(&self) -> bool {
        true
    }
}

/// Schiper-Eggli-Sandoz causal unicast.
#[derive(Debug, Clone, Copy, Default)]
pub struct SesDiscipline;

impl ClockDiscipline for SesDiscipline {
    fn kind(&self) -> Discipline {
        Discipline::VectorSes
    }

    fn zero_clock(&self, size: usize) -> Clock {
        Clock::Vector(VectorClock::zero(size))
    }

    fn is_deliverable(&self, receiver: &Participant, message: &Message) -> bool {
        let Some(local) = receiver.clock().as_vector() else {
            return false;
        };
        match message.dependencies.get(receiver.id()) {
            None => true,
            Some(required) => local.dominates(required),
        }
    }

    fn merge_on_delivery(
        &self,
        receiver: ProcessId,
        local: &Clock,
        message: &Message,
    ) -> Result<Clock, ClockError> {
        local.merge(&message.clock)?.increment(receiver)
    }

    fn tracks_dependencies(&self) -> bool {
        true
    }
}

/// Matrix clocks recording pairwise knowledge.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixDiscipline;

impl ClockDiscipline for MatrixDiscipline {
    fn kind(&self) -> Discipline {
        Discipline::Matrix
    }

    fn zero_clock(&self, size: usize) -> Clock {
        Clock::Matrix(MatrixClock::zero(size))
    }

    // Knowledge matrices carry no per-channel send counts, so there is
    // nothing to wait for.
    fn is_deliverable(&self, _receiver: &Participant, _message: &Message) -> bool {
        true
    }

    fn merge_on_delivery(
        &self,
        receiver: ProcessId,
        local: &Clock,
        message: &Message,
    ) -> Result<Clock, ClockError> {
        match local.merge(&message.clock)? {
            Clock::Matrix(merged) => Ok(Clock::Matrix(merged.absorb_row(receiver, message.from)?)),
            Clock::Vector(_) => Err(ClockError::KindMismatch),
        }
    }
}

static BSS: BssDiscipline = BssDiscipline;
static SES: SesDiscipline = SesDiscipline;
static MATRIX: MatrixDiscipline = MatrixDiscipline;

/// Returns the strategy implementing `discipline`.
pub fn strategy(discipline: Discipline) -> &'static dyn ClockDiscipline {
    match discipline {
        Discipline::VectorBss => &BSS,
        Discipline::VectorSes => &SES,
        Discipline::Matrix => &MATRIX,
    }
}
