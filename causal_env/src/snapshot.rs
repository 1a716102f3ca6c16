//! Read-only projection of engine state for presentation layers.

use crate::types::{Discipline, MessageRef, Phase, ProcessId};
use serde::{Deserialize, Serialize};

/// A clock rendered as plain nested numbers.
///
/// Serializes as `[1,0,0]` for vector clocks and `[[1,0,0],[0,0,0],[0,0,0]]`
/// for matrix clocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClockView {
    Vector(Vec<u64>),
    Matrix(Vec<Vec<u64>>),
}

impl ClockView {
    /// Returns all entries in row-major order.
    pub fn entries(&self) -> Vec<u64> {
        match self {
            ClockView::Vector(values) => values.clone(),
            ClockView::Matrix(rows) => rows.iter().flatten().copied().collect(),
        }
    }

    /// Returns the vector entries, or `None` for a matrix clock.
    pub fn as_vector(&self) -> Option<&[u64]> {
        match self {
            ClockView::Vector(values) => Some(values),
            ClockView::Matrix(_) => None,
        }
    }

    /// Returns row `index` of a matrix clock.
    pub fn row(&self, index: usize) -> Option<&[u64]> {
        match self {
            ClockView::Vector(_) => None,
            ClockView::Matrix(rows) => rows.get(index).map(|r| r.as_slice()),
        }
    }
}

fn write_row(f: &mut std::fmt::Formatter<'_>, values: &[u64]) -> std::fmt::Result {
    write!(f, "[")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", v)?;
    }
    write!(f, "]")
}

impl std::fmt::Display for ClockView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockView::Vector(values) => write_row(f, values),
            ClockView::Matrix(rows) => {
                write!(f, "[")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write_row(f, row)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Summary of one message copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Send order of the message
    pub id: MessageRef,

    /// Sending participant
    pub from: ProcessId,

    /// Receiving participant
    pub to: ProcessId,

    /// Clock piggybacked at send time
    pub clock: ClockView,

    /// Application payload, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Why a message has not been delivered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingStatus {
    /// Sent, receive event not yet applied
    InTransit,

    /// Arrived, held in the delivery buffer
    AwaitingCausalDelivery,
}

impl std::fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingStatus::InTransit => write!(f, "in transit"),
            PendingStatus::AwaitingCausalDelivery => write!(f, "message pending causal delivery"),
        }
    }
}

/// A message addressed to a participant that it has not delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    #[serde(flatten)]
    pub message: MessageSummary,
    pub status: PendingStatus,
}

/// Per-participant part of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    /// Participant id
    pub id: ProcessId,

    /// Current clock
    pub clock: ClockView,

    /// Messages in transit to or buffered at this participant
    pub pending: Vec<PendingMessage>,

    /// Messages delivered, in delivery order
    pub delivered: Vec<MessageSummary>,

    /// Events this participant took part in
    pub log: Vec<String>,
}

impl ParticipantView {
    /// Returns the messages held in the delivery buffer.
    pub fn buffered(&self) -> impl Iterator<Item = &PendingMessage> {
        self.pending
            .iter()
            .filter(|p| p.status == PendingStatus::AwaitingCausalDelivery)
    }
}

/// The complete read-only state of an engine at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Active clock discipline
    pub discipline: Discipline,

    /// Lifecycle phase
    pub phase: Phase,

    /// Number of script events applied so far
    pub cursor: usize,

    /// Total number of script events
    pub total_steps: usize,

    /// One view per participant, ordered by id
    pub participants: Vec<ParticipantView>,

    /// Global event log, one or more lines per applied step
    pub log: Vec<String>,
}

impl StateSnapshot {
    /// Returns the view of participant `id`.
    pub fn participant(&self, id: ProcessId) -> Option<&ParticipantView> {
        self.participants.get(id.index()).filter(|p| p.id == id)
    }

    /// Returns the clock of participant `id`.
    pub fn clock_of(&self, id: ProcessId) -> Option<&ClockView> {
        self.participant(id).map(|p| &p.clock)
    }

    /// Returns the number of messages held in delivery buffers.
    pub fn buffered_count(&self) -> usize {
        self.participants.iter().map(|p| p.buffered().count()).sum()
    }

    /// Returns the number of messages not yet delivered anywhere.
    pub fn pending_count(&self) -> usize {
        self.participants.iter().map(|p| p.pending.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_view_display() {
        let vector = ClockView::Vector(vec![1, 0, 0]);
        assert_eq!(vector.to_string(), "[1,0,0]");

        let matrix = ClockView::Matrix(vec![vec![1, 0], vec![1, 0]]);
        assert_eq!(matrix.to_string(), "[[1,0],[1,0]]");
    }

    #[test]
    fn test_clock_view_serializes_as_nested_numbers() {
        let matrix = ClockView::Matrix(vec![vec![1, 0], vec![0, 2]]);
        let json = serde_json::to_string(&matrix).unwrap();
        assert_eq!(json, "[[1,0],[0,2]]");

        let back: ClockView = serde_json::from_str(&json).unwrap();
        assert_eq!(back, matrix);

        let vector: ClockView = serde_json::from_str("[3,1]").unwrap();
        assert_eq!(vector, ClockView::Vector(vec![3, 1]));
    }

    #[test]
    fn test_matrix_entries_are_row_major() {
        let matrix = ClockView::Matrix(vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(matrix.entries(), vec![1, 2, 3, 4]);
        assert_eq!(matrix.row(1), Some(&[3, 4][..]));
        assert!(matrix.as_vector().is_none());
    }
}
