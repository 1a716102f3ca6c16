//! Messages exchanged between participants.

use crate::clock::{Clock, ClockError, VectorClock};
use causal_env::{MessageRef, MessageSummary, ProcessId};
use std::collections::BTreeMap;

/// Latest known timestamp of a message sent to each destination.
///
/// This is the `V_P` / `V_M` bookkeeping of the Schiper-Eggli-Sandoz
/// protocol. A pair `(Pj, t)` means "a message stamped `t` was sent to
/// `Pj`, so `Pj` must not deliver anything depending on it before its clock
/// reaches `t`". Other disciplines leave the set empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    entries: BTreeMap<ProcessId, VectorClock>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded timestamp for `destination`.
    pub fn get(&self, destination: ProcessId) -> Option<&VectorClock> {
        self.entries.get(&destination)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates `(destination, timestamp)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProcessId, &VectorClock)> {
        self.entries.iter()
    }

    /// Returns a copy with `(destination, timestamp)` folded in.
    ///
    /// An existing entry is merged element-wise, so the set never forgets a
    /// dependency.
    pub fn record(&self, destination: ProcessId, timestamp: &VectorClock) -> Result<Self, ClockError> {
        let mut entries = self.entries.clone();
        let merged = match entries.get(&destination) {
            Some(existing) => existing.merge(timestamp)?,
            None => timestamp.clone(),
        };
        entries.insert(destination, merged);
        Ok(Self { entries })
    }

    /// Returns the union of both sets, merging shared destinations and
    /// leaving out `exclude` (the holder itself).
    pub fn merge(&self, other: &DependencySet, exclude: ProcessId) -> Result<Self, ClockError> {
        let mut merged = self.clone();
        for (destination, timestamp) in other.iter() {
            if *destination != exclude {
                merged = merged.record(*destination, timestamp)?;
            }
        }
        merged.entries.remove(&exclude);
        Ok(merged)
    }
}

/// A message copy addressed to one receiver.
///
/// Created by a send event and never modified afterwards. A broadcast
/// produces one copy per recipient, all sharing `id` and `clock`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Send order of the producing send event
    pub id: MessageRef,

    /// Sender
    pub from: ProcessId,

    /// Receiver
    pub to: ProcessId,

    /// Sender's clock right after the send increment
    pub clock: Clock,

    /// Sender's dependency set before the send, plus the other recipients
    /// of the same send (SES only)
    pub dependencies: DependencySet,

    /// Application payload
    pub payload: Option<String>,
}

impl Message {
    /// Returns the boundary summary of this message.
    pub fn summary(&self) -> MessageSummary {
        MessageSummary {
            id: self.id,
            from: self.from,
            to: self.to,
            clock: self.clock.view(),
            payload: self.payload.clone(),
        }
    }

    /// Formats the payload suffix used in log lines.
    pub(crate) fn payload_suffix(&self) -> String {
        match &self.payload {
            Some(text) => format!(" \"{}\"", text),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u32) -> ProcessId {
        ProcessId::new(n).unwrap()
    }

    #[test]
    fn test_record_merges_existing_entry() {
        let set = DependencySet::new()
            .record(p(3), &VectorClock::from_entries(vec![1, 0, 0]))
            .unwrap()
            .record(p(3), &VectorClock::from_entries(vec![0, 2, 0]))
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(p(3)).unwrap().entries(), &[1, 2, 0]);
    }

    #[test]
    fn test_merge_excludes_holder() {
        let mine = DependencySet::new()
            .record(p(1), &VectorClock::from_entries(vec![0, 1, 0]))
            .unwrap();
        let theirs = DependencySet::new()
            .record(p(2), &VectorClock::from_entries(vec![1, 0, 0]))
            .unwrap()
            .record(p(3), &VectorClock::from_entries(vec![2, 0, 0]))
            .unwrap();

        let merged = mine.merge(&theirs, p(2)).unwrap();

        assert!(merged.get(p(2)).is_none());
        assert_eq!(merged.get(p(1)).unwrap().entries(), &[0, 1, 0]);
        assert_eq!(merged.get(p(3)).unwrap().entries(), &[2, 0, 0]);
    }

    #[test]
    fn test_summary_carries_clock_view() {
        let message = Message {
            id: MessageRef(1),
            from: p(1),
            to: p(2),
            clock: Clock::Vector(VectorClock::from_entries(vec![1, 0, 0])),
            dependencies: DependencySet::new(),
            payload: Some("restock".to_string()),
        };

        let summary = message.summary();
        assert_eq!(summary.clock.to_string(), "[1,0,0]");
        assert_eq!(summary.payload.as_deref(), Some("restock"));
        assert_eq!(message.payload_suffix(), " \"restock\"");
    }
}
