//! Event scripts - the declarative input of a simulation run.
//!
//! A script is an ordered list of send and receive events. It is validated
//! once, when an engine is built, so that nothing can go wrong mid-run.
//!
//! # JSON Form
//!
//! ```text
//! [
//!   { "type": "send", "from": 1, "to": [2, 3], "payload": "restock" },
//!   { "type": "receive", "message": 1, "at": 2 },
//!   { "type": "receive", "message": 1, "at": 3 }
//! ]
//! ```
//!
//! Send events are numbered `#1, #2, ...` in order; a receive names the
//! message by that number and the participant it arrives at.

use crate::discipline::strategy;
use causal_env::{Discipline, MessageRef, ProcessId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Largest participant count a script may be validated against.
///
/// A matrix clock holds `n * n` counters per participant.
pub const MAX_PARTICIPANTS: usize = 256;

/// One scripted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScriptEvent {
    /// `from` sends one message to each of `to`
    Send {
        from: ProcessId,
        to: Vec<ProcessId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<String>,
    },

    /// Message `message` arrives at `at`
    Receive { message: MessageRef, at: ProcessId },
}

impl std::fmt::Display for ScriptEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptEvent::Send { from, to, .. } => {
                let targets: Vec<String> = to.iter().map(|t| t.to_string()).collect();
                write!(f, "send {} -> {}", from, targets.join(","))
            }
            ScriptEvent::Receive { message, at } => write!(f, "receive {} at {}", message, at),
        }
    }
}

/// Script validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("A simulation needs at least one participant")]
    NoParticipants,

    #[error("{count} participants exceeds the limit of {max}")]
    TooManyParticipants { count: usize, max: usize },

    #[error("Step {step}: {process} is not a participant (count = {count})")]
    UnknownParticipant {
        step: usize,
        process: ProcessId,
        count: usize,
    },

    #[error("Step {step}: send from {from} has no recipients")]
    NoRecipients { step: usize, from: ProcessId },

    #[error("Step {step}: {from} cannot send to itself")]
    SelfSend { step: usize, from: ProcessId },

    #[error("Step {step}: {to} is listed twice as a recipient")]
    DuplicateRecipient { step: usize, to: ProcessId },

    #[error("Step {step}: {discipline} sends must reach every other participant")]
    NotBroadcast { step: usize, discipline: Discipline },

    #[error("Step {step}: receive of {message} before it was sent")]
    ReceiveBeforeSend { step: usize, message: MessageRef },

    #[error("Step {step}: {at} is not a recipient of {message}")]
    NotARecipient {
        step: usize,
        message: MessageRef,
        at: ProcessId,
    },

    #[error("Step {step}: {message} is received twice at {at}")]
    DuplicateReceive {
        step: usize,
        message: MessageRef,
        at: ProcessId,
    },
}

/// Ordered sequence of script events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventScript {
    events: Vec<ScriptEvent>,
}

impl EventScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<ScriptEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[ScriptEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&ScriptEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of send events.
    pub fn send_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ScriptEvent::Send { .. }))
            .count()
    }

    /// Appends a send event and returns the reference of its message.
    pub fn send(
        &mut self,
        from: ProcessId,
        to: impl IntoIterator<Item = ProcessId>,
        payload: Option<&str>,
    ) -> MessageRef {
        self.events.push(ScriptEvent::Send {
            from,
            to: to.into_iter().collect(),
            payload: payload.map(str::to_string),
        });
        MessageRef(self.send_count() as u32)
    }

    /// Appends a receive event.
    pub fn receive(&mut self, message: MessageRef, at: ProcessId) -> &mut Self {
        self.events.push(ScriptEvent::Receive { message, at });
        self
    }

    /// Checks the script against a discipline and participant count.
    ///
    /// Every receive must name an earlier send and one of its recipients,
    /// at most once. Broadcast disciplines require every send to reach all
    /// other participants.
    pub fn validate(&self, discipline: Discipline, participant_count: usize) -> Result<(), ScriptError> {
        if participant_count == 0 {
            return Err(ScriptError::NoParticipants);
        }
        if participant_count > MAX_PARTICIPANTS {
            return Err(ScriptError::TooManyParticipants {
                count: participant_count,
                max: MAX_PARTICIPANTS,
            });
        }

        let check = |step: usize, process: ProcessId| {
            if process.index() < participant_count {
                Ok(())
            } else {
                Err(ScriptError::UnknownParticipant {
                    step,
                    process,
                    count: participant_count,
                })
            }
        };

        let broadcast = strategy(discipline).requires_broadcast();
        let mut recipients: BTreeMap<MessageRef, BTreeSet<ProcessId>> = BTreeMap::new();
        let mut received: BTreeSet<(MessageRef, ProcessId)> = BTreeSet::new();

        for (i, event) in self.events.iter().enumerate() {
            let step = i + 1;
            match event {
                ScriptEvent::Send { from, to, .. } => {
                    check(step, *from)?;
                    if to.is_empty() {
                        return Err(ScriptError::NoRecipients { step, from: *from });
                    }

                    let mut targets = BTreeSet::new();
                    for target in to {
                        check(step, *target)?;
                        if target == from {
                            return Err(ScriptError::SelfSend { step, from: *from });
                        }
                        if !targets.insert(*target) {
                            return Err(ScriptError::DuplicateRecipient { step, to: *target });
                        }
                    }

                    if broadcast && targets.len() != participant_count - 1 {
                        return Err(ScriptError::NotBroadcast { step, discipline });
                    }

                    let id = MessageRef(recipients.len() as u32 + 1);
                    recipients.insert(id, targets);
                }
                ScriptEvent::Receive { message, at } => {
                    check(step, *at)?;
                    let targets = recipients
                        .get(message)
                        .ok_or(ScriptError::ReceiveBeforeSend {
                            step,
                            message: *message,
                        })?;
                    if !targets.contains(at) {
                        return Err(ScriptError::NotARecipient {
                            step,
                            message: *message,
                            at: *at,
                        });
                    }
                    if !received.insert((*message, *at)) {
                        return Err(ScriptError::DuplicateReceive {
                            step,
                            message: *message,
                            at: *at,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u32) -> ProcessId {
        ProcessId::new(n).unwrap()
    }

    #[test]
    fn test_builder_numbers_sends() {
        let mut script = EventScript::new();
        let m1 = script.send(p(1), [p(2)], None);
        script.receive(m1, p(2));
        let m2 = script.send(p(2), [p(3)], Some("note"));

        assert_eq!(m1, MessageRef(1));
        assert_eq!(m2, MessageRef(2));
        assert_eq!(script.len(), 3);
        assert_eq!(script.send_count(), 2);
    }

    #[test]
    fn test_valid_unicast_script() {
        let mut script = EventScript::new();
        let m1 = script.send(p(1), [p(2)], None);
        script.receive(m1, p(2));

        assert!(script.validate(Discipline::VectorSes, 3).is_ok());
        assert!(script.validate(Discipline::Matrix, 3).is_ok());
    }

    #[test]
    fn test_bss_requires_broadcast() {
        let mut script = EventScript::new();
        script.send(p(1), [p(2)], None);

        assert_eq!(
            script.validate(Discipline::VectorBss, 3),
            Err(ScriptError::NotBroadcast {
                step: 1,
                discipline: Discipline::VectorBss
            })
        );
    }

    #[test]
    fn test_receive_before_send_rejected() {
        let mut script = EventScript::new();
        script.receive(MessageRef(1), p(2));
        script.send(p(1), [p(2)], None);

        assert_eq!(
            script.validate(Discipline::Matrix, 3),
            Err(ScriptError::ReceiveBeforeSend {
                step: 1,
                message: MessageRef(1)
            })
        );
    }

    #[test]
    fn test_receive_at_non_recipient_rejected() {
        let mut script = EventScript::new();
        let m1 = script.send(p(1), [p(2)], None);
        script.receive(m1, p(3));

        assert!(matches!(
            script.validate(Discipline::VectorSes, 3),
            Err(ScriptError::NotARecipient { step: 2, .. })
        ));
    }

    #[test]
    fn test_duplicate_receive_rejected() {
        let mut script = EventScript::new();
        let m1 = script.send(p(1), [p(2)], None);
        script.receive(m1, p(2)).receive(m1, p(2));

        assert!(matches!(
            script.validate(Discipline::Matrix, 2),
            Err(ScriptError::DuplicateReceive { step: 3, .. })
        ));
    }

    #[test]
    fn test_bad_sends_rejected() {
        let mut self_send = EventScript::new();
        self_send.send(p(1), [p(1)], None);
        assert!(matches!(
            self_send.validate(Discipline::Matrix, 2),
            Err(ScriptError::SelfSend { .. })
        ));

        let mut empty = EventScript::new();
        empty.send(p(1), Vec::new(), None);
        assert!(matches!(
            empty.validate(Discipline::Matrix, 2),
            Err(ScriptError::NoRecipients { .. })
        ));

        let mut twice = EventScript::new();
        twice.send(p(1), [p(2), p(2)], None);
        assert!(matches!(
            twice.validate(Discipline::Matrix, 2),
            Err(ScriptError::DuplicateRecipient { .. })
        ));

        let mut outside = EventScript::new();
        outside.send(p(1), [p(4)], None);
        assert!(matches!(
            outside.validate(Discipline::Matrix, 3),
            Err(ScriptError::UnknownParticipant { .. })
        ));
    }

    #[test]
    fn test_zero_participants_rejected() {
        assert_eq!(
            EventScript::new().validate(Discipline::Matrix, 0),
            Err(ScriptError::NoParticipants)
        );
    }

    #[test]
    fn test_participant_count_capped() {
        let mut script = EventScript::new();
        script.send(p(1), [p(2)], None);

        assert!(script.validate(Discipline::Matrix, MAX_PARTICIPANTS).is_ok());
        assert_eq!(
            script.validate(Discipline::Matrix, usize::MAX),
            Err(ScriptError::TooManyParticipants {
                count: usize::MAX,
                max: MAX_PARTICIPANTS,
            })
        );
    }

    #[test]
    fn test_json_form() {
        let json = r#"[
            { "type": "send", "from": 1, "to": [2, 3], "payload": "restock" },
            { "type": "receive", "message": 1, "at": 2 }
        ]"#;
        let script: EventScript = serde_json::from_str(json).unwrap();

        assert_eq!(script.len(), 2);
        assert_eq!(
            script.get(1),
            Some(&ScriptEvent::Receive {
                message: MessageRef(1),
                at: p(2)
            })
        );
        assert_eq!(script.get(0).unwrap().to_string(), "send P1 -> P2,P3");
    }
}
