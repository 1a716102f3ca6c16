//! The causal engine - steps a script against a cast of participants.
//!
//! # State Machine
//!
//! ```text
//!            step()              step() (cursor == len)
//! Initial ───────────► Running ──────────────────────► Completed
//!    ▲                    │                                │
//!    └──── reset() ───────┴────────────── reset() ─────────┘
//! ```
//!
//! Each `step()` applies exactly one script event. After any clock mutation
//! the touched participant's inbox is drained, so messages unlocked by that
//! event are delivered within the same step.

use crate::clock::ClockError;
use crate::message::Message;
use crate::participant::Participant;
use crate::script::{EventScript, ScriptError, ScriptEvent};
use causal_env::{Discipline, MessageRef, Phase, ProcessId, SimulationDriver, StateSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Configuration of one simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Clock discipline to run
    pub discipline: Discipline,

    /// Number of participants (`P1..=Pn`)
    pub participant_count: usize,

    /// Events to apply
    pub script: EventScript,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            discipline: Discipline::VectorBss,
            participant_count: 3,
            script: EventScript::new(),
        }
    }
}

impl EngineConfig {
    pub fn new(discipline: Discipline, participant_count: usize, script: EventScript) -> Self {
        Self {
            discipline,
            participant_count,
            script,
        }
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid script: {0}")]
    InvalidScript(#[from] ScriptError),

    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("{message} to {at} is not in transit")]
    NotInTransit { message: MessageRef, at: ProcessId },
}

/// Runs one script under one discipline.
pub struct CausalEngine {
    /// Immutable run configuration
    config: EngineConfig,

    /// Participants, index = `ProcessId::index()`
    participants: Vec<Participant>,

    /// Sent but not yet arrived, keyed by (message, receiver)
    in_transit: BTreeMap<(MessageRef, ProcessId), Message>,

    /// Reference for the next send
    next_message: u32,

    /// Number of script events applied
    cursor: usize,

    /// Lifecycle phase
    phase: Phase,

    /// Global log of applied events
    log: Vec<String>,
}

impl CausalEngine {
    /// Validates the script and builds an engine in the `Initial` phase.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config
            .script
            .validate(config.discipline, config.participant_count)?;

        debug!(
            discipline = %config.discipline,
            participants = config.participant_count,
            steps = config.script.len(),
            "engine created"
        );

        let participants = Self::fresh_participants(&config);
        Ok(Self {
            config,
            participants,
            in_transit: BTreeMap::new(),
            next_message: 1,
            cursor: 0,
            phase: Phase::Initial,
            log: Vec::new(),
        })
    }

    fn fresh_participants(config: &EngineConfig) -> Vec<Participant> {
        ProcessId::range(config.participant_count)
            .map(|id| Participant::new(id, config.discipline, config.participant_count))
            .collect()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn discipline(&self) -> Discipline {
        self.config.discipline
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: ProcessId) -> Option<&Participant> {
        self.participants.get(id.index())
    }

    /// Returns the copy of `message` still travelling to `at`.
    pub fn message_in_transit(&self, message: MessageRef, at: ProcessId) -> Option<&Message> {
        self.in_transit.get(&(message, at))
    }

    /// Returns the next event to be applied.
    pub fn next_event(&self) -> Option<&ScriptEvent> {
        self.config.script.get(self.cursor)
    }

    /// Steps until the script is exhausted. Returns every snapshot produced,
    /// starting with the current one.
    pub fn run_to_completion(&mut self) -> Result<Vec<StateSnapshot>, EngineError> {
        let mut snapshots = vec![self.current_snapshot()];
        while !self.is_complete() {
            snapshots.push(self.step()?);
        }
        Ok(snapshots)
    }

    fn participant_mut(&mut self, id: ProcessId) -> Result<&mut Participant, EngineError> {
        let count = self.participants.len();
        self.participants
            .get_mut(id.index())
            .ok_or(EngineError::InvalidScript(ScriptError::UnknownParticipant {
                step: self.cursor + 1,
                process: id,
                count,
            }))
    }

    fn apply(&mut self, event: ScriptEvent) -> Result<(), EngineError> {
        match event {
            ScriptEvent::Send { from, to, payload } => {
                let id = MessageRef(self.next_message);
                self.next_message += 1;

                let messages = self.participant_mut(from)?.send(id, &to, payload)?;
                for message in messages {
                    self.in_transit.insert((message.id, message.to), message);
                }
                self.drain(from)?;
            }
            ScriptEvent::Receive { message, at } => {
                let arrived = self
                    .in_transit
                    .remove(&(message, at))
                    .ok_or(EngineError::NotInTransit { message, at })?;

                if self.participant_mut(at)?.receive(arrived)? {
                    self.drain(at)?;
                } else {
                    debug!(%message, %at, "arrival blocked, pending causal delivery");
                }
            }
        }
        Ok(())
    }

    fn drain(&mut self, id: ProcessId) -> Result<(), EngineError> {
        let released = self.participant_mut(id)?.drain_inbox()?;
        if !released.is_empty() {
            debug!(participant = %id, count = released.len(), "drained inbox");
        }
        Ok(())
    }
}

impl SimulationDriver for CausalEngine {
    type Error = EngineError;

    fn step(&mut self) -> Result<StateSnapshot, EngineError> {
        if self.phase == Phase::Completed {
            return Ok(self.current_snapshot());
        }

        if let Some(event) = self.next_event().cloned() {
            trace!(step = self.cursor + 1, %event, "applying event");

            let marks: Vec<usize> = self.participants.iter().map(|p| p.log().len()).collect();
            self.apply(event)?;
            for (participant, mark) in self.participants.iter().zip(marks) {
                self.log.extend(participant.log()[mark..].iter().cloned());
            }

            self.cursor += 1;
        }

        self.phase = if self.cursor >= self.config.script.len() {
            Phase::Completed
        } else {
            Phase::Running
        };

        Ok(self.current_snapshot())
    }

    fn reset(&mut self) -> StateSnapshot {
        self.participants = Self::fresh_participants(&self.config);
        self.in_transit.clear();
        self.next_message = 1;
        self.cursor = 0;
        self.phase = Phase::Initial;
        self.log.clear();
        self.current_snapshot()
    }

    fn current_snapshot(&self) -> StateSnapshot {
        let participants = self
            .participants
            .iter()
            .map(|p| {
                let id = p.id();
                p.view(self.in_transit.values().filter(move |m| m.to == id))
            })
            .collect();

        StateSnapshot {
            discipline: self.config.discipline,
            phase: self.phase,
            cursor: self.cursor,
            total_steps: self.config.script.len(),
            participants,
            log: self.log.clone(),
        }
    }

    fn is_complete(&self) -> bool {
        self.cursor >= self.config.script.len()
    }
}
