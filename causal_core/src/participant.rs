//! Participants - the simulated processes.

use crate::buffer::DeliveryBuffer;
use crate::clock::{Clock, ClockError};
use crate::discipline::{strategy, ClockDiscipline};
use crate::message::{DependencySet, Message};
use causal_env::{Discipline, MessageRef, ParticipantView, PendingMessage, PendingStatus, ProcessId};
use tracing::debug;

/// One simulated process.
///
/// Owns its clock, its delivery buffer and a display log. Only the engine
/// mutates a participant.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Participant id (1-based)
    id: ProcessId,

    /// Active discipline
    discipline: Discipline,

    /// Current clock
    clock: Clock,

    /// SES `V_P`; empty for other disciplines
    dependencies: DependencySet,

    /// Causally early arrivals
    inbox: DeliveryBuffer,

    /// Delivered messages in delivery order
    delivered: Vec<Message>,

    /// Human-readable event log
    log: Vec<String>,
}

impl Participant {
    /// Creates a participant with a zero clock sized for `size` processes.
    pub fn new(id: ProcessId, discipline: Discipline, size: usize) -> Self {
        Self {
            id,
            discipline,
            clock: strategy(discipline).zero_clock(size),
            dependencies: DependencySet::new(),
            inbox: DeliveryBuffer::new(),
            delivered: Vec::new(),
            log: Vec::new(),
        }
    }

    fn rules(&self) -> &'static dyn ClockDiscipline {
        strategy(self.discipline)
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    pub fn inbox(&self) -> &DeliveryBuffer {
        &self.inbox
    }

    pub fn delivered(&self) -> &[Message] {
        &self.delivered
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Performs a send event addressed to `recipients`.
    ///
    /// Advances the own counter, stamps the post-increment clock into one
    /// message copy per recipient and logs the event.
    pub fn send(
        &mut self,
        id: MessageRef,
        recipients: &[ProcessId],
        payload: Option<String>,
    ) -> Result<Vec<Message>, ClockError> {
        let rules = self.rules();
        let stamp = rules.stamp_send(self.id, &self.clock)?;

        let mut messages = Vec::with_capacity(recipients.len());
        for to in recipients {
            // The copy to `to` also depends on its siblings of the same send
            let dependencies = if rules.tracks_dependencies() {
                let timestamp = stamp.as_vector().ok_or(ClockError::KindMismatch)?;
                let mut attached = self.dependencies.clone();
                for sibling in recipients.iter().filter(|q| *q != to) {
                    attached = attached.record(*sibling, timestamp)?;
                }
                attached
            } else {
                DependencySet::new()
            };

            messages.push(Message {
                id,
                from: self.id,
                to: *to,
                clock: stamp.clone(),
                dependencies,
                payload: payload.clone(),
            });
        }

        if rules.tracks_dependencies() {
            let timestamp = stamp.as_vector().ok_or(ClockError::KindMismatch)?;
            for to in recipients {
                self.dependencies = self.dependencies.record(*to, timestamp)?;
            }
        }

        self.clock = stamp;

        let targets: Vec<String> = recipients.iter().map(|r| r.to_string()).collect();
        let suffix = messages.first().map(|m| m.payload_suffix()).unwrap_or_default();
        self.log.push(format!(
            "{} sends to {}, clock={}{}",
            self.id,
            targets.join(", "),
            self.clock,
            suffix
        ));

        Ok(messages)
    }

    /// Handles the arrival of `message`.
    ///
    /// Returns `true` if it was delivered immediately, `false` if it is now
    /// held in the inbox pending causal delivery.
    pub fn receive(&mut self, message: Message) -> Result<bool, ClockError> {
        if self.rules().is_deliverable(self, &message) {
            self.deliver(message, false)?;
            return Ok(true);
        }

        self.log.push(format!(
            "{} buffers {} from {}, clock={} (message pending causal delivery)",
            self.id, message.id, message.from, self.clock
        ));
        self.inbox.hold(message);
        Ok(false)
    }

    /// Delivers every buffered message that has become deliverable.
    ///
    /// One release can unlock another, so this loops until no held message
    /// passes the discipline's test. Returns the released messages in
    /// delivery order.
    pub fn drain_inbox(&mut self) -> Result<Vec<Message>, ClockError> {
        let mut released = Vec::new();
        loop {
            let rules = self.rules();
            let position = self
                .inbox
                .iter()
                .position(|m| rules.is_deliverable(self, m));

            let Some(message) = position.and_then(|i| self.inbox.take(i)) else {
                break;
            };

            released.push(message.clone());
            self.deliver(message, true)?;
        }
        Ok(released)
    }

    fn deliver(&mut self, message: Message, from_buffer: bool) -> Result<(), ClockError> {
        let rules = self.rules();
        self.clock = rules.merge_on_delivery(self.id, &self.clock, &message)?;

        if rules.tracks_dependencies() {
            self.dependencies = self.dependencies.merge(&message.dependencies, self.id)?;
        }

        if from_buffer {
            debug!(
                participant = %self.id,
                message = %message.id,
                clock = %self.clock,
                "released buffered message"
            );
            self.log.push(format!(
                "{} delivers buffered {} from {}, clock={}{}",
                self.id,
                message.id,
                message.from,
                self.clock,
                message.payload_suffix()
            ));
        } else {
            self.log.push(format!(
                "{} receives from {}, clock={}{}",
                self.id,
                message.from,
                self.clock,
                message.payload_suffix()
            ));
        }

        self.delivered.push(message);
        Ok(())
    }

    /// Builds the snapshot view. `in_transit` lists messages addressed to
    /// this participant that have not arrived yet.
    pub fn view<'a>(&self, in_transit: impl Iterator<Item = &'a Message>) -> ParticipantView {
        let mut pending: Vec<PendingMessage> = in_transit
            .map(|m| PendingMessage {
                message: m.summary(),
                status: PendingStatus::InTransit,
            })
            .collect();
        pending.extend(self.inbox.iter().map(|m| PendingMessage {
            message: m.summary(),
            status: PendingStatus::AwaitingCausalDelivery,
        }));

        ParticipantView {
            id: self.id,
            clock: self.clock.view(),
            pending,
            delivered: self.delivered.iter().map(Message::summary).collect(),
            log: self.log.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u32) -> ProcessId {
        ProcessId::new(n).unwrap()
    }

    fn cast(n: usize, discipline: Discipline) -> Vec<Participant> {
        ProcessId::range(n)
            .map(|id| Participant::new(id, discipline, n))
            .collect()
    }

    #[test]
    fn test_new_participant_has_zero_clock() {
        let participant = Participant::new(p(2), Discipline::Matrix, 3);
        assert_eq!(participant.clock().to_string(), "[[0,0,0],[0,0,0],[0,0,0]]");
        assert!(participant.inbox().is_empty());
        assert!(participant.log().is_empty());
    }

    #[test]
    fn test_send_stamps_post_increment_clock() {
        let mut procs = cast(3, Discipline::VectorBss);
        let messages = procs[0].send(MessageRef(1), &[p(2), p(3)], None).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].clock.to_string(), "[1,0,0]");
        assert_eq!(messages[1].to, p(3));
        assert_eq!(procs[0].log()[0], "P1 sends to P2, P3, clock=[1,0,0]");
    }

    #[test]
    fn test_bss_receive_in_order_delivers() {
        let mut procs = cast(3, Discipline::VectorBss);
        let messages = procs[0].send(MessageRef(1), &[p(2), p(3)], None).unwrap();

        assert!(procs[1].receive(messages[0].clone()).unwrap());
        assert_eq!(procs[1].clock().to_string(), "[1,0,0]");
        assert_eq!(procs[1].log()[0], "P2 receives from P1, clock=[1,0,0]");
    }

    #[test]
    fn test_bss_early_message_is_buffered_then_released() {
        let mut procs = cast(3, Discipline::VectorBss);
        let from_p1 = procs[0].send(MessageRef(1), &[p(2), p(3)], None).unwrap();
        procs[1].receive(from_p1[0].clone()).unwrap();
        let from_p2 = procs[1].send(MessageRef(2), &[p(1), p(3)], None).unwrap();

        // P3 sees P2's broadcast first: it depends on P1's, so it waits
        assert!(!procs[2].receive(from_p2[1].clone()).unwrap());
        assert_eq!(procs[2].inbox().len(), 1);
        assert_eq!(procs[2].clock().to_string(), "[0,0,0]");
        assert!(procs[2].drain_inbox().unwrap().is_empty());

        assert!(procs[2].receive(from_p1[1].clone()).unwrap());
        let released = procs[2].drain_inbox().unwrap();

        assert_eq!(released.len(), 1);
        assert_eq!(released[0].id, MessageRef(2));
        assert!(procs[2].inbox().is_empty());
        assert_eq!(procs[2].clock().to_string(), "[1,1,0]");
        assert_eq!(
            procs[2].delivered().iter().map(|m| m.id.0).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_ses_receiver_increments() {
        let mut procs = cast(3, Discipline::VectorSes);
        let messages = procs[0].send(MessageRef(1), &[p(2)], None).unwrap();
        assert_eq!(messages[0].clock.to_string(), "[1,0,0]");

        assert!(procs[1].receive(messages[0].clone()).unwrap());
        assert_eq!(procs[1].clock().to_string(), "[1,1,0]");
    }

    #[test]
    fn test_ses_send_records_dependency() {
        let mut procs = cast(3, Discipline::VectorSes);
        let first = procs[0].send(MessageRef(1), &[p(3)], None).unwrap();
        let second = procs[0].send(MessageRef(2), &[p(2)], None).unwrap();

        assert!(first[0].dependencies.is_empty());
        assert_eq!(second[0].dependencies.get(p(3)).unwrap().entries(), &[1, 0, 0]);
        assert_eq!(procs[0].dependencies().len(), 2);
    }

    #[test]
    fn test_ses_multicast_copies_carry_siblings() {
        let mut procs = cast(3, Discipline::VectorSes);
        let messages = procs[1].send(MessageRef(1), &[p(1), p(3)], None).unwrap();

        let to_p1 = &messages[0].dependencies;
        assert!(to_p1.get(p(1)).is_none());
        assert_eq!(to_p1.get(p(3)).unwrap().entries(), &[0, 1, 0]);

        let to_p3 = &messages[1].dependencies;
        assert!(to_p3.get(p(3)).is_none());
        assert_eq!(to_p3.get(p(1)).unwrap().entries(), &[0, 1, 0]);

        assert_eq!(procs[1].dependencies().len(), 2);
    }

    #[test]
    fn test_matrix_receive_folds_sender_row() {
        let mut procs = cast(3, Discipline::Matrix);
        let messages = procs[0]
            .send(MessageRef(1), &[p(2)], Some("restock".to_string()))
            .unwrap();
        assert_eq!(messages[0].clock.to_string(), "[[1,0,0],[0,0,0],[0,0,0]]");

        assert!(procs[1].receive(messages[0].clone()).unwrap());
        assert_eq!(procs[1].clock().to_string(), "[[1,0,0],[1,0,0],[0,0,0]]");
        assert!(procs[1].log()[0].ends_with("\"restock\""));
    }

    #[test]
    fn test_view_lists_in_transit_and_buffered() {
        let mut procs = cast(3, Discipline::VectorBss);
        let from_p1 = procs[0].send(MessageRef(1), &[p(2), p(3)], None).unwrap();
        procs[1].receive(from_p1[0].clone()).unwrap();
        let from_p2 = procs[1].send(MessageRef(2), &[p(1), p(3)], None).unwrap();
        procs[2].receive(from_p2[1].clone()).unwrap();

        let view = procs[2].view(std::iter::once(&from_p1[1]));

        assert_eq!(view.pending.len(), 2);
        assert_eq!(view.pending[0].status, PendingStatus::InTransit);
        assert_eq!(view.pending[1].status, PendingStatus::AwaitingCausalDelivery);
        assert_eq!(view.buffered().count(), 1);
    }
}
