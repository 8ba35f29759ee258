//! Priority mailbox and the reference local actor
//!
//! ## Ordering
//!
//! - Envelopes of the same priority class leave the mailbox in arrival order
//! - A high-priority envelope is placed ahead of every normal-priority envelope
//!   still waiting at the moment it arrives; it never preempts one that was
//!   already dequeued
//!
//! ## Capacity
//!
//! A full mailbox drops incoming normal-priority envelopes (at-most-once
//! delivery). High-priority envelopes are always admitted so that exit
//! requests cannot be starved out by a flood of regular traffic.

use actor_types::{ActorId, ActorIdGenerator, ExitReason, Message, MessageId, NodeId};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::control::{AbstractActor, ForwardingContext};
use crate::handle::{ActorAddr, ActorRef};
use crate::messages::Envelope;

#[derive(Debug, Default)]
struct Queues {
    high: VecDeque<Envelope>,
    normal: VecDeque<Envelope>,
    closed: bool,
}

impl Queues {
    fn len(&self) -> usize {
        self.high.len() + self.normal.len()
    }

    fn pop(&mut self) -> Option<Envelope> {
        self.high.pop_front().or_else(|| self.normal.pop_front())
    }
}

/// Two-class FIFO mailbox with blocking receive
#[derive(Debug)]
pub struct Mailbox {
    queues: Mutex<Queues>,
    ready: Condvar,
    capacity: usize,
    dropped: AtomicU64,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: Mutex::new(Queues::default()),
            ready: Condvar::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Store an envelope. Returns `false` if it was dropped.
    pub fn push(&self, envelope: Envelope) -> bool {
        let mut queues = self.queues.lock();
        if queues.closed {
            drop(queues);
            self.record_drop("mailbox closed");
            return false;
        }

        if envelope.mid.is_high_priority() {
            queues.high.push_back(envelope);
        } else if queues.len() >= self.capacity {
            drop(queues);
            self.record_drop("mailbox full");
            return false;
        } else {
            queues.normal.push_back(envelope);
        }

        drop(queues);
        self.ready.notify_one();
        true
    }

    /// Next envelope without blocking
    pub fn try_pop(&self) -> Option<Envelope> {
        self.queues.lock().pop()
    }

    /// Next envelope, waiting up to `timeout` for one to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Envelope> {
        let deadline = Instant::now() + timeout;
        let mut queues = self.queues.lock();
        loop {
            if let Some(envelope) = queues.pop() {
                return Some(envelope);
            }
            if queues.closed {
                return None;
            }
            if self.ready.wait_until(&mut queues, deadline).timed_out() {
                return queues.pop();
            }
        }
    }

    /// Reject all further envelopes and discard pending ones.
    /// Returns how many pending envelopes were discarded.
    pub fn close(&self) -> usize {
        let discarded = {
            let mut queues = self.queues.lock();
            if queues.closed {
                return 0;
            }
            queues.closed = true;
            let pending = queues.len();
            queues.high.clear();
            queues.normal.clear();
            pending
        };
        self.dropped.fetch_add(discarded as u64, Ordering::Relaxed);
        self.ready.notify_all();
        discarded
    }

    pub fn len(&self) -> usize {
        self.queues.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.queues.lock().closed
    }

    /// Envelopes dropped because the mailbox was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self, cause: &'static str) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        trace!(cause, "Dropping envelope");
    }
}

/// Reference actor: a mailbox plus exit bookkeeping
///
/// Behavior execution is left to whoever drains the mailbox; receiving an
/// exit request terminates the actor and closes its mailbox.
#[derive(Debug)]
pub struct LocalActor {
    id: ActorId,
    mailbox: Mailbox,
    exit: Mutex<Option<ExitReason>>,
}

impl LocalActor {
    pub fn new(id: ActorId, capacity: usize) -> Self {
        Self {
            id,
            mailbox: Mailbox::new(capacity),
            exit: Mutex::new(None),
        }
    }

    /// Allocate an id, create the actor and its first strong handle
    pub fn spawn(
        ids: &ActorIdGenerator,
        node: NodeId,
        capacity: usize,
    ) -> (ActorRef, Arc<LocalActor>) {
        let id = ids.next_id();
        let actor = Arc::new(LocalActor::new(id, capacity));
        let handle = ActorRef::new(id, node, Arc::clone(&actor) as Arc<dyn AbstractActor>);
        debug!(actor_id = %id, node = %node, capacity, "Spawned local actor");
        (handle, actor)
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Next envelope without blocking
    pub fn try_receive(&self) -> Option<Envelope> {
        self.mailbox.try_pop().map(|env| self.observe(env))
    }

    /// Next envelope, waiting up to `timeout`
    pub fn receive(&self, timeout: Duration) -> Option<Envelope> {
        self.mailbox.pop_timeout(timeout).map(|env| self.observe(env))
    }

    /// Terminate with `reason`. The first reason recorded wins.
    pub fn terminate(&self, reason: ExitReason) {
        {
            let mut exit = self.exit.lock();
            if exit.is_some() {
                return;
            }
            *exit = Some(reason);
        }
        let discarded = self.mailbox.close();
        debug!(actor_id = %self.id, %reason, discarded, "Local actor terminated");
    }

    fn observe(&self, envelope: Envelope) -> Envelope {
        if let Some(exit) = envelope.exit_request() {
            self.terminate(exit.reason);
        }
        envelope
    }
}

impl AbstractActor for LocalActor {
    fn enqueue(
        &self,
        sender: Option<ActorAddr>,
        mid: MessageId,
        msg: Message,
        ctx: Option<&ForwardingContext>,
    ) {
        self.mailbox.push(Envelope::new(sender, mid, msg, ctx));
    }

    fn exit_reason(&self) -> Option<ExitReason> {
        *self.exit.lock()
    }

    fn on_release(&self) {
        let discarded = self.mailbox.close();
        if discarded > 0 {
            debug!(actor_id = %self.id, discarded, "Released actor with pending envelopes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_types::{ExitMsg, IntoMessage};
    use std::thread;

    fn envelope(seq: i64, high: bool) -> Envelope {
        let mid = if high {
            MessageId::make().with_high_priority()
        } else {
            MessageId::make()
        };
        Envelope::new(None, mid, seq.into_message(), None)
    }

    fn seq(env: &Envelope) -> i64 {
        env.message.i64_at(0).unwrap()
    }

    #[test]
    fn test_fifo_within_priority_class() {
        let mailbox = Mailbox::unbounded();
        for i in 1..=3 {
            assert!(mailbox.push(envelope(i, false)));
        }
        let order: Vec<_> = std::iter::from_fn(|| mailbox.try_pop()).map(|e| seq(&e)).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_high_priority_jumps_waiting_normal() {
        let mailbox = Mailbox::unbounded();
        mailbox.push(envelope(1, false));
        mailbox.push(envelope(2, false));
        mailbox.push(envelope(10, true));
        mailbox.push(envelope(11, true));

        let order: Vec<_> = std::iter::from_fn(|| mailbox.try_pop()).map(|e| seq(&e)).collect();
        assert_eq!(order, vec![10, 11, 1, 2]);
    }

    #[test]
    fn test_high_priority_does_not_preempt_dequeued() {
        let mailbox = Mailbox::unbounded();
        mailbox.push(envelope(1, false));
        mailbox.push(envelope(2, false));
        let in_progress = mailbox.try_pop().unwrap();
        mailbox.push(envelope(10, true));

        assert_eq!(seq(&in_progress), 1);
        assert_eq!(seq(&mailbox.try_pop().unwrap()), 10);
        assert_eq!(seq(&mailbox.try_pop().unwrap()), 2);
    }

    #[test]
    fn test_full_mailbox_drops_normal_but_admits_high() {
        let mailbox = Mailbox::new(1);
        assert!(mailbox.push(envelope(1, false)));
        assert!(!mailbox.push(envelope(2, false)));
        assert!(mailbox.push(envelope(3, true)));
        assert_eq!(mailbox.len(), 2);
        assert_eq!(mailbox.dropped(), 1);
    }

    #[test]
    fn test_closed_mailbox_rejects() {
        let mailbox = Mailbox::unbounded();
        mailbox.push(envelope(1, false));
        assert_eq!(mailbox.close(), 1);
        assert_eq!(mailbox.close(), 0);
        assert!(!mailbox.push(envelope(2, true)));
        assert!(mailbox.is_closed());
        assert_eq!(mailbox.dropped(), 2);
        assert!(mailbox.pop_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_pop_timeout_wakes_on_push() {
        let mailbox = Arc::new(Mailbox::unbounded());
        let producer = {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                mailbox.push(envelope(7, false));
            })
        };
        let received = mailbox.pop_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(seq(&received), 7);
        producer.join().unwrap();
    }

    #[test]
    fn test_exit_request_terminates_local_actor() {
        let ids = ActorIdGenerator::new();
        let (actor, local) = LocalActor::spawn(&ids, NodeId::random(), 16);
        local.enqueue(
            None,
            MessageId::make().with_high_priority(),
            ExitMsg::anonymous(ExitReason::UserShutdown).into_message(),
            None,
        );
        local.enqueue(None, MessageId::make(), 1_i64.into_message(), None);
        assert!(actor.exit_reason().is_none());

        let env = local.try_receive().unwrap();
        assert!(env.exit_request().is_some());
        assert_eq!(actor.exit_reason(), Some(ExitReason::UserShutdown));
        assert!(local.mailbox().is_closed());
        assert!(local.try_receive().is_none());
    }

    #[test]
    fn test_last_release_closes_mailbox() {
        let ids = ActorIdGenerator::new();
        let (actor, local) = LocalActor::spawn(&ids, NodeId::random(), 16);
        local.enqueue(None, MessageId::make(), 1_i64.into_message(), None);
        drop(actor);
        assert!(local.mailbox().is_closed());
        assert_eq!(local.mailbox().dropped(), 1);
    }
}
