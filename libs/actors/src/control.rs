//! Actor control blocks
//!
//! The [`ControlBlock`] is the shared state behind every strong handle. It is
//! owned jointly by all [`ActorRef`](crate::ActorRef)s pointing at the actor;
//! the last one to go away releases the actor object.

use actor_types::{ActorId, ExitReason, Message, MessageId, NodeId};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::handle::ActorAddr;

/// Contract the hosting runtime's actor objects fulfil
///
/// `enqueue` must be callable from any thread and must never block on the
/// receiver doing work; it either stores the envelope or drops it.
pub trait AbstractActor: Send + Sync {
    /// Store one envelope in the actor's mailbox
    fn enqueue(
        &self,
        sender: Option<ActorAddr>,
        mid: MessageId,
        msg: Message,
        ctx: Option<&ForwardingContext>,
    );

    /// Reason the actor terminated with, `None` while it is alive
    fn exit_reason(&self) -> Option<ExitReason>;

    /// Called once when the last strong handle is released
    fn on_release(&self) {}
}

/// Where a forwarded envelope came from
#[derive(Debug, Clone, Default)]
pub struct ForwardingContext {
    /// Node the envelope arrived from, `None` for local sends
    pub origin: Option<NodeId>,
    /// Actors the envelope passed through before reaching this mailbox
    pub hops: Vec<ActorAddr>,
}

impl ForwardingContext {
    pub fn from_node(origin: NodeId) -> Self {
        Self {
            origin: Some(origin),
            hops: Vec::new(),
        }
    }
}

/// Shared state of one actor
pub struct ControlBlock {
    id: ActorId,
    node: NodeId,
    actor: Arc<dyn AbstractActor>,
}

impl ControlBlock {
    pub(crate) fn new(id: ActorId, node: NodeId, actor: Arc<dyn AbstractActor>) -> Self {
        Self { id, node, actor }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn actor(&self) -> &dyn AbstractActor {
        self.actor.as_ref()
    }
}

impl fmt::Debug for ControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlBlock")
            .field("id", &self.id)
            .field("node", &self.node)
            .field("exit_reason", &self.actor.exit_reason())
            .finish()
    }
}

impl Drop for ControlBlock {
    fn drop(&mut self) {
        trace!(actor_id = %self.id, "Releasing actor control block");
        self.actor.on_release();
    }
}
