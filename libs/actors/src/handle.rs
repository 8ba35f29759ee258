//! Strong and weak actor handles
//!
//! - [`ActorRef`] owns a share of the control block and keeps the actor alive
//! - [`ActorAddr`] observes the actor without extending its lifetime; it can
//!   be upgraded back to an `ActorRef` only while some strong handle exists
//!
//! A remote address (an id qualified by another node) has no local control
//! block at all and never upgrades.

use actor_types::{ActorId, ExitReason, NodeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::control::{AbstractActor, ControlBlock};

/// Strong, reference-counted actor handle
#[derive(Clone)]
pub struct ActorRef {
    block: Arc<ControlBlock>,
}

impl ActorRef {
    /// Wrap an actor object in a fresh control block
    pub fn new(id: ActorId, node: NodeId, actor: Arc<dyn AbstractActor>) -> Self {
        Self {
            block: Arc::new(ControlBlock::new(id, node, actor)),
        }
    }

    pub fn id(&self) -> ActorId {
        self.block.id()
    }

    pub fn node(&self) -> NodeId {
        self.block.node()
    }

    /// Weak address of this actor
    pub fn address(&self) -> ActorAddr {
        ActorAddr {
            id: self.block.id(),
            node: self.block.node(),
            block: Some(Arc::downgrade(&self.block)),
        }
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.block.actor().exit_reason()
    }

    /// Number of strong handles currently sharing the control block
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.block)
    }

    pub fn control_block(&self) -> &ControlBlock {
        &self.block
    }

    /// Whether both handles point at the same control block
    pub fn ptr_eq(&self, other: &ActorRef) -> bool {
        Arc::ptr_eq(&self.block, &other.block)
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ActorRef {}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id())
            .field("node", &self.node())
            .finish()
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id(), self.node())
    }
}

/// Weak, non-owning actor address
#[derive(Clone)]
pub struct ActorAddr {
    id: ActorId,
    node: NodeId,
    block: Option<Weak<ControlBlock>>,
}

impl ActorAddr {
    /// Address of an actor living on another node
    pub fn remote(id: ActorId, node: NodeId) -> Self {
        Self {
            id,
            node,
            block: None,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn is_remote(&self) -> bool {
        self.block.is_none()
    }

    /// Strong handle, if the actor is local and still referenced
    pub fn upgrade(&self) -> Option<ActorRef> {
        self.block
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|block| ActorRef { block })
    }

    pub fn is_alive(&self) -> bool {
        self.block
            .as_ref()
            .map_or(false, |block| block.strong_count() > 0)
    }
}

impl PartialEq for ActorAddr {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.node == other.node
    }
}

impl Eq for ActorAddr {}

impl Hash for ActorAddr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.node.hash(state);
    }
}

impl fmt::Debug for ActorAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorAddr")
            .field("id", &self.id)
            .field("node", &self.node)
            .field("remote", &self.is_remote())
            .finish()
    }
}

impl fmt::Display for ActorAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.node)
    }
}

impl From<&ActorRef> for ActorAddr {
    fn from(actor: &ActorRef) -> Self {
        actor.address()
    }
}
