//! Actor and node identity
//!
//! An [`ActorId`] is assigned once by the hosting runtime when an actor is
//! created and is never handed out again for the lifetime of that runtime
//! instance. Id `0` is reserved for "no actor".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::error::TypeError;

/// Process-unique actor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(u64);

impl ActorId {
    /// The reserved id of the invalid (anonymous) actor
    pub const INVALID: ActorId = ActorId(0);

    /// Wrap a raw id. Fails for the reserved value `0`.
    pub fn new(raw: u64) -> Result<Self, TypeError> {
        if raw == 0 {
            return Err(TypeError::InvalidActorId);
        }
        Ok(Self(raw))
    }

    /// Raw integer value
    pub fn value(self) -> u64 {
        self.0
    }

    /// Whether this is a real actor id
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.0)
    }
}

/// Monotonic id source owned by a runtime instance
#[derive(Debug)]
pub struct ActorIdGenerator {
    next: AtomicU64,
}

impl ActorIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next id. Ids strictly increase and are never reused.
    pub fn next_id(&self) -> ActorId {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        assert!(raw != u64::MAX, "actor id space exhausted");
        ActorId(raw)
    }

    /// Number of ids handed out so far
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for ActorIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a runtime instance, used to qualify remote addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Fresh random node id
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(ActorId::new(0), Err(TypeError::InvalidActorId));
        assert!(!ActorId::INVALID.is_valid());
        assert_eq!(ActorId::new(42).unwrap().value(), 42);
    }

    #[test]
    fn test_generator_is_monotonic() {
        let ids = ActorIdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(a.is_valid());
        assert!(b > a);
        assert_eq!(ids.allocated(), 2);
    }

    #[test]
    fn test_generator_unique_across_threads() {
        let ids = Arc::new(ActorIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..1000).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 4000);
    }

    #[test]
    fn test_node_display() {
        let node = NodeId::random();
        assert!(node.to_string().starts_with("node-"));
        assert_ne!(node, NodeId::random());
    }
}
