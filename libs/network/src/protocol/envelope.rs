//! Wire envelope
//!
//! One frame carries exactly one envelope, encoded with bincode. The
//! receiver is addressed either by id or by registered name and resolved
//! on the receiving node.

use actor_types::{ActorId, Message, MessageId, NodeId};
use serde::{Deserialize, Serialize};

use crate::{Result, TransportError};

/// Actor address as it travels between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireAddr {
    pub id: ActorId,
    pub node: NodeId,
}

/// How the receiving node should find the destination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireTarget {
    Id(ActorId),
    Name(String),
}

/// Network message envelope for wire protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Node that put the envelope on the wire
    pub origin: NodeId,
    /// `None` for anonymous sends
    pub sender: Option<WireAddr>,
    pub receiver: WireTarget,
    /// Carries the priority bit across the wire
    pub mid: MessageId,
    pub message: Message,
}

impl WireEnvelope {
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| TransportError::serialization_with_source("Failed to encode envelope", e))
    }

    /// Decode one frame; malformed input is a protocol violation
    pub fn decode(frame: &[u8]) -> Result<Self> {
        bincode::deserialize(frame)
            .map_err(|e| TransportError::protocol_with_source("Failed to decode envelope", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_types::{IntoMessage, Priority};

    #[test]
    fn test_named_envelope_keeps_priority() {
        let origin = NodeId::random();
        let envelope = WireEnvelope {
            origin,
            sender: Some(WireAddr {
                id: ActorId::new(9).unwrap(),
                node: origin,
            }),
            receiver: WireTarget::Name("logger".into()),
            mid: MessageId::make().with_priority(Priority::High),
            message: ("line", 3_i64).into_message(),
        };

        let decoded = WireEnvelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
        assert!(decoded.mid.is_high_priority());
    }

    #[test]
    fn test_garbage_is_a_protocol_error() {
        let err = WireEnvelope::decode(&[0xff; 3]).unwrap_err();
        assert_eq!(err.category(), "protocol");
    }
}
