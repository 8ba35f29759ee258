//! Delivery envelopes
//!
//! An [`Envelope`] is the atomic unit of delivery: the sender's address (if
//! any), the correlation id carrying the priority bit, and the payload.

use actor_types::{ExitMsg, Message, MessageId, NodeId, Priority};

use crate::control::ForwardingContext;
use crate::handle::ActorAddr;

/// Sender + correlation id + payload
#[derive(Debug, Clone)]
pub struct Envelope {
    /// `None` for anonymous sends
    pub sender: Option<ActorAddr>,
    pub mid: MessageId,
    pub message: Message,
    /// Node the envelope was forwarded from, if it crossed a connection
    pub origin: Option<NodeId>,
}

impl Envelope {
    pub fn new(
        sender: Option<ActorAddr>,
        mid: MessageId,
        message: Message,
        ctx: Option<&ForwardingContext>,
    ) -> Self {
        Self {
            sender,
            mid,
            message,
            origin: ctx.and_then(|ctx| ctx.origin),
        }
    }

    pub fn priority(&self) -> Priority {
        self.mid.priority()
    }

    pub fn is_anonymous(&self) -> bool {
        self.sender.is_none()
    }

    /// The exit request carried by this envelope, if it is one
    pub fn exit_request(&self) -> Option<&ExitMsg> {
        self.message.as_exit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_types::{ExitReason, IntoMessage};

    #[test]
    fn test_envelope_records_origin() {
        let node = NodeId::random();
        let ctx = ForwardingContext::from_node(node);
        let env = Envelope::new(None, MessageId::make(), 1_i64.into_message(), Some(&ctx));
        assert_eq!(env.origin, Some(node));
        assert!(env.is_anonymous());
        assert_eq!(env.priority(), Priority::Normal);
        assert!(env.exit_request().is_none());
    }

    #[test]
    fn test_exit_envelope() {
        let env = Envelope::new(
            None,
            MessageId::make().with_high_priority(),
            ExitMsg::anonymous(ExitReason::UserShutdown).into_message(),
            None,
        );
        assert_eq!(env.priority(), Priority::High);
        assert_eq!(env.exit_request().unwrap().reason, ExitReason::UserShutdown);
    }
}
