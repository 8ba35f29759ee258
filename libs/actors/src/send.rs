//! Send/Dispatch Protocol
//!
//! Builds a message and a [`MessageId`] carrying the requested priority, then
//! hands the pair to the destination's [`Channel::enqueue`]. Every kind of
//! destination (strong handle, weak address, registry name, optional handle,
//! remote proxy) implements the same contract.
//!
//! Delivery is fire-and-forget: a missing, dead or unbound destination is a
//! silent no-op and the sender gets no signal.

use actor_types::{ExitMsg, ExitReason, IntoMessage, Message, MessageId, Priority};
use tracing::trace;

use crate::control::ForwardingContext;
use crate::handle::{ActorAddr, ActorRef};
use crate::registry::ActorRegistry;

/// Uniform enqueue contract for every destination kind
pub trait Channel {
    fn enqueue(
        &self,
        sender: Option<ActorAddr>,
        mid: MessageId,
        msg: Message,
        ctx: Option<&ForwardingContext>,
    );
}

impl Channel for ActorRef {
    fn enqueue(
        &self,
        sender: Option<ActorAddr>,
        mid: MessageId,
        msg: Message,
        ctx: Option<&ForwardingContext>,
    ) {
        self.control_block().actor().enqueue(sender, mid, msg, ctx);
    }
}

impl Channel for ActorAddr {
    fn enqueue(
        &self,
        sender: Option<ActorAddr>,
        mid: MessageId,
        msg: Message,
        ctx: Option<&ForwardingContext>,
    ) {
        match self.upgrade() {
            Some(actor) => actor.enqueue(sender, mid, msg, ctx),
            None => trace!(receiver = %self, "Dropping message to unreachable address"),
        }
    }
}

impl<C: Channel> Channel for Option<C> {
    fn enqueue(
        &self,
        sender: Option<ActorAddr>,
        mid: MessageId,
        msg: Message,
        ctx: Option<&ForwardingContext>,
    ) {
        match self {
            Some(channel) => channel.enqueue(sender, mid, msg, ctx),
            None => trace!("Dropping message to empty handle"),
        }
    }
}

impl<C: Channel + ?Sized> Channel for &C {
    fn enqueue(
        &self,
        sender: Option<ActorAddr>,
        mid: MessageId,
        msg: Message,
        ctx: Option<&ForwardingContext>,
    ) {
        (**self).enqueue(sender, mid, msg, ctx);
    }
}

/// Destination resolved through the registry's name map at send time
#[derive(Debug, Clone, Copy)]
pub struct Named<'a> {
    registry: &'a ActorRegistry,
    name: &'a str,
}

impl<'a> Named<'a> {
    pub fn new(registry: &'a ActorRegistry, name: &'a str) -> Self {
        Self { registry, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }
}

impl Channel for Named<'_> {
    fn enqueue(
        &self,
        sender: Option<ActorAddr>,
        mid: MessageId,
        msg: Message,
        ctx: Option<&ForwardingContext>,
    ) {
        match self.registry.get_named(self.name) {
            Some(actor) => actor.enqueue(sender, mid, msg, ctx),
            None => trace!(name = self.name, "Dropping message to unbound name"),
        }
    }
}

/// Send `payload` to `to` under the identity of `from`
pub fn send_as<C, P>(from: &ActorRef, priority: Priority, to: &C, payload: P)
where
    C: Channel + ?Sized,
    P: IntoMessage,
{
    deliver(Some(from.address()), priority, to, payload.into_message());
}

/// Send `payload` to `to` with no sender identity, normal priority
pub fn anon_send<C, P>(to: &C, payload: P)
where
    C: Channel + ?Sized,
    P: IntoMessage,
{
    deliver(None, Priority::Normal, to, payload.into_message());
}

/// Send `payload` to `to` with no sender identity
pub fn anon_send_with<C, P>(priority: Priority, to: &C, payload: P)
where
    C: Channel + ?Sized,
    P: IntoMessage,
{
    deliver(None, priority, to, payload.into_message());
}

/// Ask `to` to terminate with `reason`, ahead of its queued normal traffic
pub fn anon_send_exit<C>(to: &C, reason: ExitReason)
where
    C: Channel + ?Sized,
{
    deliver(
        None,
        Priority::High,
        to,
        ExitMsg::anonymous(reason).into_message(),
    );
}

pub(crate) fn deliver<C>(sender: Option<ActorAddr>, priority: Priority, to: &C, msg: Message)
where
    C: Channel + ?Sized,
{
    let mid = MessageId::make().with_priority(priority);
    to.enqueue(sender, mid, msg, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::LocalActor;
    use actor_types::{ActorIdGenerator, NodeId};

    #[test]
    fn test_send_as_carries_sender_and_priority() {
        let ids = ActorIdGenerator::new();
        let node = NodeId::random();
        let (sender, _) = LocalActor::spawn(&ids, node, 8);
        let (receiver, local) = LocalActor::spawn(&ids, node, 8);

        send_as(&sender, Priority::High, &receiver, (1_i64, "x"));
        let env = local.try_receive().unwrap();
        assert_eq!(env.sender.as_ref().map(ActorAddr::id), Some(sender.id()));
        assert!(env.mid.is_high_priority());
        assert_eq!(env.message.str_at(1).unwrap(), "x");
    }

    #[test]
    fn test_anon_send_has_no_sender() {
        let ids = ActorIdGenerator::new();
        let (receiver, local) = LocalActor::spawn(&ids, NodeId::random(), 8);
        anon_send(&receiver, 5_i64);
        let env = local.try_receive().unwrap();
        assert!(env.is_anonymous());
        assert_eq!(env.priority(), Priority::Normal);
    }

    #[test]
    fn test_empty_and_dead_destinations_are_noops() {
        let ids = ActorIdGenerator::new();
        let (receiver, local) = LocalActor::spawn(&ids, NodeId::random(), 8);
        let addr = receiver.address();
        drop(receiver);

        anon_send(&addr, 1_i64);
        anon_send(&None::<ActorRef>, 1_i64);
        anon_send_exit(&addr, ExitReason::Kill);
        assert!(local.mailbox().is_empty());
    }

    #[test]
    fn test_named_destination_resolves_at_send_time() {
        let ids = ActorIdGenerator::new();
        let registry = ActorRegistry::new();
        let (receiver, local) = LocalActor::spawn(&ids, NodeId::random(), 8);

        anon_send(&Named::new(&registry, "svc"), 1_i64);
        registry.put_named("svc", receiver.clone());
        anon_send(&Named::new(&registry, "svc"), 2_i64);

        assert_eq!(local.try_receive().unwrap().message.i64_at(0).unwrap(), 2);
        assert!(local.try_receive().is_none());
    }
}
