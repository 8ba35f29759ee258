//! Actor messaging across a connection
//!
//! [`ForwardingLayer`] is the application layer of a node-to-node
//! connection. Outbound, local senders talk to [`RemoteActorProxy`]
//! handles (or [`RemoteNamed`] destinations) which queue [`WireEnvelope`]s
//! in an [`Outbox`]; the layer drains the outbox whenever the stack below
//! can take more. Inbound, each frame is decoded, its receiver resolved
//! through the local [`ActorRegistry`], and the message enqueued with a
//! [`ForwardingContext`] naming the origin node.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use actor_types::{ActorId, ExitReason, Message, MessageId, NodeId};
use messaging_actors::{AbstractActor, ActorAddr, ActorRef, ActorRegistry, Channel, ForwardingContext};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};

use crate::protocol::{
    Connection, LengthPrefixFramer, LowerLayer, OctetStream, ProtocolConfig, UpperLayer,
    WireAddr, WireEnvelope, WireTarget,
};
use crate::{Result, TransportError};

#[derive(Debug, Default)]
struct OutboxQueue {
    envelopes: VecDeque<WireEnvelope>,
    closed: bool,
    dropped: u64,
}

/// Envelopes waiting for a connection to send them
///
/// Bounded like a local mailbox: once `capacity` envelopes are waiting,
/// normal-priority envelopes are dropped and counted while high-priority
/// ones are still admitted.
#[derive(Debug)]
pub struct Outbox {
    queue: Mutex<OutboxQueue>,
    wake: Arc<Notify>,
    capacity: usize,
}

impl Default for Outbox {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_OUTBOX_CAPACITY)
    }
}

/// Queued envelopes an outbox holds before dropping normal traffic
pub const DEFAULT_OUTBOX_CAPACITY: usize = 1024;

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(OutboxQueue::default()),
            wake: Arc::new(Notify::new()),
            capacity,
        }
    }

    /// Queue an envelope and wake the driver; false if it was dropped
    pub fn push(&self, envelope: WireEnvelope) -> bool {
        {
            let mut queue = self.queue.lock();
            if queue.closed {
                queue.dropped += 1;
                return false;
            }
            if !envelope.mid.is_high_priority() && queue.envelopes.len() >= self.capacity {
                queue.dropped += 1;
                trace!(capacity = self.capacity, "Outbox full, dropping envelope");
                return false;
            }
            queue.envelopes.push_back(envelope);
        }
        self.wake.notify_one();
        true
    }

    pub fn pop(&self) -> Option<WireEnvelope> {
        self.queue.lock().envelopes.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().envelopes.is_empty()
    }

    /// Refuse further envelopes and drop the queued ones
    pub fn close(&self) -> usize {
        let mut queue = self.queue.lock();
        queue.closed = true;
        let dropped = queue.envelopes.len();
        queue.dropped += dropped as u64;
        queue.envelopes.clear();
        dropped
    }

    pub fn is_closed(&self) -> bool {
        self.queue.lock().closed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Envelopes discarded because the outbox was full or closed
    pub fn dropped(&self) -> u64 {
        self.queue.lock().dropped
    }

    /// Notifier the driver waits on
    pub fn wake_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }
}

/// Local stand-in for an actor on the peer node
#[derive(Debug)]
pub struct RemoteActorProxy {
    target: ActorId,
    local_node: NodeId,
    outbox: Arc<Outbox>,
}

impl RemoteActorProxy {
    /// Strong handle for actor `id` on node `peer`, reachable through `outbox`
    pub fn spawn(id: ActorId, peer: NodeId, local_node: NodeId, outbox: &Arc<Outbox>) -> ActorRef {
        let proxy = Self {
            target: id,
            local_node,
            outbox: Arc::clone(outbox),
        };
        ActorRef::new(id, peer, Arc::new(proxy))
    }
}

impl AbstractActor for RemoteActorProxy {
    fn enqueue(
        &self,
        sender: Option<ActorAddr>,
        mid: MessageId,
        msg: Message,
        _ctx: Option<&ForwardingContext>,
    ) {
        let envelope = WireEnvelope {
            origin: self.local_node,
            sender: sender.map(|addr| WireAddr {
                id: addr.id(),
                node: addr.node(),
            }),
            receiver: WireTarget::Id(self.target),
            mid,
            message: msg,
        };
        if !self.outbox.push(envelope) {
            trace!(receiver = %self.target, "Outbox refused message for peer");
        }
    }

    fn exit_reason(&self) -> Option<ExitReason> {
        self.outbox.is_closed().then_some(ExitReason::Unknown)
    }
}

/// Destination registered under `name` on the peer node
#[derive(Debug, Clone, Copy)]
pub struct RemoteNamed<'a> {
    outbox: &'a Outbox,
    local_node: NodeId,
    name: &'a str,
}

impl<'a> RemoteNamed<'a> {
    pub fn new(outbox: &'a Outbox, local_node: NodeId, name: &'a str) -> Self {
        Self {
            outbox,
            local_node,
            name,
        }
    }
}

impl Channel for RemoteNamed<'_> {
    fn enqueue(
        &self,
        sender: Option<ActorAddr>,
        mid: MessageId,
        msg: Message,
        _ctx: Option<&ForwardingContext>,
    ) {
        let envelope = WireEnvelope {
            origin: self.local_node,
            sender: sender.map(|addr| WireAddr {
                id: addr.id(),
                node: addr.node(),
            }),
            receiver: WireTarget::Name(self.name.to_string()),
            mid,
            message: msg,
        };
        if !self.outbox.push(envelope) {
            trace!(name = self.name, "Outbox refused message for peer");
        }
    }
}

/// Forwarding counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ForwardingStats {
    /// Inbound envelopes handed to a local actor
    pub delivered: u64,
    /// Inbound envelopes whose receiver did not resolve
    pub unroutable: u64,
    /// Outbound envelopes written to the stack
    pub sent: u64,
}

/// Remote senders a connection keeps reply proxies for
pub const DEFAULT_REPLY_PROXY_LIMIT: usize = 4096;

/// Application layer routing envelopes between the registry and the wire
///
/// Every remote sender seen inbound gets a reply proxy so local actors can
/// answer it. The proxies live until the connection ends or until more
/// than the reply-proxy limit of distinct senders have been seen, at which
/// point the least recently seen sender is evicted and addresses handed
/// out for it stop resolving.
#[derive(Debug)]
pub struct ForwardingLayer {
    local_node: NodeId,
    registry: Arc<ActorRegistry>,
    outbox: Arc<Outbox>,
    senders: HashMap<WireAddr, ActorRef>,
    /// Senders from least to most recently seen
    sender_order: VecDeque<WireAddr>,
    reply_proxy_limit: usize,
    peer: Option<NodeId>,
    stats: ForwardingStats,
}

impl ForwardingLayer {
    pub fn new(local_node: NodeId, registry: Arc<ActorRegistry>, outbox: Arc<Outbox>) -> Self {
        Self {
            local_node,
            registry,
            outbox,
            senders: HashMap::new(),
            sender_order: VecDeque::new(),
            reply_proxy_limit: DEFAULT_REPLY_PROXY_LIMIT,
            peer: None,
            stats: ForwardingStats::default(),
        }
    }

    /// Cap the number of remote senders kept answerable
    pub fn with_reply_proxy_limit(mut self, limit: usize) -> Self {
        self.reply_proxy_limit = limit.max(1);
        self
    }

    /// Remote senders currently holding a reply proxy
    pub fn reply_proxies(&self) -> usize {
        self.senders.len()
    }

    /// Node seen on the other end, once it has sent anything
    pub fn peer(&self) -> Option<NodeId> {
        self.peer
    }

    pub fn outbox(&self) -> &Arc<Outbox> {
        &self.outbox
    }

    pub fn stats(&self) -> ForwardingStats {
        self.stats
    }

    fn resolve(&self, target: &WireTarget) -> Option<ActorRef> {
        match target {
            WireTarget::Id(id) => self.registry.get(*id),
            WireTarget::Name(name) => self.registry.get_named(name),
        }
    }

    fn sender_address(&mut self, sender: Option<WireAddr>) -> Option<ActorAddr> {
        let sender = sender?;
        if let Some(proxy) = self.senders.get(&sender) {
            let addr = proxy.address();
            if let Some(pos) = self.sender_order.iter().position(|seen| *seen == sender) {
                self.sender_order.remove(pos);
            }
            self.sender_order.push_back(sender);
            return Some(addr);
        }

        while self.senders.len() >= self.reply_proxy_limit {
            let Some(oldest) = self.sender_order.pop_front() else {
                break;
            };
            self.senders.remove(&oldest);
            trace!(sender = %oldest.id, "Evicted reply proxy");
        }

        let proxy = RemoteActorProxy::spawn(sender.id, sender.node, self.local_node, &self.outbox);
        let addr = proxy.address();
        self.senders.insert(sender, proxy);
        self.sender_order.push_back(sender);
        Some(addr)
    }
}

impl UpperLayer for ForwardingLayer {
    fn start(&mut self, down: &mut dyn LowerLayer) -> Result<()> {
        info!(node = %self.local_node, "Forwarding layer started");
        down.request_more_input();
        Ok(())
    }

    fn prepare_send(&mut self, down: &mut dyn LowerLayer) -> Result<()> {
        while down.can_send_more() {
            let Some(envelope) = self.outbox.pop() else {
                break;
            };
            down.write(&envelope.encode()?)?;
            self.stats.sent += 1;
        }
        Ok(())
    }

    fn done_sending(&mut self, _down: &mut dyn LowerLayer) -> bool {
        self.outbox.is_empty()
    }

    fn consume(&mut self, _down: &mut dyn LowerLayer, input: &[u8]) -> Result<usize> {
        let envelope = WireEnvelope::decode(input)?;
        if self.peer.is_none() {
            debug!(peer = %envelope.origin, "Learned peer node");
            self.peer = Some(envelope.origin);
        }

        match self.resolve(&envelope.receiver) {
            Some(receiver) => {
                let sender = self.sender_address(envelope.sender);
                let ctx = ForwardingContext::from_node(envelope.origin);
                receiver.enqueue(sender, envelope.mid, envelope.message, Some(&ctx));
                self.stats.delivered += 1;
            }
            None => {
                self.stats.unroutable += 1;
                trace!(receiver = ?envelope.receiver, "Dropping envelope for unknown receiver");
            }
        }
        Ok(input.len())
    }

    fn abort(&mut self, reason: &TransportError) {
        let dropped = self.outbox.close();
        self.senders.clear();
        self.sender_order.clear();
        if reason.is_fatal() {
            warn!(
                category = reason.category(),
                dropped,
                delivered = self.stats.delivered,
                sent = self.stats.sent,
                "Forwarding connection aborted: {}",
                reason
            );
        } else {
            info!(
                dropped,
                delivered = self.stats.delivered,
                sent = self.stats.sent,
                "Forwarding connection closed"
            );
        }
    }
}

/// Forwarding over length-prefixed frames over a byte stream
pub type NodeConnection = Connection<ForwardingLayer, LengthPrefixFramer<OctetStream>>;

/// Assemble the standard node-to-node stack
pub fn node_connection(config: ProtocolConfig, layer: ForwardingLayer) -> Result<NodeConnection> {
    config.validate()?;
    Ok(Connection::new(
        layer,
        LengthPrefixFramer::new(OctetStream::new(config)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_types::{ActorIdGenerator, IntoMessage, Priority};
    use messaging_actors::{anon_send, LocalActor};

    #[test]
    fn test_proxy_queues_wire_envelopes() {
        let outbox = Arc::new(Outbox::new());
        let local = NodeId::random();
        let peer = NodeId::random();
        let target = ActorId::new(42).unwrap();
        let proxy = RemoteActorProxy::spawn(target, peer, local, &outbox);

        assert_eq!(proxy.id(), target);
        assert_eq!(proxy.node(), peer);
        anon_send(&proxy, "ping");

        let envelope = outbox.pop().unwrap();
        assert_eq!(envelope.origin, local);
        assert_eq!(envelope.receiver, WireTarget::Id(target));
        assert!(envelope.sender.is_none());
        assert_eq!(envelope.message.str_at(0).unwrap(), "ping");
    }

    #[test]
    fn test_closed_outbox_drops_and_reports_exit() {
        let outbox = Arc::new(Outbox::new());
        let proxy = RemoteActorProxy::spawn(
            ActorId::new(1).unwrap(),
            NodeId::random(),
            NodeId::random(),
            &outbox,
        );
        anon_send(&proxy, 1_i64);
        assert_eq!(outbox.close(), 1);

        anon_send(&proxy, 2_i64);
        assert!(outbox.is_empty());
        assert_eq!(outbox.dropped(), 2);
        assert_eq!(proxy.exit_reason(), Some(ExitReason::Unknown));
    }

    #[test]
    fn test_unroutable_envelopes_are_counted() {
        let ids = ActorIdGenerator::new();
        let node = NodeId::random();
        let registry = Arc::new(ActorRegistry::new());
        let (logger, mailbox) = LocalActor::spawn(&ids, node, 8);
        registry.put_named("logger", logger);

        let mut layer = ForwardingLayer::new(node, Arc::clone(&registry), Arc::new(Outbox::new()));
        let mut down = OctetStream::new(ProtocolConfig::default());
        let origin = NodeId::random();

        for target in [WireTarget::Name("logger".into()), WireTarget::Name("nobody".into())] {
            let frame = WireEnvelope {
                origin,
                sender: None,
                receiver: target,
                mid: MessageId::make(),
                message: ("hello",).into_message(),
            }
            .encode()
            .unwrap();
            layer.consume(&mut down, &frame).unwrap();
        }

        assert_eq!(layer.stats().delivered, 1);
        assert_eq!(layer.stats().unroutable, 1);
        assert_eq!(layer.peer(), Some(origin));
        let envelope = mailbox.try_receive().unwrap();
        assert_eq!(envelope.origin, Some(origin));
    }

    fn envelope_to(receiver: WireTarget, sender: Option<WireAddr>, mid: MessageId) -> WireEnvelope {
        WireEnvelope {
            origin: NodeId::random(),
            sender,
            receiver,
            mid,
            message: ("payload",).into_message(),
        }
    }

    #[test]
    fn test_full_outbox_drops_normal_but_admits_high_priority() {
        let outbox = Outbox::with_capacity(2);
        let target = || WireTarget::Id(ActorId::new(9).unwrap());

        assert!(outbox.push(envelope_to(target(), None, MessageId::make())));
        assert!(outbox.push(envelope_to(target(), None, MessageId::make())));
        assert!(!outbox.push(envelope_to(target(), None, MessageId::make())));
        assert_eq!(outbox.dropped(), 1);

        let urgent = MessageId::make().with_priority(Priority::High);
        assert!(outbox.push(envelope_to(target(), None, urgent)));
        assert_eq!(outbox.len(), 3);
        assert!(!outbox.is_closed());
    }

    #[test]
    fn test_reply_proxies_evict_least_recently_seen_sender() {
        let ids = ActorIdGenerator::new();
        let node = NodeId::random();
        let registry = Arc::new(ActorRegistry::new());
        let (sink, mailbox) = LocalActor::spawn(&ids, node, 16);
        registry.put_named("sink", sink);

        let mut layer = ForwardingLayer::new(node, registry, Arc::new(Outbox::new()))
            .with_reply_proxy_limit(2);
        let mut down = OctetStream::new(ProtocolConfig::default());
        let peer = NodeId::random();
        let remote = |raw| WireAddr {
            id: ActorId::new(raw).unwrap(),
            node: peer,
        };

        let mut replies = Vec::new();
        for sender in [remote(1), remote(2), remote(1), remote(3)] {
            let frame = envelope_to(WireTarget::Name("sink".into()), Some(sender), MessageId::make())
                .encode()
                .unwrap();
            layer.consume(&mut down, &frame).unwrap();
            replies.push(mailbox.try_receive().unwrap().sender.unwrap());
        }

        assert_eq!(layer.reply_proxies(), 2);
        // Sender 2 was the least recently seen when sender 3 arrived
        assert!(replies[1].upgrade().is_none());
        assert!(replies[0].upgrade().is_some());
        assert!(replies[3].upgrade().is_some());
    }
}
