//! Actor Addressing and Dispatch
//!
//! Handles, registry and send protocol of the actor runtime. Behavior
//! execution belongs to the hosting scheduler; this crate only defines how
//! actors are identified, found, and sent to.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  send_as / anon_send   ┌───────────────────────┐
//! │    Sender    │───────────────────────▶│ Channel::enqueue      │
//! └──────────────┘                        │  ActorRef / ActorAddr │
//!        │ lookup by id / name            │  Named / Option<_>    │
//!        ▼                                │  remote proxy         │
//! ┌──────────────┐  strong handles        └──────────┬────────────┘
//! │ActorRegistry │───────────────┐                   ▼
//! │ ids │ names  │               │        ┌───────────────────────┐
//! │ running set  │               └───────▶│ ControlBlock          │
//! └──────────────┘                        │  AbstractActor        │
//!                                         │  (Mailbox: high│normal)│
//!                                         └───────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust
//! use actor_types::{ActorIdGenerator, NodeId};
//! use messaging_actors::{anon_send, ActorRegistry, LocalActor, Named};
//!
//! let ids = ActorIdGenerator::new();
//! let registry = ActorRegistry::new();
//! let (logger, mailbox) = LocalActor::spawn(&ids, NodeId::random(), 1024);
//! registry.put_named("logger", logger);
//!
//! anon_send(&Named::new(&registry, "logger"), "hello");
//! assert_eq!(mailbox.try_receive().unwrap().message.str_at(0).unwrap(), "hello");
//! ```

pub mod control;
pub mod error;
pub mod handle;
pub mod mailbox;
pub mod messages;
pub mod registry;
pub mod send;
pub mod typed;

pub use control::{AbstractActor, ControlBlock, ForwardingContext};
pub use error::{DispatchError, Result};
pub use handle::{ActorAddr, ActorRef};
pub use mailbox::{LocalActor, Mailbox};
pub use messages::Envelope;
pub use registry::{ActorRegistry, NameMap};
pub use send::{anon_send, anon_send_exit, anon_send_with, send_as, Channel, Named};
pub use typed::{anon_send_typed, send_typed_as, Accepts, MessageInterface, TypedActorRef};
