//! Typed destinations
//!
//! A [`TypedActorRef<I>`] only accepts the payload signatures listed by its
//! [`MessageInterface`]. Statically known payloads are checked at compile time
//! through the [`Accepts`] bound; messages assembled at runtime (for example
//! decoded from the network) go through [`TypedActorRef::try_send`], which
//! validates the signature and fails with a typed error instead of delivering.

use actor_types::{IntoMessage, Message, Priority, StaticSignature, ValueType};
use std::fmt;
use std::marker::PhantomData;

use crate::error::{DispatchError, Result};
use crate::handle::ActorRef;
use crate::send::deliver;

/// Set of payload signatures a typed actor handles
pub trait MessageInterface: 'static {
    /// Accepted signatures, one entry per handler
    fn accepted() -> Vec<Vec<ValueType>>;

    fn accepts(signature: &[ValueType]) -> bool {
        Self::accepted().iter().any(|accepted| accepted == signature)
    }
}

/// Compile-time proof that interface `Self` handles payload type `M`
pub trait Accepts<M: StaticSignature>: MessageInterface {}

/// Strong handle restricted to the messages of interface `I`
pub struct TypedActorRef<I: MessageInterface> {
    actor: ActorRef,
    _interface: PhantomData<fn() -> I>,
}

impl<I: MessageInterface> TypedActorRef<I> {
    /// Trust that `actor` implements `I`
    pub fn new(actor: ActorRef) -> Self {
        Self {
            actor,
            _interface: PhantomData,
        }
    }

    /// The untyped handle, e.g. for system messages such as exit requests
    pub fn actor(&self) -> &ActorRef {
        &self.actor
    }

    /// Check a dynamically built message against `I`
    pub fn check_input(msg: &Message) -> Result<()> {
        let actual = msg.types();
        if I::accepts(&actual) {
            Ok(())
        } else {
            Err(DispatchError::unexpected_message(
                std::any::type_name::<I>(),
                I::accepted(),
                actual,
            ))
        }
    }

    /// Validate and send a dynamically built message
    pub fn try_send(&self, from: Option<&ActorRef>, priority: Priority, msg: Message) -> Result<()> {
        Self::check_input(&msg)?;
        deliver(from.map(ActorRef::address), priority, &self.actor, msg);
        Ok(())
    }
}

impl<I: MessageInterface> Clone for TypedActorRef<I> {
    fn clone(&self) -> Self {
        Self::new(self.actor.clone())
    }
}

impl<I: MessageInterface> fmt::Debug for TypedActorRef<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedActorRef")
            .field("actor", &self.actor)
            .field("interface", &std::any::type_name::<I>())
            .finish()
    }
}

/// Typed counterpart of [`send_as`](crate::send_as)
pub fn send_typed_as<I, M>(from: &ActorRef, priority: Priority, to: &TypedActorRef<I>, payload: M)
where
    I: Accepts<M>,
    M: StaticSignature + IntoMessage,
{
    debug_assert!(I::accepts(&M::signature()));
    deliver(Some(from.address()), priority, &to.actor, payload.into_message());
}

/// Typed counterpart of [`anon_send_with`](crate::anon_send_with)
pub fn anon_send_typed<I, M>(priority: Priority, to: &TypedActorRef<I>, payload: M)
where
    I: Accepts<M>,
    M: StaticSignature + IntoMessage,
{
    debug_assert!(I::accepts(&M::signature()));
    deliver(None, priority, &to.actor, payload.into_message());
}
