//! # Actor Types
//!
//! Identity and message model shared by every crate in the runtime.
//!
//! ## Contents
//!
//! - **Identity**: [`ActorId`] (process-unique, never reused), [`ActorIdGenerator`],
//!   and [`NodeId`] for qualifying addresses that live on another runtime instance
//! - **Payloads**: [`Value`] fields assembled into an immutable [`Message`]
//! - **Correlation**: [`MessageId`] carries the request/response identity plus the
//!   [`Priority`] bit used for mailbox placement
//! - **System messages**: [`ExitMsg`] and [`ExitReason`]
//!
//! ```rust
//! use actor_types::{IntoMessage, MessageId, Priority, ValueType};
//!
//! let msg = (7_i64, "ping").into_message();
//! assert!(msg.matches(&[ValueType::I64, ValueType::Str]));
//!
//! let mid = MessageId::make().with_high_priority();
//! assert_eq!(mid.priority(), Priority::High);
//! ```

pub mod error;
pub mod exit;
pub mod id;
pub mod message;
pub mod message_id;

pub use error::TypeError;
pub use exit::{ExitMsg, ExitReason};
pub use id::{ActorId, ActorIdGenerator, NodeId};
pub use message::{Field, IntoMessage, Message, StaticSignature, Value, ValueType};
pub use message_id::{MessageId, Priority};
