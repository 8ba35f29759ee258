//! Dispatch errors
//!
//! Sends are fire-and-forget and never fail for a missing or dead receiver.
//! The only error a send can report is a payload that a typed destination
//! does not accept.

use actor_types::ValueType;
use thiserror::Error;

/// Result type alias for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Payload signature not in the destination's accepted set
    #[error("Unexpected message {actual:?} for {interface}, accepted: {expected:?}")]
    UnexpectedMessage {
        interface: &'static str,
        expected: Vec<Vec<ValueType>>,
        actual: Vec<ValueType>,
    },
}

impl DispatchError {
    pub fn unexpected_message(
        interface: &'static str,
        expected: Vec<Vec<ValueType>>,
        actual: Vec<ValueType>,
    ) -> Self {
        Self::UnexpectedMessage {
            interface,
            expected,
            actual,
        }
    }
}
