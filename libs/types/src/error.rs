//! Errors raised while converting or inspecting message model types.

use thiserror::Error;

use crate::message::ValueType;

/// Conversion and access errors for the message model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    /// A field had a different type than the caller asked for
    #[error("Field {index} has type {actual:?}, expected {expected:?}")]
    FieldType {
        index: usize,
        expected: ValueType,
        actual: ValueType,
    },

    /// A field index past the end of the message
    #[error("Field {index} out of range for message of {len} fields")]
    FieldOutOfRange { index: usize, len: usize },

    /// An actor id of zero was supplied where a valid id is required
    #[error("Actor id 0 is reserved for the invalid actor")]
    InvalidActorId,
}

impl TypeError {
    /// Create a field type mismatch error
    pub fn field_type(index: usize, expected: ValueType, actual: ValueType) -> Self {
        Self::FieldType {
            index,
            expected,
            actual,
        }
    }

    /// Create an out-of-range error
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::FieldOutOfRange { index, len }
    }
}
