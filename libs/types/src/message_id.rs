//! Correlation ids with an embedded priority bit
//!
//! Layout of the 64-bit value:
//!
//! ```text
//! 63         62          61..0
//! ┌──────────┬───────────┬──────────────────────┐
//! │ high     │ response  │ request id           │
//! │ priority │ flag      │ (0 = asynchronous)   │
//! └──────────┴───────────┴──────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

const HIGH_PRIORITY_FLAG: u64 = 1 << 63;
const RESPONSE_FLAG: u64 = 1 << 62;
const REQUEST_ID_MASK: u64 = RESPONSE_FLAG - 1;

/// Mailbox priority class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Normal,
    /// Placed ahead of queued normal-priority envelopes
    High,
}

/// Request/response identity plus priority
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    /// Asynchronous message id (no request correlation), normal priority
    pub const fn make() -> Self {
        Self(0)
    }

    /// Id for request number `request_id`. Bits above 61 are discarded.
    pub const fn request(request_id: u64) -> Self {
        Self(request_id & REQUEST_ID_MASK)
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn with_high_priority(self) -> Self {
        Self(self.0 | HIGH_PRIORITY_FLAG)
    }

    pub const fn with_normal_priority(self) -> Self {
        Self(self.0 & !HIGH_PRIORITY_FLAG)
    }

    pub fn with_priority(self, priority: Priority) -> Self {
        match priority {
            Priority::High => self.with_high_priority(),
            Priority::Normal => self.with_normal_priority(),
        }
    }

    pub const fn is_high_priority(self) -> bool {
        self.0 & HIGH_PRIORITY_FLAG != 0
    }

    pub fn priority(self) -> Priority {
        if self.is_high_priority() {
            Priority::High
        } else {
            Priority::Normal
        }
    }

    pub const fn request_id(self) -> u64 {
        self.0 & REQUEST_ID_MASK
    }

    pub const fn is_async(self) -> bool {
        self.request_id() == 0
    }

    pub const fn is_response(self) -> bool {
        self.0 & RESPONSE_FLAG != 0
    }

    pub const fn is_request(self) -> bool {
        !self.is_async() && !self.is_response()
    }

    /// The id a reply to this request carries. Keeps the priority bit.
    pub const fn response_id(self) -> Self {
        if self.is_request() {
            Self(self.0 | RESPONSE_FLAG)
        } else {
            Self(self.0 & HIGH_PRIORITY_FLAG)
        }
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageId")
            .field("request_id", &self.request_id())
            .field("response", &self.is_response())
            .field("priority", &self.priority())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_default() {
        let mid = MessageId::make();
        assert!(mid.is_async());
        assert!(!mid.is_request());
        assert_eq!(mid.priority(), Priority::Normal);
    }

    #[test]
    fn test_priority_bit_preserves_request() {
        let mid = MessageId::request(77).with_high_priority();
        assert!(mid.is_high_priority());
        assert_eq!(mid.request_id(), 77);
        assert!(mid.is_request());

        let normal = mid.with_normal_priority();
        assert_eq!(normal.priority(), Priority::Normal);
        assert_eq!(normal.request_id(), 77);
    }

    #[test]
    fn test_response_correlation() {
        let request = MessageId::request(9).with_high_priority();
        let response = request.response_id();
        assert!(response.is_response());
        assert!(!response.is_request());
        assert_eq!(response.request_id(), 9);
        assert_eq!(response.priority(), Priority::High);

        // async messages have no response
        assert!(MessageId::make().response_id().is_async());
    }

    #[test]
    fn test_request_id_is_masked() {
        let mid = MessageId::request(u64::MAX);
        assert!(!mid.is_high_priority());
        assert!(!mid.is_response());
    }
}
