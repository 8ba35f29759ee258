//! Exit reasons and the system exit message

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::ActorId;

/// Why an actor terminated (or is being asked to)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    /// Regular termination
    Normal,
    /// The behavior failed with an unhandled error
    UnhandledException,
    /// Unknown cause, e.g. a remote actor vanished
    Unknown,
    /// Shut down on request of the user
    UserShutdown,
    /// Unconditional termination; cannot be trapped
    Kill,
    /// Application-defined code
    User(u32),
}

impl ExitReason {
    /// Wire code, compatible with [`ExitReason::from_code`]
    pub fn code(self) -> u32 {
        match self {
            ExitReason::Normal => 0,
            ExitReason::UnhandledException => 1,
            ExitReason::Unknown => 2,
            ExitReason::UserShutdown => 16,
            ExitReason::Kill => 17,
            ExitReason::User(code) => code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            0 => ExitReason::Normal,
            1 => ExitReason::UnhandledException,
            2 => ExitReason::Unknown,
            16 => ExitReason::UserShutdown,
            17 => ExitReason::Kill,
            other => ExitReason::User(other),
        }
    }

    pub fn is_normal(self) -> bool {
        matches!(self, ExitReason::Normal)
    }
}

impl From<u32> for ExitReason {
    fn from(code: u32) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Normal => write!(f, "normal"),
            ExitReason::UnhandledException => write!(f, "unhandled_exception"),
            ExitReason::Unknown => write!(f, "unknown"),
            ExitReason::UserShutdown => write!(f, "user_shutdown"),
            ExitReason::Kill => write!(f, "kill"),
            ExitReason::User(code) => write!(f, "user({})", code),
        }
    }
}

/// System message asking the receiver to terminate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitMsg {
    /// Requesting actor; `None` for anonymous requests
    pub source: Option<ActorId>,
    pub reason: ExitReason,
}

impl ExitMsg {
    pub fn new(source: Option<ActorId>, reason: ExitReason) -> Self {
        Self { source, reason }
    }

    pub fn anonymous(reason: ExitReason) -> Self {
        Self::new(None, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        for reason in [
            ExitReason::Normal,
            ExitReason::UnhandledException,
            ExitReason::Unknown,
            ExitReason::UserShutdown,
            ExitReason::Kill,
            ExitReason::User(4242),
        ] {
            assert_eq!(ExitReason::from_code(reason.code()), reason);
        }
        assert_eq!(ExitReason::from(16), ExitReason::UserShutdown);
        assert_eq!(ExitReason::User(99).to_string(), "user(99)");
    }
}
