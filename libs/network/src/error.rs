//! Transport Error Types
//!
//! Errors raised inside a protocol stack. Any error that escapes a layer
//! aborts the whole stack; [`TransportError::is_fatal`] tells a supervisor
//! whether the connection ended abnormally or was merely closed.

use std::net::SocketAddr;
use thiserror::Error;

/// Main transport error type
#[derive(Error, Debug)]
pub enum TransportError {
    /// Socket level failures: refused, reset, unreachable
    #[error("Connection error: {message} (remote: {remote_addr:?})")]
    Connection {
        message: String,
        remote_addr: Option<SocketAddr>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed or oversized input from the peer
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// I/O errors from the underlying byte stream
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Orderly shutdown, by either side
    #[error("Connection closed: {message}")]
    Closed { message: String },

    /// Outbound payload could not be encoded
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport timeout errors
    #[error("Timeout error: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>, remote_addr: Option<SocketAddr>) -> Self {
        Self::Connection {
            message: message.into(),
            remote_addr,
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        remote_addr: Option<SocketAddr>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            remote_addr,
            source: Some(Box::new(source)),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            source: None,
        }
    }

    /// Create a protocol error with source
    pub fn protocol_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Protocol {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field: field.map(|s| s.to_string()),
        }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self::Closed {
            message: message.into(),
        }
    }

    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Whether the connection ended abnormally
    ///
    /// Orderly closes are not fatal; everything else is reported to whoever
    /// supervises the connection.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransportError::Closed { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TransportError::Connection { .. } => "connection",
            TransportError::Protocol { .. } => "protocol",
            TransportError::Configuration { .. } => "configuration",
            TransportError::Io { .. } => "io",
            TransportError::Closed { .. } => "closed",
            TransportError::Serialization { .. } => "serialization",
            TransportError::Timeout { .. } => "timeout",
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        Self::io("I/O operation failed", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let err = TransportError::protocol("frame header announces 4294967295 bytes");
        assert!(matches!(err, TransportError::Protocol { .. }));
        assert_eq!(err.category(), "protocol");
        assert!(err.to_string().contains("4294967295"));
    }

    #[test]
    fn test_connection_error() {
        let addr = "127.0.0.1:7001".parse().unwrap();
        let err = TransportError::connection("refused", Some(addr));
        match err {
            TransportError::Connection { remote_addr, .. } => assert_eq!(remote_addr, Some(addr)),
            _ => panic!("expected connection error"),
        }
    }

    #[test]
    fn test_fatality() {
        assert!(!TransportError::closed("peer closed").is_fatal());
        assert!(TransportError::protocol("bad frame").is_fatal());
        assert!(TransportError::timeout("connect", 500).is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        let err: TransportError = io.into();
        assert_eq!(err.category(), "io");
        assert!(std::error::Error::source(&err).is_some());
    }
}
