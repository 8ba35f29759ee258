//! Layered Protocol Stack
//!
//! A connection is a chain of layers between a byte transport at the
//! bottom and an application at the top. Each layer owns the one below it;
//! the upper role is lent to the lower layers for the duration of a call,
//! so no layer keeps a pointer back up the chain.
//!
//! ```text
//!   Connection<A, S>
//!     app: A ─────────────── UpperLayer
//!     stack: S                  ▲ up (lent per call)
//!       LengthPrefixFramer<S'>  │
//!         OctetStream ──────────┘ LowerLayer
//! ```

pub mod connection;
pub mod envelope;
pub mod framing;
pub mod layer;
pub mod octet_stream;

pub use connection::{Connection, ConnectionState};
pub use envelope::{WireAddr, WireEnvelope, WireTarget};
pub use framing::{FramerMetrics, LengthPrefixFramer, FRAME_HEADER_LEN};
pub use layer::{LowerLayer, Stack, UpperLayer};
pub use octet_stream::OctetStream;

use crate::{Result, TransportError};
use serde::{Deserialize, Serialize};

/// Protocol configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Largest frame payload accepted or produced, in bytes
    pub max_frame_size: usize,
    /// Buffered outbound bytes at which upper layers are told to stop writing
    pub write_high_watermark: usize,
    /// Size of a single socket read
    pub read_chunk_size: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,   // 16MB
            write_high_watermark: 1024 * 1024,  // 1MB
            read_chunk_size: crate::DEFAULT_TCP_BUFFER_SIZE,
        }
    }
}

impl ProtocolConfig {
    /// Validate the protocol configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_size == 0 {
            return Err(TransportError::configuration(
                "max_frame_size cannot be zero",
                Some("max_frame_size"),
            ));
        }

        if self.max_frame_size > u32::MAX as usize {
            return Err(TransportError::configuration(
                "max_frame_size does not fit the 4-byte length prefix",
                Some("max_frame_size"),
            ));
        }

        if self.write_high_watermark == 0 {
            return Err(TransportError::configuration(
                "write_high_watermark cannot be zero",
                Some("write_high_watermark"),
            ));
        }

        if self.read_chunk_size == 0 {
            return Err(TransportError::configuration(
                "read_chunk_size cannot be zero",
                Some("read_chunk_size"),
            ));
        }

        Ok(())
    }
}

impl From<&runtime_config::NetworkSettings> for ProtocolConfig {
    fn from(settings: &runtime_config::NetworkSettings) -> Self {
        Self {
            max_frame_size: settings.max_frame_size,
            write_high_watermark: settings.write_high_watermark,
            read_chunk_size: settings.read_chunk_size,
        }
    }
}
