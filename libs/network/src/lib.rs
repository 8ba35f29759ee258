//! Network Infrastructure
//!
//! Layered protocol stacks for node-to-node actor messaging:
//!
//! - [`protocol`]: sans-IO layers (byte stream, length-prefix framing), the
//!   connection lifecycle and the wire envelope
//! - [`transports`]: the tokio driver that pumps a connection over a socket,
//!   and TCP socket setup
//! - [`forwarding`]: the application layer bridging the wire and the local
//!   actor registry
//!
//! # Examples
//!
//! ```rust
//! use network::protocol::{Connection, ConnectionState, LengthPrefixFramer, LowerLayer,
//!     OctetStream, ProtocolConfig, Stack, UpperLayer};
//! use network::{Result, TransportError};
//!
//! struct Greeter;
//!
//! impl UpperLayer for Greeter {
//!     fn start(&mut self, down: &mut dyn LowerLayer) -> Result<()> {
//!         down.write(b"hello")
//!     }
//!     fn prepare_send(&mut self, _down: &mut dyn LowerLayer) -> Result<()> { Ok(()) }
//!     fn done_sending(&mut self, _down: &mut dyn LowerLayer) -> bool { true }
//!     fn consume(&mut self, _down: &mut dyn LowerLayer, input: &[u8]) -> Result<usize> {
//!         Ok(input.len())
//!     }
//!     fn abort(&mut self, _reason: &TransportError) {}
//! }
//!
//! let stack = LengthPrefixFramer::new(OctetStream::new(ProtocolConfig::default()));
//! let mut conn = Connection::new(Greeter, stack);
//! conn.start().unwrap();
//! assert_eq!(conn.state(), ConnectionState::Started);
//! assert_eq!(&conn.take_output()[..], &[0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o']);
//! ```

pub mod error;
pub mod forwarding;
pub mod protocol;
pub mod transports;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use forwarding::{
    node_connection, ForwardingLayer, ForwardingStats, NodeConnection, Outbox, RemoteActorProxy,
    RemoteNamed, DEFAULT_OUTBOX_CAPACITY, DEFAULT_REPLY_PROXY_LIMIT,
};
pub use protocol::{
    Connection, ConnectionState, FramerMetrics, LengthPrefixFramer, LowerLayer, OctetStream,
    ProtocolConfig, Stack, UpperLayer, WireEnvelope,
};
pub use transports::{connect_tcp, drive, TcpAcceptor, TcpNetworkConfig};

// Constants for configuration
pub const DEFAULT_TCP_BUFFER_SIZE: usize = 64 * 1024; // 64KB
