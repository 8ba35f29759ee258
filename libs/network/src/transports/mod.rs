//! Transport Layer
//!
//! Socket plumbing underneath the protocol stack: the async driver that
//! pumps a [`Connection`](crate::protocol::Connection) and TCP socket setup.

pub mod driver;
pub mod tcp;

pub use driver::drive;
pub use tcp::{connect_tcp, TcpAcceptor, TcpNetworkConfig};
