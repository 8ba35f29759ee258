//! TCP Network Transport Implementation
//!
//! Establishes the sockets a protocol stack is driven over. Framing and
//! everything above it live in the stack; this module only connects,
//! accepts and tunes sockets.

use crate::{Result, TransportError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// TCP network transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpNetworkConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Disable Nagle's algorithm on new sockets
    pub nodelay: bool,
}

impl Default for TcpNetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            nodelay: true,
        }
    }
}

/// Connect to a peer, bounded by the configured timeout
pub async fn connect_tcp(remote_addr: SocketAddr, config: &TcpNetworkConfig) -> Result<TcpStream> {
    info!("Connecting to TCP peer at {}", remote_addr);

    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(remote_addr))
        .await
        .map_err(|_| {
            TransportError::timeout("TCP connect", config.connect_timeout.as_millis() as u64)
        })?
        .map_err(|e| {
            TransportError::connection_with_source(
                "Failed to connect to TCP peer",
                Some(remote_addr),
                e,
            )
        })?;

    configure(&stream, config);
    info!("Successfully connected to TCP peer at {}", remote_addr);
    Ok(stream)
}

/// Listening socket handing out accepted streams
#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
    config: TcpNetworkConfig,
}

impl TcpAcceptor {
    pub async fn bind(bind_addr: SocketAddr, config: TcpNetworkConfig) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
            TransportError::connection_with_source("Failed to bind TCP listener", Some(bind_addr), e)
        })?;
        info!("TCP listener bound to {}", bind_addr);
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| TransportError::io("Failed to get local address", e))
    }

    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer_addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::io("Failed to accept TCP connection", e))?;
        configure(&stream, &self.config);
        debug!(peer = %peer_addr, "Accepted TCP connection");
        Ok((stream, peer_addr))
    }
}

fn configure(stream: &TcpStream, config: &TcpNetworkConfig) {
    if config.nodelay {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
    }
}
