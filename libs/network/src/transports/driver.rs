//! Socket driver
//!
//! Pumps bytes between an async socket and a sans-IO [`Connection`]. The
//! driver owns no protocol logic: it feeds reads in, writes buffered output
//! out, and turns socket failures into an abort of the whole stack.
//!
//! Reads and writes are polled together. Output is written as far as the
//! socket accepts it and the unwritten tail is kept for the next round, so
//! two peers flooding each other keep draining each other's sockets.

use std::sync::Arc;

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use crate::protocol::{Connection, ConnectionState, Stack, UpperLayer};
use crate::{Result, TransportError};

enum Event {
    Read(std::io::Result<usize>),
    Written(std::io::Result<usize>),
    Wake,
}

/// Run `connection` over `socket` until it closes
///
/// `wake` lets code outside the stack (an outbox, a timer) ask the layers
/// to make progress: suspended reading is resumed and the writers are
/// offered output capacity. Returns `Ok` for an orderly close and the
/// abort reason when the connection ended abnormally.
pub async fn drive<T, A, S>(
    socket: T,
    connection: &mut Connection<A, S>,
    wake: Arc<Notify>,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    A: UpperLayer,
    S: Stack,
{
    if connection.state() == ConnectionState::Initializing {
        connection.start()?;
    }

    let (mut reader, mut writer) = tokio::io::split(socket);
    let mut buf = vec![0u8; connection.stack().octet_stream().config().read_chunk_size];
    let mut pending = Bytes::new();

    loop {
        if pending.is_empty() && connection.has_output() {
            pending = connection.take_output();
            trace!(bytes = pending.len(), "Flushing output");
        }

        if connection.state() == ConnectionState::Closed {
            // An orderly close still owes the peer its last bytes
            let fatal = connection.abort_reason().is_some_and(|r| r.is_fatal());
            if pending.is_empty() || fatal {
                break;
            }
        }

        let reading = connection.is_reading();
        let writing = !pending.is_empty();
        let event = tokio::select! {
            written = writer.write(&pending), if writing => Event::Written(written),
            read = reader.read(&mut buf), if reading => Event::Read(read),
            _ = wake.notified() => Event::Wake,
        };

        match event {
            Event::Written(Ok(0)) => {
                connection.abort(TransportError::io(
                    "Failed to write to socket",
                    std::io::ErrorKind::WriteZero.into(),
                ));
                break;
            }
            Event::Written(Ok(n)) => pending.advance(n),
            Event::Written(Err(e)) => {
                connection.abort(TransportError::io("Failed to write to socket", e));
                break;
            }
            Event::Read(Ok(0)) => {
                debug!("Peer closed the connection");
                connection.abort(TransportError::closed("peer closed the connection"));
            }
            Event::Read(Ok(n)) => connection.handle_input(&buf[..n]),
            Event::Read(Err(e)) => {
                connection.abort(TransportError::io("Failed to read from socket", e));
            }
            Event::Wake => {
                if !connection.is_reading() {
                    connection.resume_reading();
                }
                connection.handle_writable();
            }
        }
    }

    if let Err(e) = writer.shutdown().await {
        trace!("Socket shutdown failed: {}", e);
    }

    match connection.stack_mut().octet_stream_mut().take_abort_reason() {
        Some(reason) if reason.is_fatal() => {
            warn!(category = reason.category(), "Connection aborted: {}", reason);
            Err(reason)
        }
        _ => Ok(()),
    }
}
