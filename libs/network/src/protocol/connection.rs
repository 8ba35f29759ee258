//! Connection lifecycle
//!
//! A [`Connection`] pairs the application layer with the stack beneath it
//! and tracks where the pair is in its lifecycle:
//!
//! ```text
//! Initializing ──start──▶ Started ◀──drained── Suspended
//!      │                    │   └──above watermark──▲
//!      │ start failed       │ close                 │
//!      ▼                    ▼                       │
//!    Closed ◀──flushed── Closing        abort (any state) ──▶ Closed
//! ```

use bytes::Bytes;
use tracing::{debug, warn};

use super::layer::{LowerLayer, Stack, UpperLayer};
use crate::{Result, TransportError};

/// Lifecycle state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Built, not yet started
    Initializing,
    /// Reading and writing
    Started,
    /// Outbound buffer above the high watermark
    Suspended,
    /// Close requested, flushing remaining output
    Closing,
    /// Terminal
    Closed,
}

/// Application layer `A` on top of stack `S`
#[derive(Debug)]
pub struct Connection<A: UpperLayer, S: Stack> {
    app: A,
    stack: S,
    state: ConnectionState,
}

impl<A: UpperLayer, S: Stack> Connection<A, S> {
    pub fn new(app: A, stack: S) -> Self {
        Self {
            app,
            stack,
            state: ConnectionState::Initializing,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connection accepts events
    pub fn is_active(&self) -> bool {
        !matches!(
            self.state,
            ConnectionState::Initializing | ConnectionState::Closed
        )
    }

    /// Propagate start through every layer
    ///
    /// If any layer refuses, every layer is aborted and the connection
    /// ends up `Closed`.
    pub fn start(&mut self) -> Result<()> {
        if self.state != ConnectionState::Initializing {
            return Err(TransportError::configuration(
                format!("cannot start a connection in state {:?}", self.state),
                None,
            ));
        }
        match self.stack.on_start(&mut self.app) {
            Ok(()) => {
                self.state = ConnectionState::Started;
                self.refresh();
                debug!("Connection started");
                Ok(())
            }
            Err(reason) => {
                self.state = ConnectionState::Closed;
                warn!(category = reason.category(), "Connection failed to start: {}", reason);
                Err(reason)
            }
        }
    }

    /// Bytes read from the socket
    pub fn handle_input(&mut self, bytes: &[u8]) {
        if !self.is_active() {
            return;
        }
        self.stack.on_input(&mut self.app, bytes);
        self.refresh();
    }

    /// Give the layers a chance to produce output
    pub fn handle_writable(&mut self) {
        if !matches!(
            self.state,
            ConnectionState::Started | ConnectionState::Suspended
        ) {
            return;
        }
        self.stack.on_writable(&mut self.app);
        self.refresh();
    }

    /// Re-enable reading after a layer suspended it
    pub fn resume_reading(&mut self) {
        if !self.is_active() {
            return;
        }
        self.stack.on_continue_reading(&mut self.app);
        self.refresh();
    }

    /// Close from outside the stack, after pending output is flushed
    pub fn close(&mut self) {
        if !self.is_active() {
            return;
        }
        self.stack.octet_stream_mut().close();
        self.refresh();
    }

    /// Tear down every layer with `reason`
    pub fn abort(&mut self, reason: TransportError) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.stack.on_abort(&mut self.app, reason);
        self.state = ConnectionState::Closed;
    }

    /// Drain buffered output for the socket
    ///
    /// Dropping back below the watermark re-arms the writers.
    pub fn take_output(&mut self) -> Bytes {
        let stream = self.stack.octet_stream_mut();
        let was_blocked = !stream.can_send_more();
        let out = stream.take_output();
        if was_blocked && self.state == ConnectionState::Suspended {
            self.handle_writable();
        } else {
            self.refresh();
        }
        out
    }

    pub fn is_reading(&self) -> bool {
        self.is_active() && self.stack.octet_stream().is_reading()
    }

    pub fn has_output(&self) -> bool {
        self.stack.octet_stream().pending_output() > 0
    }

    /// Why the stack was torn down, if it was
    pub fn abort_reason(&self) -> Option<&TransportError> {
        self.stack.octet_stream().abort_reason()
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    fn refresh(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Initializing | ConnectionState::Closed
        ) {
            return;
        }

        let stream = self.stack.octet_stream();
        let (aborted, closing, flushed, blocked) = (
            stream.is_aborted(),
            stream.close_requested(),
            stream.pending_output() == 0,
            !stream.can_send_more(),
        );

        self.state = if aborted {
            ConnectionState::Closed
        } else if closing && flushed {
            // Orderly end: layers release their resources through abort
            self.stack
                .on_abort(&mut self.app, TransportError::closed("connection closed"));
            ConnectionState::Closed
        } else if closing {
            ConnectionState::Closing
        } else if blocked {
            ConnectionState::Suspended
        } else {
            ConnectionState::Started
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{LengthPrefixFramer, OctetStream, ProtocolConfig};

    #[derive(Default)]
    struct Probe {
        refuse_start: bool,
        aborts: Vec<String>,
    }

    impl UpperLayer for Probe {
        fn start(&mut self, _down: &mut dyn LowerLayer) -> Result<()> {
            if self.refuse_start {
                Err(TransportError::protocol("refused"))
            } else {
                Ok(())
            }
        }

        fn prepare_send(&mut self, _down: &mut dyn LowerLayer) -> Result<()> {
            Ok(())
        }

        fn done_sending(&mut self, _down: &mut dyn LowerLayer) -> bool {
            true
        }

        fn consume(&mut self, down: &mut dyn LowerLayer, input: &[u8]) -> Result<usize> {
            if input == b"bye" {
                down.close();
            }
            Ok(input.len())
        }

        fn abort(&mut self, reason: &TransportError) {
            self.aborts.push(reason.category().to_string());
        }
    }

    fn connection(app: Probe) -> Connection<Probe, LengthPrefixFramer> {
        Connection::new(
            app,
            LengthPrefixFramer::new(OctetStream::new(ProtocolConfig::default())),
        )
    }

    #[test]
    fn test_refused_start_closes() {
        let mut conn = connection(Probe {
            refuse_start: true,
            ..Probe::default()
        });
        assert_eq!(conn.state(), ConnectionState::Initializing);
        assert!(conn.start().is_err());
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.app().aborts, vec!["protocol"]);
        assert_eq!(conn.stack().metrics().aborts, 1);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut conn = connection(Probe::default());
        conn.start().unwrap();
        assert!(conn.start().is_err());
        assert_eq!(conn.state(), ConnectionState::Started);
    }

    #[test]
    fn test_orderly_close_releases_once() {
        let mut conn = connection(Probe::default());
        conn.start().unwrap();

        conn.handle_input(&[0, 0, 0, 3, b'b', b'y', b'e']);
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.app().aborts, vec!["closed"]);

        conn.abort(TransportError::protocol("late"));
        conn.handle_input(&[0, 0, 0, 0]);
        assert_eq!(conn.app().aborts.len(), 1);
        assert!(!conn.abort_reason().unwrap().is_fatal());
    }
}
