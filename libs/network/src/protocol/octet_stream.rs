//! Byte transport at the bottom of every stack
//!
//! The stream itself does no I/O. The driver feeds it received bytes and
//! drains its outbound buffer into the socket; in between, the stream owns
//! buffering, read flow control and write backpressure.

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use super::layer::{LowerLayer, Stack, UpperLayer};
use super::ProtocolConfig;
use crate::{Result, TransportError};

/// Buffered byte stream
#[derive(Debug)]
pub struct OctetStream {
    config: ProtocolConfig,
    inbound: BytesMut,
    outbound: BytesMut,
    reading: bool,
    close_requested: bool,
    aborted: bool,
    abort_reason: Option<TransportError>,
    bytes_received: u64,
    bytes_sent: u64,
}

impl OctetStream {
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            config,
            inbound: BytesMut::with_capacity(config.read_chunk_size),
            outbound: BytesMut::with_capacity(config.read_chunk_size),
            reading: false,
            close_requested: false,
            aborted: false,
            abort_reason: None,
            bytes_received: 0,
            bytes_sent: 0,
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Bytes waiting to be written to the socket
    pub fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    /// Hand all buffered output to the driver
    pub fn take_output(&mut self) -> Bytes {
        let out = self.outbound.split().freeze();
        self.bytes_sent += out.len() as u64;
        out
    }

    /// Bytes received but not yet consumed by the layer above
    pub fn buffered_input(&self) -> usize {
        self.inbound.len()
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Whether the chain has been torn down
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Reason the chain was torn down with
    pub fn abort_reason(&self) -> Option<&TransportError> {
        self.abort_reason.as_ref()
    }

    pub fn take_abort_reason(&mut self) -> Option<TransportError> {
        self.abort_reason.take()
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    fn deliver(&mut self, up: &mut dyn UpperLayer) {
        while self.reading && !self.aborted && !self.inbound.is_empty() {
            let mut input = std::mem::take(&mut self.inbound);
            match up.consume(self, &input) {
                Ok(0) => {
                    self.inbound = input;
                    break;
                }
                Ok(n) if n > input.len() => {
                    let reason = TransportError::protocol(format!(
                        "upper layer consumed {} of {} buffered bytes",
                        n,
                        input.len()
                    ));
                    self.fail(up, reason);
                }
                Ok(n) => {
                    let _ = input.split_to(n);
                    self.inbound = input;
                }
                Err(reason) => self.fail(up, reason),
            }
        }
    }

    fn fail(&mut self, up: &mut dyn UpperLayer, reason: TransportError) {
        if self.aborted {
            return;
        }
        self.aborted = true;
        self.reading = false;
        self.inbound.clear();
        self.outbound.clear();
        debug!(
            category = reason.category(),
            fatal = reason.is_fatal(),
            received = self.bytes_received,
            sent = self.bytes_sent,
            "Aborting protocol stack: {}",
            reason
        );
        up.abort(&reason);
        self.abort_reason = Some(reason);
    }
}

impl LowerLayer for OctetStream {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.aborted || self.close_requested {
            return Err(TransportError::closed("write after close"));
        }
        self.outbound.extend_from_slice(bytes);
        Ok(())
    }

    fn can_send_more(&self) -> bool {
        !self.aborted && self.outbound.len() < self.config.write_high_watermark
    }

    fn request_more_input(&mut self) {
        if !self.aborted {
            self.reading = true;
        }
    }

    fn suspend_reading(&mut self) {
        self.reading = false;
    }

    fn is_reading(&self) -> bool {
        self.reading && !self.aborted
    }

    fn close(&mut self) {
        if !self.close_requested {
            trace!(pending = self.outbound.len(), "Close requested");
        }
        self.close_requested = true;
        self.reading = false;
    }
}

impl Stack for OctetStream {
    fn on_start(&mut self, up: &mut dyn UpperLayer) -> Result<()> {
        self.reading = true;
        if let Err(reason) = up.start(self) {
            self.fail(up, reason);
            return Err(self
                .take_abort_reason()
                .unwrap_or_else(|| TransportError::closed("start failed")));
        }
        Ok(())
    }

    fn on_input(&mut self, up: &mut dyn UpperLayer, bytes: &[u8]) {
        if self.aborted {
            return;
        }
        self.bytes_received += bytes.len() as u64;
        self.inbound.extend_from_slice(bytes);
        self.deliver(up);
    }

    fn on_writable(&mut self, up: &mut dyn UpperLayer) {
        if self.aborted {
            return;
        }
        if let Err(reason) = up.prepare_send(self) {
            self.fail(up, reason);
            return;
        }
        let done = up.done_sending(self);
        trace!(done, pending = self.outbound.len(), "Upper layers flushed");
        self.deliver(up);
    }

    fn on_continue_reading(&mut self, up: &mut dyn UpperLayer) {
        // A requested close keeps input off for good
        if self.aborted || self.close_requested {
            return;
        }
        self.reading = true;
        up.continue_reading(self);
        self.deliver(up);
    }

    fn on_abort(&mut self, up: &mut dyn UpperLayer, reason: TransportError) {
        self.fail(up, reason);
    }

    fn octet_stream(&self) -> &OctetStream {
        self
    }

    fn octet_stream_mut(&mut self) -> &mut OctetStream {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Consumes fixed-size records and counts callbacks
    #[derive(Default)]
    struct Records {
        record_len: usize,
        records: Vec<Vec<u8>>,
        aborts: usize,
        suspend_after: Option<usize>,
    }

    impl UpperLayer for Records {
        fn start(&mut self, _down: &mut dyn LowerLayer) -> Result<()> {
            Ok(())
        }

        fn prepare_send(&mut self, _down: &mut dyn LowerLayer) -> Result<()> {
            Ok(())
        }

        fn done_sending(&mut self, _down: &mut dyn LowerLayer) -> bool {
            true
        }

        fn consume(&mut self, down: &mut dyn LowerLayer, input: &[u8]) -> Result<usize> {
            if input.len() < self.record_len {
                return Ok(0);
            }
            self.records.push(input[..self.record_len].to_vec());
            if self.suspend_after == Some(self.records.len()) {
                down.suspend_reading();
            }
            Ok(self.record_len)
        }

        fn abort(&mut self, _reason: &TransportError) {
            self.aborts += 1;
        }
    }

    fn config() -> ProtocolConfig {
        ProtocolConfig {
            write_high_watermark: 8,
            ..ProtocolConfig::default()
        }
    }

    #[test]
    fn test_partial_input_is_kept_until_complete() {
        let mut stream = OctetStream::new(config());
        let mut up = Records {
            record_len: 3,
            ..Records::default()
        };
        stream.on_start(&mut up).unwrap();

        stream.on_input(&mut up, b"abcde");
        assert_eq!(up.records, vec![b"abc".to_vec()]);
        assert_eq!(stream.buffered_input(), 2);

        stream.on_input(&mut up, b"f");
        assert_eq!(up.records.len(), 2);
        assert_eq!(stream.buffered_input(), 0);
    }

    #[test]
    fn test_suspended_reading_holds_input() {
        let mut stream = OctetStream::new(config());
        let mut up = Records {
            record_len: 1,
            suspend_after: Some(1),
            ..Records::default()
        };
        stream.on_start(&mut up).unwrap();

        stream.on_input(&mut up, b"xyz");
        assert_eq!(up.records.len(), 1);
        assert!(!stream.is_reading());
        assert_eq!(stream.buffered_input(), 2);

        stream.on_continue_reading(&mut up);
        assert_eq!(up.records.len(), 3);
    }

    #[test]
    fn test_watermark_backpressure() {
        let mut stream = OctetStream::new(config());
        assert!(stream.can_send_more());
        stream.write(b"12345678").unwrap();
        assert!(!stream.can_send_more());

        assert_eq!(stream.take_output().len(), 8);
        assert!(stream.can_send_more());
        assert_eq!(stream.bytes_sent(), 8);
    }

    #[test]
    fn test_abort_reaches_upper_once() {
        let mut stream = OctetStream::new(config());
        let mut up = Records::default();
        stream.on_start(&mut up).unwrap();

        stream.on_abort(&mut up, TransportError::protocol("first"));
        stream.on_abort(&mut up, TransportError::protocol("second"));
        assert_eq!(up.aborts, 1);
        assert!(stream.abort_reason().unwrap().to_string().contains("first"));
        assert!(stream.write(b"late").is_err());
    }

    #[test]
    fn test_continue_reading_after_close_stays_off() {
        let mut stream = OctetStream::new(config());
        let mut up = Records {
            record_len: 1,
            ..Records::default()
        };
        stream.on_start(&mut up).unwrap();
        stream.close();

        stream.on_continue_reading(&mut up);
        assert!(!stream.is_reading());
        stream.on_input(&mut up, b"ab");
        assert!(up.records.is_empty());
    }
}
