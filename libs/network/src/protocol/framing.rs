//! Length-prefix framing
//!
//! Turns the byte stream below into discrete messages for the layer above.
//! Each frame is a 4-byte big-endian payload length followed by the
//! payload. Lengths above `max_frame_size` are a protocol violation and
//! abort the stack, in both directions.

use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

use super::layer::{LowerLayer, Stack, UpperLayer};
use super::octet_stream::OctetStream;
use crate::{Result, TransportError};

/// Size of the length prefix
pub const FRAME_HEADER_LEN: usize = 4;

/// Per-connection framing counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FramerMetrics {
    pub frames_in: u64,
    pub frames_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub aborts: u64,
}

#[derive(Debug)]
struct FramerState {
    max_frame_size: usize,
    metrics: FramerMetrics,
    scratch: BytesMut,
}

/// Message-oriented layer over a byte stream
#[derive(Debug)]
pub struct LengthPrefixFramer<S: Stack = OctetStream> {
    state: FramerState,
    down: S,
}

impl<S: Stack> LengthPrefixFramer<S> {
    /// Frame on top of `down`; the size limit comes from the transport's
    /// protocol configuration, capped at what the prefix can express
    pub fn new(down: S) -> Self {
        let max_frame_size = down
            .octet_stream()
            .config()
            .max_frame_size
            .min(u32::MAX as usize);
        Self {
            state: FramerState {
                max_frame_size,
                metrics: FramerMetrics::default(),
                scratch: BytesMut::new(),
            },
            down,
        }
    }

    pub fn metrics(&self) -> FramerMetrics {
        self.state.metrics
    }

    pub fn max_frame_size(&self) -> usize {
        self.state.max_frame_size
    }

    pub fn lower(&self) -> &S {
        &self.down
    }
}

impl<S: Stack> Stack for LengthPrefixFramer<S> {
    fn on_start(&mut self, up: &mut dyn UpperLayer) -> Result<()> {
        let mut framed = FramedUpper {
            state: &mut self.state,
            up,
        };
        self.down.on_start(&mut framed)
    }

    fn on_input(&mut self, up: &mut dyn UpperLayer, bytes: &[u8]) {
        let mut framed = FramedUpper {
            state: &mut self.state,
            up,
        };
        self.down.on_input(&mut framed, bytes)
    }

    fn on_writable(&mut self, up: &mut dyn UpperLayer) {
        let mut framed = FramedUpper {
            state: &mut self.state,
            up,
        };
        self.down.on_writable(&mut framed)
    }

    fn on_continue_reading(&mut self, up: &mut dyn UpperLayer) {
        let mut framed = FramedUpper {
            state: &mut self.state,
            up,
        };
        self.down.on_continue_reading(&mut framed)
    }

    fn on_abort(&mut self, up: &mut dyn UpperLayer, reason: TransportError) {
        let mut framed = FramedUpper {
            state: &mut self.state,
            up,
        };
        self.down.on_abort(&mut framed, reason)
    }

    fn octet_stream(&self) -> &OctetStream {
        self.down.octet_stream()
    }

    fn octet_stream_mut(&mut self) -> &mut OctetStream {
        self.down.octet_stream_mut()
    }
}

/// The framer as seen from below: splits input into frames
struct FramedUpper<'a> {
    state: &'a mut FramerState,
    up: &'a mut dyn UpperLayer,
}

/// The framer as seen from above: prefixes each write
struct FramedLower<'a> {
    state: &'a mut FramerState,
    down: &'a mut dyn LowerLayer,
}

impl UpperLayer for FramedUpper<'_> {
    fn start(&mut self, down: &mut dyn LowerLayer) -> Result<()> {
        let mut lower = FramedLower {
            state: &mut *self.state,
            down,
        };
        self.up.start(&mut lower)
    }

    fn prepare_send(&mut self, down: &mut dyn LowerLayer) -> Result<()> {
        let mut lower = FramedLower {
            state: &mut *self.state,
            down,
        };
        self.up.prepare_send(&mut lower)
    }

    fn done_sending(&mut self, down: &mut dyn LowerLayer) -> bool {
        let mut lower = FramedLower {
            state: &mut *self.state,
            down,
        };
        self.up.done_sending(&mut lower)
    }

    fn consume(&mut self, down: &mut dyn LowerLayer, input: &[u8]) -> Result<usize> {
        let mut offset = 0;
        while input.len() - offset >= FRAME_HEADER_LEN {
            let header = &input[offset..offset + FRAME_HEADER_LEN];
            let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
            if len > self.state.max_frame_size {
                return Err(TransportError::protocol(format!(
                    "frame header announces {} bytes, limit is {}",
                    len, self.state.max_frame_size
                )));
            }
            let end = offset + FRAME_HEADER_LEN + len;
            if input.len() < end {
                break;
            }

            self.state.metrics.frames_in += 1;
            self.state.metrics.bytes_in += len as u64;
            trace!(len, "Frame received");

            let frame = &input[offset + FRAME_HEADER_LEN..end];
            let mut lower = FramedLower {
                state: &mut *self.state,
                down: &mut *down,
            };
            self.up.consume(&mut lower, frame)?;
            offset = end;

            if !down.is_reading() {
                break;
            }
        }
        Ok(offset)
    }

    fn continue_reading(&mut self, down: &mut dyn LowerLayer) {
        let mut lower = FramedLower {
            state: &mut *self.state,
            down,
        };
        self.up.continue_reading(&mut lower)
    }

    fn abort(&mut self, reason: &TransportError) {
        self.state.metrics.aborts += 1;
        debug!(
            frames_in = self.state.metrics.frames_in,
            frames_out = self.state.metrics.frames_out,
            "Framer aborted: {}",
            reason
        );
        self.up.abort(reason)
    }
}

impl LowerLayer for FramedLower<'_> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len())
            .ok()
            .filter(|_| bytes.len() <= self.state.max_frame_size)
            .ok_or_else(|| {
                TransportError::protocol(format!(
                    "outbound frame of {} bytes exceeds limit of {}",
                    bytes.len(),
                    self.state.max_frame_size
                ))
            })?;

        // Header and payload go down as one write
        let scratch = &mut self.state.scratch;
        scratch.clear();
        scratch.reserve(FRAME_HEADER_LEN + bytes.len());
        scratch.put_u32(len);
        scratch.extend_from_slice(bytes);
        self.down.write(&scratch[..])?;

        self.state.metrics.frames_out += 1;
        self.state.metrics.bytes_out += bytes.len() as u64;
        Ok(())
    }

    fn can_send_more(&self) -> bool {
        self.down.can_send_more()
    }

    fn request_more_input(&mut self) {
        self.down.request_more_input()
    }

    fn suspend_reading(&mut self) {
        self.down.suspend_reading()
    }

    fn is_reading(&self) -> bool {
        self.down.is_reading()
    }

    fn close(&mut self) {
        self.down.close()
    }
}
