//! Layer roles
//!
//! Every layer plays up to two roles. Towards the layer above it is a
//! [`LowerLayer`]: it accepts writes and read flow control. Towards the
//! layer below it is an [`UpperLayer`]: it receives lifecycle events and
//! input. A layer that owns the rest of the chain below it implements
//! [`Stack`], which is how events enter the chain from the driver.
//!
//! Events travel bottom to top; commands travel top to bottom.

use crate::{Result, TransportError};

use super::octet_stream::OctetStream;

/// Commands an upper layer may issue to the layer beneath it
pub trait LowerLayer {
    /// Queue one unit of output
    ///
    /// For a byte stream the unit is arbitrary bytes; for a message-oriented
    /// layer each call is exactly one message.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// False once the outbound buffer is above its high watermark
    fn can_send_more(&self) -> bool;

    /// Resume delivering input
    fn request_more_input(&mut self);

    /// Stop delivering input until [`request_more_input`](Self::request_more_input)
    fn suspend_reading(&mut self);

    fn is_reading(&self) -> bool;

    /// Flush pending output, then end the connection
    fn close(&mut self);
}

/// Events a layer receives from the layer beneath it
pub trait UpperLayer {
    /// The chain below is ready; an error aborts the whole stack
    fn start(&mut self, down: &mut dyn LowerLayer) -> Result<()>;

    /// The lower layer can take more output
    fn prepare_send(&mut self, down: &mut dyn LowerLayer) -> Result<()>;

    /// Whether this layer has nothing more to send
    fn done_sending(&mut self, down: &mut dyn LowerLayer) -> bool;

    /// Process input
    ///
    /// Stream-oriented uppers receive everything buffered so far and return
    /// how many leading bytes they used; zero means "wait for more".
    /// Message-oriented uppers receive one complete message per call.
    fn consume(&mut self, down: &mut dyn LowerLayer, input: &[u8]) -> Result<usize>;

    /// Reading was resumed after a suspension
    fn continue_reading(&mut self, down: &mut dyn LowerLayer) {
        let _ = down;
    }

    /// The connection ended; called exactly once per layer
    fn abort(&mut self, reason: &TransportError);
}

/// A layer together with everything below it
///
/// Each entry point borrows the upper role for the duration of the call so
/// the chain can call back up without owning the layer above.
pub trait Stack {
    fn on_start(&mut self, up: &mut dyn UpperLayer) -> Result<()>;

    /// Bytes arrived from the transport
    fn on_input(&mut self, up: &mut dyn UpperLayer, bytes: &[u8]);

    /// Output capacity became available, or an upper layer has new output
    fn on_writable(&mut self, up: &mut dyn UpperLayer);

    /// Reading was re-enabled from outside the chain
    fn on_continue_reading(&mut self, up: &mut dyn UpperLayer);

    /// Tear the chain down; every layer sees `reason` at most once
    fn on_abort(&mut self, up: &mut dyn UpperLayer, reason: TransportError);

    /// Byte transport at the bottom of the chain
    fn octet_stream(&self) -> &OctetStream;

    fn octet_stream_mut(&mut self) -> &mut OctetStream;
}
