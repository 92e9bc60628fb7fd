//! Packet handler abstraction

use snoop_core::Frame;

/// Whether the dispatch loop should keep going after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Break,
}

/// Receives frames from a running capture session.
///
/// Handlers run synchronously inside the dispatch loop: they must not block,
/// or the OS buffer fills and frames are dropped. The frame borrows the
/// facility's buffer and cannot be kept past the call.
pub trait PacketHandler {
    fn on_packet(&mut self, frame: &Frame<'_>) -> Flow;
}

impl<F> PacketHandler for F
where
    F: FnMut(&Frame<'_>) -> Flow,
{
    fn on_packet(&mut self, frame: &Frame<'_>) -> Flow {
        self(frame)
    }
}
