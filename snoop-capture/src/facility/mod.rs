//! Capture facility seam
//!
//! A facility opens handles on named devices. A handle exposes the raw
//! libpcap-style operations: each configuration call returns a status code
//! and frames are pulled one at a time. Releasing a handle is dropping it.

mod memory;
mod libpcap;

pub use self::memory::{MemoryFacility, MemoryHandle, Operation, ScriptEnd};
pub use self::libpcap::{PcapFacility, PcapHandle};

use snoop_core::Frame;

/// Outcome of asking a handle for the next frame
#[derive(Debug)]
pub enum NextFrame<'a> {
    /// A frame, borrowed from the handle's buffer
    Frame(Frame<'a>),
    /// Nothing arrived within the read timeout
    Idle,
    /// The source has no more frames
    Exhausted,
    /// The facility failed with a status code
    Failed(i32),
}

/// Source of capture handles
pub trait CaptureFacility {
    type Handle: CaptureHandle;

    /// Open a handle bound to `device`, or return the facility's error detail
    fn open(&self, device: &str) -> Result<Self::Handle, String>;
}

/// One open capture handle
///
/// Configuration calls are only meaningful before [`CaptureHandle::activate`].
pub trait CaptureHandle: Send {
    fn set_promiscuous(&mut self, enable: bool) -> i32;

    fn set_monitor_mode(&mut self, enable: bool) -> i32;

    fn set_snaplen(&mut self, snaplen: i32) -> i32;

    fn set_timeout(&mut self, timeout_ms: i32) -> i32;

    fn set_immediate_mode(&mut self, enable: bool) -> i32;

    fn set_buffer_size(&mut self, bytes: i32) -> i32;

    /// Commit the configuration. Positive return values are warnings.
    fn activate(&mut self) -> i32;

    /// Pull the next frame. Must not block longer than the read timeout.
    fn next_frame(&mut self) -> NextFrame<'_>;
}
