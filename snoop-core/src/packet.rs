//! Packet types

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Per-frame metadata reported by the capture facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketMeta {
    /// When the frame was captured
    pub timestamp: SystemTime,
    /// Number of bytes actually captured
    pub caplen: u32,
    /// Length of the frame on the wire
    pub len: u32,
}

impl PacketMeta {
    /// Metadata for an untruncated frame captured now
    pub fn new(len: u32) -> Self {
        Self {
            timestamp: SystemTime::now(),
            caplen: len,
            len,
        }
    }

    /// Build metadata from a `timeval`-style timestamp.
    ///
    /// Timestamps before the epoch are clamped to it.
    pub fn from_timeval(secs: i64, micros: i64, caplen: u32, len: u32) -> Self {
        let secs = u64::try_from(secs).unwrap_or(0);
        let micros = u64::try_from(micros).unwrap_or(0);
        Self {
            timestamp: UNIX_EPOCH + Duration::from_secs(secs) + Duration::from_micros(micros),
            caplen,
            len,
        }
    }

    /// Whether the snapshot length cut the frame short
    pub fn is_truncated(&self) -> bool {
        self.caplen < self.len
    }
}

/// A captured frame, borrowed from the capture facility.
///
/// The payload is only valid for the duration of one handler invocation;
/// the lifetime prevents it from being retained. Copy it out with
/// [`Frame::to_vec`] if it must outlive the callback.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    meta: PacketMeta,
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(meta: PacketMeta, payload: &'a [u8]) -> Self {
        Self { meta, payload }
    }

    pub fn meta(&self) -> &PacketMeta {
        &self.meta
    }

    /// Captured bytes (including all headers)
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Get captured length
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if frame is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Copy the payload out of the facility's buffer
    pub fn to_vec(&self) -> Vec<u8> {
        self.payload.to_vec()
    }
}
