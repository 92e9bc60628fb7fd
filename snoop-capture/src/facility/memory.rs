//! In-memory facility with scripted devices

use parking_lot::Mutex;
use snoop_core::status::{
    StatusCode, PCAP_ERROR_ACTIVATED, PCAP_ERROR_NOT_ACTIVATED, PCAP_SUCCESS,
};
use snoop_core::{Frame, PacketMeta};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{CaptureFacility, CaptureHandle, NextFrame};

/// Longest simulated read timeout while stalled
const MAX_IDLE_WAIT_MS: i32 = 10;

/// Facility operation whose status can be overridden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Promiscuous,
    MonitorMode,
    Activate,
}

/// What a device does once its scripted frames run out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptEnd {
    /// Keep reporting read timeouts, like a quiet live interface
    #[default]
    Stall,
    /// Report end of input, like a finished savefile
    Exhausted,
    /// Fail the dispatch loop with a status code
    Fail(i32),
}

#[derive(Debug, Clone, Default)]
struct DeviceScript {
    frames: Arc<Vec<Vec<u8>>>,
    statuses: HashMap<Operation, i32>,
    end: ScriptEnd,
}

/// Capture facility serving scripted frames from memory.
///
/// Devices must be registered before they can be opened; opening an unknown
/// name fails the same way libpcap does for a missing interface. Each
/// released handle is counted per device.
#[derive(Debug, Clone, Default)]
pub struct MemoryFacility {
    devices: Arc<Mutex<HashMap<String, DeviceScript>>>,
    releases: Arc<Mutex<HashMap<String, usize>>>,
}

impl MemoryFacility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device that delivers `frames` in order
    pub fn with_device<S: Into<String>>(self, name: S, frames: Vec<Vec<u8>>) -> Self {
        self.devices.lock().insert(
            name.into(),
            DeviceScript {
                frames: Arc::new(frames),
                ..DeviceScript::default()
            },
        );
        self
    }

    /// Make `operation` on `device` return `code`
    pub fn with_status(self, device: &str, operation: Operation, code: i32) -> Self {
        if let Some(script) = self.devices.lock().get_mut(device) {
            script.statuses.insert(operation, code);
        }
        self
    }

    /// Set what `device` does after its frames are delivered
    pub fn with_end(self, device: &str, end: ScriptEnd) -> Self {
        if let Some(script) = self.devices.lock().get_mut(device) {
            script.end = end;
        }
        self
    }

    /// Number of handles on `device` released so far
    pub fn releases(&self, device: &str) -> usize {
        self.releases.lock().get(device).copied().unwrap_or(0)
    }
}

impl CaptureFacility for MemoryFacility {
    type Handle = MemoryHandle;

    fn open(&self, device: &str) -> Result<MemoryHandle, String> {
        let script = self.devices.lock().get(device).cloned().ok_or_else(|| {
            format!("{}: {}", device, StatusCode::NoSuchDevice.description())
        })?;

        Ok(MemoryHandle {
            device: device.to_string(),
            script,
            cursor: 0,
            activated: false,
            promiscuous: false,
            monitor_mode: false,
            timeout_ms: MAX_IDLE_WAIT_MS,
            releases: Arc::clone(&self.releases),
        })
    }
}

/// Handle on a scripted device
#[derive(Debug)]
pub struct MemoryHandle {
    device: String,
    script: DeviceScript,
    cursor: usize,
    activated: bool,
    promiscuous: bool,
    monitor_mode: bool,
    timeout_ms: i32,
    releases: Arc<Mutex<HashMap<String, usize>>>,
}

impl MemoryHandle {
    pub fn is_promiscuous(&self) -> bool {
        self.promiscuous
    }

    pub fn is_monitor_mode(&self) -> bool {
        self.monitor_mode
    }

    fn status(&self, operation: Operation) -> i32 {
        self.script
            .statuses
            .get(&operation)
            .copied()
            .unwrap_or(PCAP_SUCCESS)
    }

    fn setter(&self) -> i32 {
        if self.activated {
            PCAP_ERROR_ACTIVATED
        } else {
            PCAP_SUCCESS
        }
    }
}

impl CaptureHandle for MemoryHandle {
    fn set_promiscuous(&mut self, enable: bool) -> i32 {
        if self.activated {
            return PCAP_ERROR_ACTIVATED;
        }
        self.promiscuous = enable;
        self.status(Operation::Promiscuous)
    }

    fn set_monitor_mode(&mut self, enable: bool) -> i32 {
        if self.activated {
            return PCAP_ERROR_ACTIVATED;
        }
        self.monitor_mode = enable;
        self.status(Operation::MonitorMode)
    }

    fn set_snaplen(&mut self, _snaplen: i32) -> i32 {
        self.setter()
    }

    fn set_timeout(&mut self, timeout_ms: i32) -> i32 {
        if !self.activated {
            self.timeout_ms = timeout_ms.clamp(0, MAX_IDLE_WAIT_MS);
        }
        self.setter()
    }

    fn set_immediate_mode(&mut self, _enable: bool) -> i32 {
        self.setter()
    }

    fn set_buffer_size(&mut self, _bytes: i32) -> i32 {
        self.setter()
    }

    fn activate(&mut self) -> i32 {
        if self.activated {
            return PCAP_ERROR_ACTIVATED;
        }
        let code = self.status(Operation::Activate);
        // Warnings still leave the capture activated
        self.activated = code >= 0;
        code
    }

    fn next_frame(&mut self) -> NextFrame<'_> {
        if !self.activated {
            return NextFrame::Failed(PCAP_ERROR_NOT_ACTIVATED);
        }

        if self.cursor < self.script.frames.len() {
            let index = self.cursor;
            self.cursor += 1;
            let data = &self.script.frames[index];
            return NextFrame::Frame(Frame::new(PacketMeta::new(data.len() as u32), data));
        }

        match self.script.end {
            ScriptEnd::Stall => {
                thread::sleep(Duration::from_millis(self.timeout_ms as u64));
                NextFrame::Idle
            }
            ScriptEnd::Exhausted => NextFrame::Exhausted,
            ScriptEnd::Fail(code) => NextFrame::Failed(code),
        }
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        *self.releases.lock().entry(self.device.clone()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snoop_core::status::{PCAP_ERROR_PERM_DENIED, PCAP_WARNING_PROMISC_NOTSUP};

    fn frames(count: usize) -> Vec<Vec<u8>> {
        (0..count).map(|i| vec![i as u8; 60]).collect()
    }

    #[test]
    fn test_open_unknown_device() {
        let facility = MemoryFacility::new().with_device("lo0", frames(1));
        let err = facility.open("en9").unwrap_err();
        assert_eq!(err, "en9: no such device exists");
    }

    #[test]
    fn test_scripted_statuses() {
        let facility = MemoryFacility::new()
            .with_device("eth0", frames(0))
            .with_status("eth0", Operation::Promiscuous, PCAP_WARNING_PROMISC_NOTSUP)
            .with_status("eth0", Operation::Activate, PCAP_ERROR_PERM_DENIED);

        let mut handle = facility.open("eth0").unwrap();
        assert_eq!(handle.set_promiscuous(true), PCAP_WARNING_PROMISC_NOTSUP);
        assert!(handle.is_promiscuous());
        assert_eq!(handle.set_monitor_mode(true), PCAP_SUCCESS);
        assert_eq!(handle.activate(), PCAP_ERROR_PERM_DENIED);
        assert!(matches!(handle.next_frame(), NextFrame::Failed(PCAP_ERROR_NOT_ACTIVATED)));
    }

    #[test]
    fn test_frames_then_end() {
        let facility = MemoryFacility::new()
            .with_device("lo0", frames(2))
            .with_end("lo0", ScriptEnd::Exhausted);

        let mut handle = facility.open("lo0").unwrap();
        assert_eq!(handle.activate(), PCAP_SUCCESS);
        assert_eq!(handle.set_snaplen(128), PCAP_ERROR_ACTIVATED);

        for expected in 0..2u8 {
            match handle.next_frame() {
                NextFrame::Frame(frame) => {
                    assert_eq!(frame.len(), 60);
                    assert_eq!(frame.payload()[0], expected);
                }
                other => panic!("Expected frame, got {:?}", other),
            }
        }
        assert!(matches!(handle.next_frame(), NextFrame::Exhausted));
    }

    #[test]
    fn test_stall_reports_idle() {
        let facility = MemoryFacility::new().with_device("lo0", Vec::new());
        let mut handle = facility.open("lo0").unwrap();
        handle.set_timeout(1);
        handle.activate();
        assert!(matches!(handle.next_frame(), NextFrame::Idle));
    }

    #[test]
    fn test_release_counted_on_drop() {
        let facility = MemoryFacility::new().with_device("lo0", frames(1));
        assert_eq!(facility.releases("lo0"), 0);

        let handle = facility.open("lo0").unwrap();
        drop(handle);
        assert_eq!(facility.releases("lo0"), 1);
    }
}
