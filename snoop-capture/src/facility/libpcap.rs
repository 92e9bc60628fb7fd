//! libpcap-backed facility

use pcap::{Active, Capture, Device, Inactive};
use snoop_core::status::{
    StatusCode, PCAP_ERROR, PCAP_ERROR_ACTIVATED, PCAP_ERROR_BREAK,
    PCAP_ERROR_CANTSET_TSTAMP_TYPE, PCAP_ERROR_IFACE_NOT_UP, PCAP_ERROR_NOT_ACTIVATED,
    PCAP_ERROR_NOT_RFMON, PCAP_ERROR_NO_SUCH_DEVICE, PCAP_ERROR_PERM_DENIED,
    PCAP_ERROR_PROMISC_PERM_DENIED, PCAP_ERROR_RFMON_NOTSUP, PCAP_ERROR_TSTAMP_PRECISION_NOTSUP,
    PCAP_SUCCESS, PCAP_WARNING, PCAP_WARNING_PROMISC_NOTSUP, PCAP_WARNING_TSTAMP_TYPE_NOTSUP,
};
use snoop_core::{Frame, PacketMeta};
use tracing::debug;

use super::{CaptureFacility, CaptureHandle, NextFrame};
use crate::interface::get_interface;

/// Facility backed by the system libpcap
#[derive(Debug, Clone, Copy, Default)]
pub struct PcapFacility;

impl PcapFacility {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureFacility for PcapFacility {
    type Handle = PcapHandle;

    fn open(&self, device: &str) -> Result<PcapHandle, String> {
        // pcap_create() accepts any name; catch missing devices up front
        if !device_exists(device) {
            return Err(format!(
                "{}: {}",
                device,
                StatusCode::NoSuchDevice.description()
            ));
        }

        let capture = Capture::from_device(device).map_err(|e| e.to_string())?;
        debug!("Created pcap handle on {}", device);

        Ok(PcapHandle {
            device: device.to_string(),
            staged: Staged::default(),
            inactive: Some(capture),
            active: None,
        })
    }
}

fn device_exists(device: &str) -> bool {
    if get_interface(device).is_ok() {
        return true;
    }

    // Pseudo-devices such as "any" only show up in pcap's own list
    Device::list()
        .map(|devices| devices.iter().any(|d| d.name == device))
        .unwrap_or(false)
}

/// Options recorded before activation.
///
/// They are replayed onto the capture at activation, and again onto a fresh
/// capture when activation has to be retried without the setting that
/// produced a warning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Staged {
    promiscuous: bool,
    monitor_mode: bool,
    snaplen: Option<i32>,
    timeout_ms: Option<i32>,
    immediate_mode: bool,
    buffer_size: Option<i32>,
}

impl Staged {
    fn apply(self, capture: Capture<Inactive>) -> Capture<Inactive> {
        let mut capture = capture
            .promisc(self.promiscuous)
            .immediate_mode(self.immediate_mode);

        #[cfg(not(target_os = "windows"))]
        {
            capture = capture.rfmon(self.monitor_mode);
        }
        if let Some(snaplen) = self.snaplen {
            capture = capture.snaplen(snaplen);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            capture = capture.timeout(timeout_ms);
        }
        if let Some(bytes) = self.buffer_size {
            capture = capture.buffer_size(bytes);
        }
        capture
    }

    /// The options minus whatever caused `warning`, if anything can be dropped
    fn without(self, warning: i32) -> Option<Staged> {
        match warning {
            PCAP_WARNING_PROMISC_NOTSUP if self.promiscuous => Some(Staged {
                promiscuous: false,
                ..self
            }),
            _ => None,
        }
    }
}

/// Handle on one libpcap capture
pub struct PcapHandle {
    device: String,
    staged: Staged,
    /// `None` once activation has consumed it
    inactive: Option<Capture<Inactive>>,
    active: Option<Capture<Active>>,
}

impl PcapHandle {
    fn stage<F>(&mut self, record: F) -> i32
    where
        F: FnOnce(&mut Staged),
    {
        if self.active.is_some() {
            return PCAP_ERROR_ACTIVATED;
        }
        if self.inactive.is_none() {
            return PCAP_ERROR;
        }
        record(&mut self.staged);
        PCAP_SUCCESS
    }

    /// Activation reported `warning` and the pcap crate dropped the capture.
    /// Build a new one without the offending option so the warning can be
    /// downgraded by the caller.
    fn reactivate(&mut self, warning: i32) -> i32 {
        let Some(fallback) = self.staged.without(warning) else {
            debug!(
                "No fallback for warning {} on {}; capture not kept",
                warning, self.device
            );
            return PCAP_ERROR;
        };

        let retry = Capture::from_device(self.device.as_str()).and_then(|c| fallback.apply(c).open());
        match retry {
            Ok(active) => {
                debug!("Reactivated {} without the option behind warning {}", self.device, warning);
                self.staged = fallback;
                self.active = Some(active);
                warning
            }
            Err(e) => {
                debug!("pcap reactivation on {} failed: {}", self.device, e);
                match status_from_error(&e) {
                    code if code < PCAP_SUCCESS => code,
                    _ => PCAP_ERROR,
                }
            }
        }
    }
}

impl CaptureHandle for PcapHandle {
    fn set_promiscuous(&mut self, enable: bool) -> i32 {
        self.stage(|staged| staged.promiscuous = enable)
    }

    #[cfg(not(target_os = "windows"))]
    fn set_monitor_mode(&mut self, enable: bool) -> i32 {
        self.stage(|staged| staged.monitor_mode = enable)
    }

    #[cfg(target_os = "windows")]
    fn set_monitor_mode(&mut self, enable: bool) -> i32 {
        if enable {
            return PCAP_ERROR_RFMON_NOTSUP;
        }
        self.stage(|staged| staged.monitor_mode = false)
    }

    fn set_snaplen(&mut self, snaplen: i32) -> i32 {
        self.stage(|staged| staged.snaplen = Some(snaplen))
    }

    fn set_timeout(&mut self, timeout_ms: i32) -> i32 {
        self.stage(|staged| staged.timeout_ms = Some(timeout_ms))
    }

    fn set_immediate_mode(&mut self, enable: bool) -> i32 {
        self.stage(|staged| staged.immediate_mode = enable)
    }

    fn set_buffer_size(&mut self, bytes: i32) -> i32 {
        self.stage(|staged| staged.buffer_size = (bytes > 0).then_some(bytes))
    }

    fn activate(&mut self) -> i32 {
        if self.active.is_some() {
            return PCAP_ERROR_ACTIVATED;
        }
        let Some(capture) = self.inactive.take() else {
            return PCAP_ERROR;
        };

        match self.staged.apply(capture).open() {
            Ok(active) => {
                self.active = Some(active);
                PCAP_SUCCESS
            }
            Err(e) => {
                debug!("pcap activation on {} failed: {}", self.device, e);
                match status_from_error(&e) {
                    code if code > PCAP_SUCCESS => self.reactivate(code),
                    code => code,
                }
            }
        }
    }

    fn next_frame(&mut self) -> NextFrame<'_> {
        let Some(capture) = self.active.as_mut() else {
            return NextFrame::Failed(PCAP_ERROR_NOT_ACTIVATED);
        };

        match capture.next_packet() {
            Ok(packet) => {
                let header = packet.header;
                let meta = PacketMeta::from_timeval(
                    header.ts.tv_sec as i64,
                    header.ts.tv_usec as i64,
                    header.caplen,
                    header.len,
                );
                NextFrame::Frame(Frame::new(meta, packet.data))
            }
            Err(pcap::Error::TimeoutExpired) => NextFrame::Idle,
            Err(pcap::Error::NoMorePackets) => NextFrame::Exhausted,
            Err(e) => NextFrame::Failed(status_from_error(&e)),
        }
    }
}

/// Recover a status code from a pcap crate error.
///
/// The crate reports failed calls as libpcap's error text rather than the
/// numeric status, so the code is recovered from the message.
fn status_from_error(error: &pcap::Error) -> i32 {
    match error {
        pcap::Error::PcapError(message) => status_from_message(message),
        _ => PCAP_ERROR,
    }
}

fn status_from_message(message: &str) -> i32 {
    let message = message.to_lowercase();
    let has = |needle: &str| message.contains(needle);

    if has("no such device") {
        PCAP_ERROR_NO_SUCH_DEVICE
    } else if has("generic warning") {
        PCAP_WARNING
    } else if has("doesn't support promiscuous mode") {
        PCAP_WARNING_PROMISC_NOTSUP
    } else if has("type of time stamp is not supported") || has("time stamp type is not supported") {
        PCAP_WARNING_TSTAMP_TYPE_NOTSUP
    } else if has("promiscuous") && has("permission") {
        PCAP_ERROR_PROMISC_PERM_DENIED
    } else if has("permission") || has("operation not permitted") {
        PCAP_ERROR_PERM_DENIED
    } else if has("not up") {
        PCAP_ERROR_IFACE_NOT_UP
    } else if has("only in monitor mode") {
        PCAP_ERROR_NOT_RFMON
    } else if has("monitor mode") {
        PCAP_ERROR_RFMON_NOTSUP
    } else if has("time stamp precision") {
        PCAP_ERROR_TSTAMP_PRECISION_NOTSUP
    } else if has("time stamp type") {
        PCAP_ERROR_CANTSET_TSTAMP_TYPE
    } else if has("already been activated") || has("already activated") {
        PCAP_ERROR_ACTIVATED
    } else if has("not yet been activated") || has("not activated") {
        PCAP_ERROR_NOT_ACTIVATED
    } else if has("breakloop") {
        PCAP_ERROR_BREAK
    } else {
        PCAP_ERROR
    }
}
