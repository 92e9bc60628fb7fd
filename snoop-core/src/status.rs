//! libpcap status codes and their classification
//!
//! Every call into the capture facility that yields a status code is
//! classified here. The mapping is total: any code outside the table
//! classifies as "unknown error", so a caller always gets a message.

use std::fmt;

/// Category text used for codes outside the table
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Successful status
pub const PCAP_SUCCESS: i32 = 0;

/// Interface is a loopback device (shares its value with `PCAP_WARNING`)
pub const PCAP_IF_LOOPBACK: i32 = 0x0000_0001;
/// Generic error
pub const PCAP_ERROR: i32 = -1;
pub const PCAP_ERROR_BREAK: i32 = -2;
pub const PCAP_ERROR_NOT_ACTIVATED: i32 = -3;
pub const PCAP_ERROR_ACTIVATED: i32 = -4;
pub const PCAP_ERROR_NO_SUCH_DEVICE: i32 = -5;
pub const PCAP_ERROR_RFMON_NOTSUP: i32 = -6;
pub const PCAP_ERROR_NOT_RFMON: i32 = -7;
pub const PCAP_ERROR_PERM_DENIED: i32 = -8;
pub const PCAP_ERROR_IFACE_NOT_UP: i32 = -9;
pub const PCAP_ERROR_CANTSET_TSTAMP_TYPE: i32 = -10;
pub const PCAP_ERROR_PROMISC_PERM_DENIED: i32 = -11;
pub const PCAP_ERROR_TSTAMP_PRECISION_NOTSUP: i32 = -12;
pub const PCAP_WARNING: i32 = 1;
pub const PCAP_WARNING_PROMISC_NOTSUP: i32 = 2;
pub const PCAP_WARNING_TSTAMP_TYPE_NOTSUP: i32 = 3;

/// Whether a status code is advisory or a hard failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The operation succeeded but something was not honoured
    Warning,
    /// The operation failed
    Error,
}

impl Severity {
    /// Severity implied by the sign of a libpcap status code
    pub fn of(code: i32) -> Self {
        if code > 0 {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Known libpcap status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    IfLoopback,
    Break,
    NotActivated,
    Activated,
    NoSuchDevice,
    RfmonNotSupported,
    NotRfmon,
    PermDenied,
    IfaceNotUp,
    CantSetTstampType,
    PromiscPermDenied,
    TstampPrecisionNotSupported,
    Warning,
    PromiscNotSupported,
    TstampTypeNotSupported,
}

impl StatusCode {
    /// Every known status, in lookup order
    pub const ALL: [StatusCode; 15] = [
        StatusCode::IfLoopback,
        StatusCode::Break,
        StatusCode::NotActivated,
        StatusCode::Activated,
        StatusCode::NoSuchDevice,
        StatusCode::RfmonNotSupported,
        StatusCode::NotRfmon,
        StatusCode::PermDenied,
        StatusCode::IfaceNotUp,
        StatusCode::CantSetTstampType,
        StatusCode::PromiscPermDenied,
        StatusCode::TstampPrecisionNotSupported,
        StatusCode::Warning,
        StatusCode::PromiscNotSupported,
        StatusCode::TstampTypeNotSupported,
    ];

    /// Look up a raw code.
    ///
    /// `PCAP_IF_LOOPBACK` and `PCAP_WARNING` share a value; lookup order puts
    /// loopback first, so `1` resolves to [`StatusCode::IfLoopback`].
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Raw libpcap value
    pub const fn code(self) -> i32 {
        match self {
            StatusCode::IfLoopback => PCAP_IF_LOOPBACK,
            StatusCode::Break => PCAP_ERROR_BREAK,
            StatusCode::NotActivated => PCAP_ERROR_NOT_ACTIVATED,
            StatusCode::Activated => PCAP_ERROR_ACTIVATED,
            StatusCode::NoSuchDevice => PCAP_ERROR_NO_SUCH_DEVICE,
            StatusCode::RfmonNotSupported => PCAP_ERROR_RFMON_NOTSUP,
            StatusCode::NotRfmon => PCAP_ERROR_NOT_RFMON,
            StatusCode::PermDenied => PCAP_ERROR_PERM_DENIED,
            StatusCode::IfaceNotUp => PCAP_ERROR_IFACE_NOT_UP,
            StatusCode::CantSetTstampType => PCAP_ERROR_CANTSET_TSTAMP_TYPE,
            StatusCode::PromiscPermDenied => PCAP_ERROR_PROMISC_PERM_DENIED,
            StatusCode::TstampPrecisionNotSupported => PCAP_ERROR_TSTAMP_PRECISION_NOTSUP,
            StatusCode::Warning => PCAP_WARNING,
            StatusCode::PromiscNotSupported => PCAP_WARNING_PROMISC_NOTSUP,
            StatusCode::TstampTypeNotSupported => PCAP_WARNING_TSTAMP_TYPE_NOTSUP,
        }
    }

    /// Human-readable category
    pub const fn description(self) -> &'static str {
        match self {
            StatusCode::IfLoopback => "don't try to sniff loopback",
            StatusCode::Break => "loop terminated by pcap_breakloop",
            StatusCode::NotActivated => "the capture needs to be activated",
            StatusCode::Activated => {
                "the operation can't be performed on already activated captures"
            }
            StatusCode::NoSuchDevice => "no such device exists",
            StatusCode::RfmonNotSupported => "this device doesn't support rfmon (monitor) mode",
            StatusCode::NotRfmon => "operation supported only in monitor mode",
            StatusCode::PermDenied => "no permission to open the device (did you try sudo?)",
            StatusCode::IfaceNotUp => "interface isn't up",
            StatusCode::CantSetTstampType => {
                "this device doesn't support setting the time stamp type"
            }
            StatusCode::PromiscPermDenied => {
                "you don't have permission to capture in promiscuous mode"
            }
            StatusCode::TstampPrecisionNotSupported => {
                "the requested time stamp precision is not supported"
            }
            StatusCode::Warning => "generic warning code",
            StatusCode::PromiscNotSupported => "this device doesn't support promiscuous mode",
            StatusCode::TstampTypeNotSupported => "the requested time stamp type is not supported",
        }
    }

    pub fn severity(self) -> Severity {
        Severity::of(self.code())
    }
}

/// Result of classifying a raw status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Classification {
    code: i32,
    status: Option<StatusCode>,
}

impl Classification {
    /// Classification for a code outside the table
    pub const fn unknown(code: i32) -> Self {
        Self { code, status: None }
    }

    /// Raw code that was classified
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Known status, if the code is in the table
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn is_known(&self) -> bool {
        self.status.is_some()
    }

    /// Category text without the raw code
    pub fn description(&self) -> &'static str {
        self.status
            .map(StatusCode::description)
            .unwrap_or(UNKNOWN_ERROR)
    }

    pub fn severity(&self) -> Severity {
        Severity::of(self.code)
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl From<StatusCode> for Classification {
    fn from(status: StatusCode) -> Self {
        Self {
            code: status.code(),
            status: Some(status),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code)
    }
}

/// Classify a raw libpcap status code
pub fn classify(code: i32) -> Classification {
    Classification {
        code,
        status: StatusCode::from_code(code),
    }
}
