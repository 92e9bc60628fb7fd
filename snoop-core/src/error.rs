//! Error types for snoop

use crate::state::SessionState;
use crate::status::Classification;
use thiserror::Error;

/// Result type alias for snoop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for snoop
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The capture facility could not open the device
    #[error("Couldn't open '{device}': {detail}")]
    Open { device: String, detail: String },

    /// A configuration flag was rejected by the facility
    #[error("Couldn't set {option} on '{device}': {classification}")]
    Configure {
        device: String,
        option: &'static str,
        classification: Classification,
    },

    /// Activation was rejected by the facility
    #[error("Error activating '{device}': {classification}")]
    Activate {
        device: String,
        classification: Classification,
    },

    /// The facility failed while delivering packets
    #[error("Capture loop on '{device}' failed: {classification}")]
    Dispatch {
        device: String,
        classification: Classification,
    },

    /// Configuration or activation requested on an activated capture
    #[error("The operation can't be performed on an already activated capture")]
    AlreadyActivated,

    /// Lifecycle method called out of order
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Invalid argument
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Interface enumeration error
    #[error("Interface error: {0}")]
    Interface(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(name: S, reason: S) -> Self {
        Error::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Classification carried by facility-reported errors
    pub fn classification(&self) -> Option<&Classification> {
        match self {
            Error::Configure { classification, .. }
            | Error::Activate { classification, .. }
            | Error::Dispatch { classification, .. } => Some(classification),
            _ => None,
        }
    }

    /// Whether this error only carries an advisory status code
    pub fn is_warning(&self) -> bool {
        self.classification()
            .map(Classification::is_warning)
            .unwrap_or(false)
    }

    /// Device the failing facility call was made on
    pub fn device(&self) -> Option<&str> {
        match self {
            Error::Open { device, .. }
            | Error::Configure { device, .. }
            | Error::Activate { device, .. }
            | Error::Dispatch { device, .. } => Some(device.as_str()),
            Error::InterfaceNotFound(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Whether the facility itself reported this error, as opposed to a
    /// caller mistake such as an out-of-order call
    pub fn is_facility_error(&self) -> bool {
        matches!(
            self,
            Error::Open { .. }
                | Error::Configure { .. }
                | Error::Activate { .. }
                | Error::Dispatch { .. }
        )
    }
}
