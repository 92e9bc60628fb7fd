//! Capture session lifecycle states

use std::fmt;

/// State of a capture session
///
/// ```text
/// Created -> Configured -> Activated <-> Capturing
///    |            |            |
///    +------------+------------+--> Closed
/// any facility failure ------------> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Handle opened, nothing applied yet
    Created,
    /// At least one configuration pass applied
    Configured,
    /// Configuration committed, packets may be delivered
    Activated,
    /// Dispatch loop running
    Capturing,
    /// Handle released
    Closed,
    /// A facility call failed; the handle has been released
    Failed,
}

impl SessionState {
    /// Configuration and activation are still possible
    pub fn is_configurable(self) -> bool {
        matches!(self, SessionState::Created | SessionState::Configured)
    }

    /// The session can no longer be used for capture
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Created => "created",
            SessionState::Configured => "configured",
            SessionState::Activated => "activated",
            SessionState::Capturing => "capturing",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}
