//! Fatal-versus-recoverable error policy

use snoop_core::{Classification, Error, Result};
use std::process;
use tracing::{error, info};

/// How advisory (positive) status codes are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningPolicy {
    /// Any non-zero status fails the step
    #[default]
    Fatal,
    /// Warnings are logged and the step succeeds
    Downgrade,
}

/// What happens once an error is judged fatal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FatalAction {
    /// Log the error and terminate the process with status 1
    #[default]
    Exit,
    /// Hand the error back to the caller
    Return,
}

/// Error policy applied by a capture session and its embedding caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorPolicy {
    pub warnings: WarningPolicy,
    pub on_fatal: FatalAction,
}

impl ErrorPolicy {
    /// Policy that never terminates the process
    pub fn recoverable() -> Self {
        Self {
            warnings: WarningPolicy::Fatal,
            on_fatal: FatalAction::Return,
        }
    }

    pub fn with_warnings(mut self, warnings: WarningPolicy) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_fatal_action(mut self, on_fatal: FatalAction) -> Self {
        self.on_fatal = on_fatal;
        self
    }

    /// Whether a non-zero status stops the session
    pub fn is_fatal(&self, classification: &Classification) -> bool {
        match self.warnings {
            WarningPolicy::Fatal => true,
            WarningPolicy::Downgrade => !classification.is_warning(),
        }
    }

    /// Apply the fatal action to a result.
    ///
    /// With [`FatalAction::Exit`] an error never returns: it is logged and the
    /// process exits with status 1.
    pub fn enforce<T>(&self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => match self.on_fatal {
                FatalAction::Return => Err(e),
                FatalAction::Exit => terminate(&e),
            },
        }
    }
}

/// Process exit status for a capture outcome
pub fn exit_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn terminate(e: &Error) -> ! {
    match e.device() {
        Some(device) => error!(device, "Error: {}", e),
        None => error!("Error: {}", e),
    }
    info!("Exiting");
    process::exit(1)
}
