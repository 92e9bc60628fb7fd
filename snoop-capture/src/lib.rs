//! Packet capture sessions for snoop
//!
//! This crate drives one capture handle per device through its lifecycle
//! and dispatches each captured frame to application code.
//!
//! ## Features
//!
//! - **Explicit lifecycle**: open, configure, activate, run and close are
//!   validated against the session state
//! - **Classified errors**: every facility status code becomes a typed error
//! - **Borrowed frames**: handlers see the facility's buffer for exactly one call
//! - **Cancellation**: a [`StopHandle`] interrupts a running loop
//! - **Shared counting**: one [`Analyser`] can be fed by sessions on many threads
//!
//! ## Example
//!
//! ```no_run
//! use snoop_capture::{Analyser, CaptureOptions, CaptureSession, PcapFacility};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let analyser = Analyser::new();
//!
//! let mut session = CaptureSession::open(&PcapFacility::new(), "en0")?;
//! session.configure(&CaptureOptions::default())?;
//! session.activate()?;
//! session.run(20, analyser.clone())?;
//! session.close();
//!
//! println!("Packet count {}", analyser.current_count());
//! # Ok(())
//! # }
//! ```

pub mod analyser;
pub mod facility;
pub mod handler;
pub mod interface;
pub mod policy;
pub mod session;

// Re-export main types
pub use analyser::{Analyser, AnalyserReport};
pub use facility::{
    CaptureFacility, CaptureHandle, MemoryFacility, NextFrame, Operation, PcapFacility, ScriptEnd,
};
pub use handler::{Flow, PacketHandler};
pub use interface::{get_interface, list_interfaces, InterfaceInfo};
pub use policy::{exit_code, ErrorPolicy, FatalAction, WarningPolicy};
pub use session::{CaptureOptions, CaptureSession, RunOutcome, StopHandle, StopReason};
