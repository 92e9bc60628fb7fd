//! snoop core library
//!
//! This crate provides the status-code classification, error handling and
//! packet types shared by the snoop capture crates.

pub mod error;
pub mod packet;
pub mod state;
pub mod status;

// Re-export commonly used types
pub use error::{Error, Result};
pub use packet::{Frame, PacketMeta};
pub use state::SessionState;
pub use status::{classify, Classification, Severity, StatusCode};
