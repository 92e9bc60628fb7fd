//! CLI interface for snoop
//!
//! This crate provides the command-line interface for snoop: argument
//! parsing and the capture run behind the `snoop` binary.

pub mod app;
pub mod args;

pub use app::CaptureRequest;
pub use args::Cli;
