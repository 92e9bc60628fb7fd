//! CLI argument parsing

use clap::Parser;
use snoop_capture::{CaptureOptions, ErrorPolicy, FatalAction, WarningPolicy};

use crate::app::CaptureRequest;

#[derive(Parser, Debug)]
#[command(name = "snoop")]
#[command(version, about = "Count packets captured on a network interface", long_about = None)]
pub struct Cli {
    /// Network interface to capture on
    #[arg(value_name = "DEVICE", required_unless_present = "list_interfaces")]
    pub device: Option<String>,

    /// Number of packets to capture
    #[arg(
        value_name = "COUNT",
        required_unless_present = "list_interfaces",
        value_parser = clap::value_parser!(i32).range(1..)
    )]
    pub count: Option<i32>,

    /// Don't put the interface in promiscuous mode
    #[arg(long)]
    pub no_promisc: bool,

    /// Don't request monitor (rfmon) mode
    #[arg(long)]
    pub no_monitor: bool,

    /// Continue when the capture facility only reports a warning
    #[arg(long)]
    pub allow_warnings: bool,

    /// Snapshot length in bytes
    #[arg(short = 's', long, default_value_t = 65535)]
    pub snaplen: i32,

    /// Read timeout in milliseconds
    #[arg(short = 't', long, value_name = "MS", default_value_t = 1000)]
    pub timeout_ms: i32,

    /// List available network interfaces and exit
    #[arg(short = 'l', long)]
    pub list_interfaces: bool,

    /// Verbose output (-v, -vv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable color output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Options applied to the capture before activation
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions::default()
            .with_promiscuous(!self.no_promisc)
            .with_monitor_mode(!self.no_monitor)
            .with_snaplen(self.snaplen)
            .with_timeout(self.timeout_ms)
    }

    /// The binary always terminates on a fatal error
    pub fn error_policy(&self) -> ErrorPolicy {
        let warnings = if self.allow_warnings {
            WarningPolicy::Downgrade
        } else {
            WarningPolicy::Fatal
        };
        ErrorPolicy::default()
            .with_warnings(warnings)
            .with_fatal_action(FatalAction::Exit)
    }

    /// Default log filter for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Capture request, absent when only listing interfaces
    pub fn request(&self) -> Option<CaptureRequest> {
        let device = self.device.clone()?;
        let count = self.count?;
        Some(CaptureRequest {
            device,
            count,
            options: self.capture_options(),
            policy: self.error_policy(),
        })
    }
}
