//! snoop: count packets captured on a network interface

use snoop_capture::{list_interfaces, Analyser, PcapFacility, StopHandle};
use snoop_cli::{app, Cli};
use std::process;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let policy = cli.error_policy();

    if cli.list_interfaces {
        let Ok(interfaces) = policy.enforce(list_interfaces()) else {
            process::exit(1);
        };
        for iface in interfaces {
            let flags = match (iface.is_up, iface.is_loopback) {
                (true, true) => "up, loopback",
                (true, false) => "up",
                (false, true) => "down, loopback",
                (false, false) => "down",
            };
            println!("{:<16} {:<14} {}", iface.name, flags, iface.description);
        }
        return;
    }

    let Some(request) = cli.request() else {
        // clap enforces DEVICE and COUNT unless listing interfaces
        process::exit(2);
    };

    let stop = StopHandle::new();
    let on_interrupt = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Interrupt received, stopping capture");
        on_interrupt.stop();
    }) {
        warn!("Couldn't install Ctrl-C handler: {}", e);
    }

    let analyser = Analyser::new();
    let result = app::capture(&PcapFacility::new(), &request, &analyser, stop);
    if policy.enforce(result).is_err() {
        process::exit(1);
    }

    println!("Packet count {}", analyser.current_count());
    println!("{}", analyser.snapshot().format());
}
