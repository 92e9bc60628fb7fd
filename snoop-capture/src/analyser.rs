//! Packet counting analyser

use snoop_core::Frame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::handler::{Flow, PacketHandler};

/// Point-in-time view of an [`Analyser`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserReport {
    /// Packets counted
    pub packets: u64,
    /// Time since the analyser was created
    pub elapsed: Duration,
    /// Packets per second
    pub packets_per_second: f64,
}

impl AnalyserReport {
    /// Format the report as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Packets: {}\nDuration: {:.2}s\nRate: {:.2} pps",
            self.packets,
            self.elapsed.as_secs_f64(),
            self.packets_per_second
        )
    }
}

/// Shared packet counter fed from capture callbacks.
///
/// Clones share the same count, so one analyser can be handed to several
/// sessions running on different threads. Only packets are counted; the
/// frame content is not inspected.
#[derive(Debug, Clone)]
pub struct Analyser {
    packets: Arc<AtomicU64>,
    started: Instant,
}

impl Analyser {
    pub fn new() -> Self {
        Self {
            packets: Arc::new(AtomicU64::new(0)),
            started: Instant::now(),
        }
    }

    /// Count one packet
    pub fn on_packet(&self, _frame: &Frame<'_>) {
        let count = self.packets.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Packet count {}", count);
    }

    /// Packets counted so far
    pub fn current_count(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> AnalyserReport {
        let packets = self.current_count();
        let elapsed = self.started.elapsed();
        let secs = elapsed.as_secs_f64();
        let packets_per_second = if secs > 0.0 {
            packets as f64 / secs
        } else {
            0.0
        };

        AnalyserReport {
            packets,
            elapsed,
            packets_per_second,
        }
    }

    pub fn reset(&self) {
        self.packets.store(0, Ordering::Relaxed);
    }
}

impl Default for Analyser {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketHandler for Analyser {
    fn on_packet(&mut self, frame: &Frame<'_>) -> Flow {
        Analyser::on_packet(self, frame);
        Flow::Continue
    }
}
