//! Passive traffic sniffing.
//!
//! Runs after baud detection for a fixed duration, tallying overall frame
//! volume and the set of distinct arbitration identifiers. The summary is
//! observational only; it never seeds discovery.

use std::time::Duration;

use tracing::{debug, trace};

use super::ScanConfig;
use crate::bus::BusTransport;
use crate::clock::Clock;
use crate::types::CanId;

/// Tally of passively observed traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficSummary {
    pub frames: u32,
    /// Distinct arbitration identifiers in first-seen order.
    pub unique_ids: Vec<CanId>,
}

pub struct TrafficSniffer {
    duration: Duration,
    poll: Duration,
}

impl TrafficSniffer {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            duration: config.sniff_duration,
            poll: config.sniff_poll,
        }
    }

    pub fn listen<B: BusTransport, C: Clock>(&self, bus: &mut B, clock: &C) -> TrafficSummary {
        let deadline = clock.now() + self.duration;
        let mut summary = TrafficSummary::default();

        while clock.now() < deadline {
            if let Some(frame) = bus.receive(self.poll) {
                summary.frames += 1;
                trace!(
                    "frame #{}: id={:#05X} dlc={} data={:02X?}",
                    summary.frames,
                    frame.id,
                    frame.dlc(),
                    frame.data
                );
                if !summary.unique_ids.contains(&frame.id) {
                    summary.unique_ids.push(frame.id);
                }
            }
        }

        debug!(
            "traffic summary: {} frames, {} unique ids",
            summary.frames,
            summary.unique_ids.len()
        );
        summary
    }
}
