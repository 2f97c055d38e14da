//! Bus bit-rate detection.
//!
//! The attached vehicle's bit rate is unknown a priori. Each candidate is
//! tried in a fixed priority order: reconfigure the transport, then listen
//! inside a bounded window and count frames. Three frames are enough to
//! declare the candidate detected; the rest of the window is not consumed.

use std::time::Duration;

use tracing::{debug, warn};

use super::ScanConfig;
use crate::bus::{BitRate, BusTransport};
use crate::clock::Clock;

/// Candidate bit rates in fixed priority order, most common first.
pub const BAUD_CANDIDATES: [BitRate; 4] = [
    BitRate::Rate500K,
    BitRate::Rate250K,
    BitRate::Rate125K,
    BitRate::Rate1M,
];

pub struct BaudRateDetector {
    window: Duration,
    poll: Duration,
    frames_required: u32,
}

impl BaudRateDetector {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            window: config.baud_window,
            poll: config.baud_poll,
            frames_required: config.baud_frames_required,
        }
    }

    /// Returns the first candidate with sufficient activity, or `None`
    /// when every candidate's window elapsed quietly. A reconfigure
    /// failure skips that candidate only.
    pub fn detect<B: BusTransport, C: Clock>(&self, bus: &mut B, clock: &C) -> Option<BitRate> {
        for &rate in BAUD_CANDIDATES.iter() {
            debug!("trying {rate}");
            if let Err(err) = bus.reconfigure(rate) {
                warn!("reconfigure at {rate} failed, skipping: {err}");
                continue;
            }

            let deadline = clock.now() + self.window;
            let mut frames = 0u32;
            while clock.now() < deadline {
                if bus.receive(self.poll).is_some() {
                    frames += 1;
                    if frames >= self.frames_required {
                        debug!("activity detected at {rate} ({frames} frames)");
                        return Some(rate);
                    }
                }
            }
            debug!("no activity at {rate} ({frames} frames)");
        }
        None
    }
}
