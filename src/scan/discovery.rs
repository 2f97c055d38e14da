//! Active ECU discovery.
//!
//! Each of the 16 standard OBD-II request addresses is probed exactly once
//! with a mode 01 supported-PID query. A control unit answers on its
//! functional response identifier, always the request identifier plus 8.
//! The phase carries its own aggregate deadline; on expiry the partial
//! result stands.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::ScanConfig;
use crate::bus::BusTransport;
use crate::clock::Clock;
use crate::types::{CanId, Frame};

/// Mode 01, show current data.
pub const MODE_SHOW_CURRENT_DATA: u8 = 0x01;
/// PID 00, supported PIDs 01-20.
pub const PID_SUPPORTED_PIDS_01_20: u8 = 0x00;

/// Offset from a standard request identifier to its functional response.
pub const RESPONSE_ID_OFFSET: CanId = 8;
/// Functional response identifier range.
pub const RESPONSE_ID_MIN: CanId = 0x7E8;
pub const RESPONSE_ID_MAX: CanId = 0x7EF;

/// Standard OBD-II request addresses, probed in ascending order.
pub const STANDARD_ADDRESSES: [CanId; 16] = [
    0x7E0, 0x7E1, 0x7E2, 0x7E3, 0x7E4, 0x7E5, 0x7E6, 0x7E7, 0x7E8, 0x7E9, 0x7EA, 0x7EB, 0x7EC,
    0x7ED, 0x7EE, 0x7EF,
];

pub struct EcuDiscovery {
    phase_timeout: Duration,
    response_timeout: Duration,
    poll: Duration,
    pause: Duration,
    tx_timeout: Duration,
}

impl EcuDiscovery {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            phase_timeout: config.discovery_timeout,
            response_timeout: config.probe_response_timeout,
            poll: config.probe_poll,
            pause: config.probe_pause,
            tx_timeout: config.tx_timeout,
        }
    }

    /// Probes every standard address once and returns the response
    /// identifiers of responding ECUs, in discovery order, without
    /// duplicates. Stops early when the phase deadline elapses.
    pub fn probe<B: BusTransport, C: Clock>(&self, bus: &mut B, clock: &C) -> Vec<CanId> {
        let started = clock.now();
        let mut active = Vec::new();

        for (index, &address) in STANDARD_ADDRESSES.iter().enumerate() {
            if clock.now() - started > self.phase_timeout {
                warn!("discovery window exhausted after {index} addresses");
                break;
            }

            debug!(
                "probing ECU {:#05X} ({}/{})",
                address,
                index + 1,
                STANDARD_ADDRESSES.len()
            );
            let request = Frame::obd_request(
                address,
                MODE_SHOW_CURRENT_DATA,
                Some(PID_SUPPORTED_PIDS_01_20),
            );
            match bus.send(&request, self.tx_timeout) {
                Err(err) => debug!("probe transmit to {address:#05X} failed: {err}"),
                Ok(()) => {
                    let deadline = clock.now() + self.response_timeout;
                    while clock.now() < deadline {
                        let Some(response) = bus.receive(self.poll) else {
                            continue;
                        };
                        if Self::qualifies(address, response.id) {
                            debug!(
                                "active ECU: {:#05X} responded from {:#05X}, data={:02X?}",
                                address, response.id, response.data
                            );
                            if !active.contains(&response.id) {
                                active.push(response.id);
                            }
                            break;
                        }
                    }
                }
            }

            clock.sleep(self.pause);
        }

        info!("found {} active ECUs", active.len());
        active
    }

    /// A response qualifies when it arrives on the probed address plus the
    /// fixed offset, or anywhere within the functional response range.
    fn qualifies(address: CanId, response: CanId) -> bool {
        response == address + RESPONSE_ID_OFFSET
            || (RESPONSE_ID_MIN..=RESPONSE_ID_MAX).contains(&response)
    }
}
