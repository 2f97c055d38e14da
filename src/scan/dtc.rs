//! Stored trouble code retrieval and decoding.
//!
//! Every active ECU is queried once with a mode 03 request on its request
//! identifier (functional response identifier minus 8). A silent ECU or a
//! payload of two bytes or fewer yields zero codes; that is not an error.

use std::fmt;
use std::time::Duration;

use tracing::{debug, trace};

use super::discovery::{RESPONSE_ID_MAX, RESPONSE_ID_MIN, RESPONSE_ID_OFFSET};
use super::ScanConfig;
use crate::bus::BusTransport;
use crate::clock::Clock;
use crate::types::{CanId, Frame};

/// Mode 03, read stored trouble codes.
pub const MODE_READ_STORED_DTC: u8 = 0x03;

/// Trouble code category, encoded in the top two bits of the first byte
/// of each code pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtcCategory {
    Powertrain,
    Chassis,
    Body,
    Network,
}

impl DtcCategory {
    pub const fn letter(self) -> char {
        match self {
            DtcCategory::Powertrain => 'P',
            DtcCategory::Chassis => 'C',
            DtcCategory::Body => 'B',
            DtcCategory::Network => 'U',
        }
    }

    pub const fn from_first_byte(b1: u8) -> Self {
        match b1 >> 6 {
            0b00 => DtcCategory::Powertrain,
            0b01 => DtcCategory::Chassis,
            0b10 => DtcCategory::Body,
            _ => DtcCategory::Network,
        }
    }
}

/// One decoded diagnostic trouble code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticTroubleCode {
    pub category: DtcCategory,
    /// 14-bit numeric value from the low six bits of the first byte and
    /// the whole second byte.
    pub number: u16,
    /// Stored codes only are queried here, so this is always false.
    pub pending: bool,
    /// Functional response identifier of the reporting ECU.
    pub ecu_id: CanId,
}

impl DiagnosticTroubleCode {
    /// Renders the five-character code string, e.g. "P0123".
    ///
    /// Padding keeps the original firmware's behavior: a zero is inserted
    /// after the category letter until the string is five characters long.
    /// For every reachable 14-bit value this produces the same string as
    /// conventional four-digit left-zero-padding of the hex portion; the
    /// test suite pins down both readings.
    pub fn code(&self) -> String {
        let mut code = format!("{}{:X}", self.category.letter(), self.number);
        while code.len() < 5 {
            code.insert(1, '0');
        }
        code
    }

    /// Label of the reporting subsystem, e.g. "ECU 0x7E8".
    pub fn system(&self) -> String {
        format!("ECU {:#X}", self.ecu_id)
    }
}

impl fmt::Display for DiagnosticTroubleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Maps a functional response identifier back to the request identifier
/// it answers for. Identifiers outside the functional range pass through.
pub fn request_id_for(response_id: CanId) -> CanId {
    if (RESPONSE_ID_MIN..=RESPONSE_ID_MAX).contains(&response_id) {
        response_id - RESPONSE_ID_OFFSET
    } else {
        response_id
    }
}

/// Decodes a mode 03 response payload into trouble codes.
///
/// Code pairs start at byte offset 2 and are consumed two bytes at a time;
/// an all-zero pair encodes no code and is skipped. A trailing odd byte is
/// ignored. Payloads of two bytes or fewer decode to nothing.
pub fn decode_dtc_payload(data: &[u8], ecu_id: CanId) -> Vec<DiagnosticTroubleCode> {
    let mut codes = Vec::new();
    if data.len() <= 2 {
        return codes;
    }
    for pair in data[2..].chunks_exact(2) {
        let (b1, b2) = (pair[0], pair[1]);
        if b1 == 0 && b2 == 0 {
            continue;
        }
        let code = DiagnosticTroubleCode {
            category: DtcCategory::from_first_byte(b1),
            number: ((b1 as u16 & 0x3F) << 8) | b2 as u16,
            pending: false,
            ecu_id,
        };
        debug!("DTC found: {code} from ECU {:#05X}", ecu_id);
        codes.push(code);
    }
    codes
}

pub struct DtcCollector {
    response_timeout: Duration,
    poll: Duration,
    pause: Duration,
    tx_timeout: Duration,
}

impl DtcCollector {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            response_timeout: config.dtc_response_timeout,
            poll: config.dtc_poll,
            pause: config.dtc_pause,
            tx_timeout: config.tx_timeout,
        }
    }

    /// Queries each active ECU once for stored codes. ECUs that stay
    /// silent or answer with a short payload contribute nothing.
    pub fn collect<B: BusTransport, C: Clock>(
        &self,
        bus: &mut B,
        clock: &C,
        active_ecus: &[CanId],
    ) -> Vec<DiagnosticTroubleCode> {
        if active_ecus.is_empty() {
            debug!("no active ECUs, skipping code retrieval");
            return Vec::new();
        }

        let mut codes = Vec::new();
        for &ecu_id in active_ecus {
            let request_id = request_id_for(ecu_id);
            debug!("reading stored codes from ECU {ecu_id:#05X} via {request_id:#05X}");

            let request = Frame::obd_request(request_id, MODE_READ_STORED_DTC, None);
            match bus.send(&request, self.tx_timeout) {
                Err(err) => debug!("code request to {request_id:#05X} failed: {err}"),
                Ok(()) => {
                    let deadline = clock.now() + self.response_timeout;
                    while clock.now() < deadline {
                        let Some(response) = bus.receive(self.poll) else {
                            continue;
                        };
                        if response.id == ecu_id {
                            trace!("code response from {:#05X}: {:02X?}", ecu_id, response.data);
                            if response.data.len() > 2 {
                                codes.extend(decode_dtc_payload(&response.data, ecu_id));
                            }
                            break;
                        }
                    }
                }
            }

            clock.sleep(self.pause);
        }
        codes
    }
}
