//! Scan results handed to the kiosk display and reporting paths.

use std::time::Duration;

use crate::scan::dtc::DiagnosticTroubleCode;
use crate::types::CanId;

/// Terminal outcome of a scan invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// No baud candidate showed sufficient bus activity.
    NoVehicleDetected,
    /// The aggregate deadline elapsed before all phases completed; the
    /// report still carries whatever was gathered.
    TimedOut,
    /// All phases ran to normal completion.
    Completed,
}

/// The sole output of the scan engine, owned by the orchestrator while a
/// scan is in progress and moved out to the caller afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Response identifiers of responding ECUs, in discovery order,
    /// without duplicates.
    pub active_ecus: Vec<CanId>,
    /// Stored trouble codes, in retrieval order.
    pub codes: Vec<DiagnosticTroubleCode>,
    /// Whether any bus activity was observed during baud detection.
    pub vehicle_detected: bool,
    /// Wall-clock duration of the scan invocation.
    pub elapsed: Duration,
    pub status: ScanStatus,
}

impl ScanReport {
    pub(crate) fn new() -> Self {
        Self {
            active_ecus: Vec::new(),
            codes: Vec::new(),
            vehicle_detected: false,
            elapsed: Duration::ZERO,
            status: ScanStatus::NoVehicleDetected,
        }
    }
}
