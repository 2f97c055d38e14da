//! OBD-II CAN bus diagnostic scan engine.
//!
//! Discovers an unknown vehicle bus configuration, enumerates responding
//! control units, retrieves their stored fault codes, and decodes raw
//! frame payloads into a structured [`ScanReport`] — all under fixed
//! wall-clock deadlines and with no prior knowledge of the attached
//! vehicle.
//!
//! The engine is single-threaded and synchronous. Implementers bind the
//! [`bus::BusTransport`] trait to their physical controller and hand it to
//! a [`ScanOrchestrator`]; display, payment, and delivery subsystems only
//! ever see progress milestones and the final report.

pub mod bus;
pub mod clock;
pub mod error;
pub mod report;
pub mod scan;
pub mod types;

// Re-exports for convenience
pub use bus::{BitRate, BusTransport};
pub use clock::{Clock, MonotonicClock};
pub use error::{BusError, Result};
pub use report::{ScanReport, ScanStatus};
pub use scan::dtc::{DiagnosticTroubleCode, DtcCategory};
pub use scan::{NullProgress, ProgressSink, ScanConfig, ScanOrchestrator, ScanPhase};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
