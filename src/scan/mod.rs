//! Diagnostic scan phases and orchestration.
//!
//! A scan runs four phases strictly in order, each built on the transport
//! seam in [`crate::bus`]:
//! - bit-rate detection ([`baud`])
//! - passive traffic sniffing ([`sniff`])
//! - active ECU discovery ([`discovery`])
//! - stored trouble code retrieval ([`dtc`])
//!
//! One aggregate deadline covers the whole scan. It is checked only at
//! phase boundaries: a phase already in progress runs to its own
//! completion, and only the next phase is skipped once the deadline has
//! passed. No phase, probe, or baud attempt is ever retried.

pub mod baud;
pub mod discovery;
pub mod dtc;
pub mod sniff;


use std::time::Duration;

use tracing::{info, warn};

use crate::bus::BusTransport;
use crate::clock::Clock;
use crate::error::{BusError, Result};
use crate::report::{ScanReport, ScanStatus};
use crate::types::Config;

use baud::BaudRateDetector;
use discovery::EcuDiscovery;
use dtc::DtcCollector;
use sniff::TrafficSniffer;

/// Synchronous sink for the five fixed progress milestones. Consumed by
/// the display subsystem; implementations must not mutate engine state.
pub trait ProgressSink {
    fn report(&mut self, message: &str, percent: u8);
}

/// Discards all progress messages.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&mut self, _message: &str, _percent: u8) {}
}

/// Forwards milestones to the log, standing in for an on-screen progress
/// bar when no display is attached.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&mut self, message: &str, percent: u8) {
        info!("[{percent:>3}%] {message}");
    }
}

/// Engine phase, advanced strictly forward during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    DetectingBaud,
    Sniffing,
    Discovering,
    CollectingCodes,
    Done,
}

/// All scan tunables in one place. The defaults are the production
/// values; tests shrink them where a property needs a tighter deadline.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Aggregate deadline for the whole scan.
    pub total_deadline: Duration,
    /// Listen window per baud candidate.
    pub baud_window: Duration,
    pub baud_poll: Duration,
    /// Frames needed inside one window to declare a candidate detected.
    pub baud_frames_required: u32,
    /// Passive sniffing duration.
    pub sniff_duration: Duration,
    pub sniff_poll: Duration,
    /// Aggregate deadline for the discovery phase.
    pub discovery_timeout: Duration,
    /// Response wait per probed address.
    pub probe_response_timeout: Duration,
    pub probe_poll: Duration,
    /// Pause between consecutive address probes.
    pub probe_pause: Duration,
    /// Response wait per code query.
    pub dtc_response_timeout: Duration,
    pub dtc_poll: Duration,
    /// Pause between consecutive ECU code queries.
    pub dtc_pause: Duration,
    /// Transmit timeout for every request frame.
    pub tx_timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            total_deadline: Duration::from_secs(45),
            baud_window: Duration::from_secs(2),
            baud_poll: Duration::from_millis(100),
            baud_frames_required: 3,
            sniff_duration: Duration::from_secs(5),
            sniff_poll: Duration::from_millis(50),
            discovery_timeout: Duration::from_secs(15),
            probe_response_timeout: Duration::from_millis(800),
            probe_poll: Duration::from_millis(50),
            probe_pause: Duration::from_millis(50),
            dtc_response_timeout: Duration::from_secs(1),
            dtc_poll: Duration::from_millis(50),
            dtc_pause: Duration::from_millis(100),
            tx_timeout: Duration::from_millis(100),
        }
    }
}

impl Config for ScanConfig {
    fn validate(&self) -> Result<()> {
        let durations = [
            self.total_deadline,
            self.baud_window,
            self.baud_poll,
            self.sniff_duration,
            self.sniff_poll,
            self.discovery_timeout,
            self.probe_response_timeout,
            self.probe_poll,
            self.dtc_response_timeout,
            self.dtc_poll,
            self.tx_timeout,
        ];
        if durations.iter().any(Duration::is_zero) {
            return Err(BusError::InvalidConfig);
        }
        if self.baud_frames_required == 0 {
            return Err(BusError::InvalidConfig);
        }
        Ok(())
    }
}

/// Sequences the scan phases over an exclusive bus transport.
///
/// The orchestrator owns the in-progress report; callers receive it by
/// value when `scan` returns and the engine retains nothing afterwards.
pub struct ScanOrchestrator<B: BusTransport, C: Clock> {
    bus: B,
    clock: C,
    config: ScanConfig,
    phase: ScanPhase,
}

impl<B: BusTransport, C: Clock> ScanOrchestrator<B, C> {
    pub fn new(bus: B, clock: C, config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bus,
            clock,
            config,
            phase: ScanPhase::Idle,
        })
    }

    /// Current engine phase, for callers tracking scan state.
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Runs one full scan invocation, blocking the calling thread for up
    /// to the aggregate deadline. Never fails: every low-level fault
    /// resolves into a skip or into the terminal report status.
    pub fn scan(&mut self, progress: &mut dyn ProgressSink) -> ScanReport {
        let started = self.clock.now();
        let deadline = started + self.config.total_deadline;
        let mut report = ScanReport::new();

        info!("starting CAN bus diagnostic scan");
        self.phase = ScanPhase::DetectingBaud;
        progress.report("Detecting vehicle...", 0);

        let detector = BaudRateDetector::new(&self.config);
        let Some(rate) = detector.detect(&mut self.bus, &self.clock) else {
            info!("no CAN activity detected on any bit rate");
            progress.report("No vehicle detected", 100);
            return self.finish(report, ScanStatus::NoVehicleDetected, started);
        };
        report.vehicle_detected = true;
        info!("CAN activity detected at {rate}");

        if self.clock.now() > deadline {
            return self.timed_out(report, progress, started);
        }
        self.phase = ScanPhase::Sniffing;
        progress.report("Vehicle found! Analyzing...", 25);
        let sniffer = TrafficSniffer::new(&self.config);
        let summary = sniffer.listen(&mut self.bus, &self.clock);
        info!(
            "observed {} frames across {} identifiers",
            summary.frames,
            summary.unique_ids.len()
        );

        if self.clock.now() > deadline {
            return self.timed_out(report, progress, started);
        }
        self.phase = ScanPhase::Discovering;
        progress.report("Reading vehicle data...", 50);
        let discovery = EcuDiscovery::new(&self.config);
        report.active_ecus = discovery.probe(&mut self.bus, &self.clock);

        if self.clock.now() > deadline {
            return self.timed_out(report, progress, started);
        }
        self.phase = ScanPhase::CollectingCodes;
        progress.report("Checking systems...", 75);
        let collector = DtcCollector::new(&self.config);
        report.codes = collector.collect(&mut self.bus, &self.clock, &report.active_ecus);

        progress.report("Scan complete!", 100);
        let report = self.finish(report, ScanStatus::Completed, started);
        info!(
            "scan complete: {} active ECUs, {} fault codes ({:.1?})",
            report.active_ecus.len(),
            report.codes.len(),
            report.elapsed
        );
        report
    }

    fn timed_out(
        &mut self,
        report: ScanReport,
        progress: &mut dyn ProgressSink,
        started: Duration,
    ) -> ScanReport {
        warn!("aggregate scan deadline exceeded");
        progress.report("Scan timeout", 100);
        self.finish(report, ScanStatus::TimedOut, started)
    }

    fn finish(&mut self, mut report: ScanReport, status: ScanStatus, started: Duration) -> ScanReport {
        report.status = status;
        report.elapsed = self.clock.now() - started;
        self.phase = ScanPhase::Done;
        report
    }
}
