use std::sync::Arc;
use std::time::Duration;

use obdscan::bus::sim::SimulatedBus;
use obdscan::bus::BitRate;
use obdscan::clock::ManualClock;
use obdscan::scan::baud::BAUD_CANDIDATES;
use obdscan::{
    DtcCategory, ProgressSink, ScanConfig, ScanOrchestrator, ScanPhase, ScanReport, ScanStatus,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Records every milestone the engine emits.
#[derive(Default)]
struct RecordingProgress {
    milestones: Vec<(String, u8)>,
}

impl ProgressSink for RecordingProgress {
    fn report(&mut self, message: &str, percent: u8) {
        self.milestones.push((message.to_string(), percent));
    }
}

/// Simulates a vehicle with background traffic at 500 kbit/s and a single
/// engine ECU at 0x7E0 that answers supported-PID probes and reports one
/// stored powertrain code.
fn engine_ecu_bus(clock: Arc<ManualClock>) -> SimulatedBus {
    let mut bus = SimulatedBus::new(clock);
    bus.add_traffic(
        BitRate::Rate500K,
        (0..5).map(|i| obdscan::types::Frame::new(0x1A0 + i, vec![0u8; 8])),
    );
    bus.respond_with(|request| match (request.id, request.data[1]) {
        (0x7E0, 0x01) => Some(obdscan::types::Frame::new(
            0x7E8,
            vec![0x06, 0x41, 0x00, 0xBE, 0x3F, 0xB8, 0x11, 0x00],
        )),
        (0x7E0, 0x03) => Some(obdscan::types::Frame::new(
            0x7E8,
            vec![0x05, 0x43, 0x01, 0x23, 0x00, 0x00, 0x00, 0x00],
        )),
        _ => None,
    });
    bus
}

fn run_scan(config: ScanConfig) -> (ScanReport, RecordingProgress, ScanPhase) {
    let clock = Arc::new(ManualClock::new());
    let bus = engine_ecu_bus(clock.clone());
    let mut orchestrator = ScanOrchestrator::new(bus, clock, config).unwrap();
    let mut progress = RecordingProgress::default();
    let report = orchestrator.scan(&mut progress);
    let phase = orchestrator.phase();
    (report, progress, phase)
}

#[test]
fn test_full_scan_reports_single_powertrain_code() {
    init_tracing();
    let (report, progress, phase) = run_scan(ScanConfig::default());

    assert_eq!(report.status, ScanStatus::Completed);
    assert!(report.vehicle_detected);
    assert_eq!(report.active_ecus, vec![0x7E8]);

    assert_eq!(report.codes.len(), 1);
    let code = &report.codes[0];
    assert_eq!(code.category, DtcCategory::Powertrain);
    assert_eq!(code.number, 0x123);
    assert_eq!(code.code(), "P0123");
    assert!(!code.pending);
    assert_eq!(code.ecu_id, 0x7E8);

    assert!(report.elapsed < Duration::from_secs(45));
    assert_eq!(phase, ScanPhase::Done);

    let milestones: Vec<(&str, u8)> = progress
        .milestones
        .iter()
        .map(|(message, percent)| (message.as_str(), *percent))
        .collect();
    assert_eq!(
        milestones,
        vec![
            ("Detecting vehicle...", 0),
            ("Vehicle found! Analyzing...", 25),
            ("Reading vehicle data...", 50),
            ("Checking systems...", 75),
            ("Scan complete!", 100),
        ]
    );
}

#[test]
fn test_quiet_bus_reports_no_vehicle() {
    init_tracing();
    let clock = Arc::new(ManualClock::new());
    let bus = SimulatedBus::new(clock.clone());
    let mut orchestrator = ScanOrchestrator::new(bus, clock, ScanConfig::default()).unwrap();
    let mut progress = RecordingProgress::default();

    let report = orchestrator.scan(&mut progress);

    assert_eq!(report.status, ScanStatus::NoVehicleDetected);
    assert!(!report.vehicle_detected);
    assert!(report.active_ecus.is_empty());
    assert!(report.codes.is_empty());

    // Worst case is one listen window per candidate plus bounded overhead.
    let windows = ScanConfig::default().baud_window * BAUD_CANDIDATES.len() as u32;
    assert!(report.elapsed <= windows + Duration::from_secs(1));

    assert_eq!(
        progress.milestones.last().map(|(m, p)| (m.as_str(), *p)),
        Some(("No vehicle detected", 100))
    );
}

#[test]
fn test_aggregate_deadline_keeps_partial_results() {
    init_tracing();
    // Tight enough that the deadline passes while discovery is running;
    // discovery still finishes and its results survive, only the code
    // retrieval phase is skipped.
    let config = ScanConfig {
        total_deadline: Duration::from_secs(6),
        ..ScanConfig::default()
    };
    let (report, progress, phase) = run_scan(config);

    assert_eq!(report.status, ScanStatus::TimedOut);
    assert!(report.vehicle_detected);
    assert_eq!(report.active_ecus, vec![0x7E8]);
    assert!(report.codes.is_empty());
    assert_eq!(phase, ScanPhase::Done);

    let milestones: Vec<(&str, u8)> = progress
        .milestones
        .iter()
        .map(|(message, percent)| (message.as_str(), *percent))
        .collect();
    assert_eq!(
        milestones,
        vec![
            ("Detecting vehicle...", 0),
            ("Vehicle found! Analyzing...", 25),
            ("Reading vehicle data...", 50),
            ("Scan timeout", 100),
        ]
    );
}

#[test]
fn test_reconfigure_failure_is_never_fatal() {
    init_tracing();
    let clock = Arc::new(ManualClock::new());
    let mut bus = SimulatedBus::new(clock.clone());
    bus.fail_reconfigure(BitRate::Rate500K);
    bus.add_traffic(
        BitRate::Rate250K,
        (0..5).map(|i| obdscan::types::Frame::new(0x2A0 + i, vec![0u8; 8])),
    );

    let mut orchestrator = ScanOrchestrator::new(bus, clock, ScanConfig::default()).unwrap();
    let report = orchestrator.scan(&mut obdscan::scan::LogProgress);

    // The failing candidate was skipped, the vehicle found at the next
    // rate, and a bus with no diagnostic responders completes cleanly.
    assert_eq!(report.status, ScanStatus::Completed);
    assert!(report.vehicle_detected);
    assert!(report.active_ecus.is_empty());
    assert!(report.codes.is_empty());
}

#[test]
fn test_repeated_scans_produce_identical_reports() {
    init_tracing();
    let (first, _, _) = run_scan(ScanConfig::default());
    let (second, _, _) = run_scan(ScanConfig::default());
    assert_eq!(first, second);
}
