use thiserror::Error;

/// Errors raised at the bus transport boundary.
///
/// The scan engine never propagates these past its own boundary: a failed
/// reconfigure skips the affected baud candidate, a failed transmit skips
/// the affected probe, and everything else resolves into the terminal
/// status of the report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("bus controller is not running")]
    NotRunning,

    #[error("unsupported bit rate: {0} bps")]
    UnsupportedBitrate(u32),

    #[error("invalid bus configuration")]
    InvalidConfig,

    #[error("controller install failed: {0}")]
    Install(String),

    #[error("controller start failed: {0}")]
    Start(String),

    #[error("transmit failed: {0}")]
    Transmit(String),
}

pub type Result<T> = core::result::Result<T, BusError>;
