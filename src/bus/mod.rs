//! Bus transport boundary.
//!
//! This module is the thin seam between the scan engine and the physical
//! CAN controller. Implementers bind [`BusTransport`] to their hardware
//! driver; the engine only ever reconfigures the bit rate, sends a frame,
//! or receives a frame, each bounded by an explicit timeout.
//!
//! Reconfiguration is stop-then-install-then-start and must be atomic:
//! either the controller comes back fully running at the new bit rate, or
//! it is left not running. Retry policy lives entirely in the callers.

#[cfg(feature = "sim")]
pub mod sim;

use std::fmt;
use std::time::Duration;

use bitflags::bitflags;

use crate::error::{BusError, Result};
use crate::types::{Config, Frame};

/// Transport trait that must be implemented by the platform bus controller
pub trait BusTransport: Send {
    /// Stops the controller, reinstalls it with timing for `rate`, and
    /// restarts it. On error the controller is left not running.
    fn reconfigure(&mut self, rate: BitRate) -> Result<()>;

    /// Transmits one frame, blocking at most `timeout`.
    fn send(&mut self, frame: &Frame, timeout: Duration) -> Result<()>;

    /// Receives one frame, blocking at most `timeout`. `None` means no
    /// frame arrived within the timeout; that is not an error.
    fn receive(&mut self, timeout: Duration) -> Option<Frame>;
}

/// Supported bus bit rates, listed here in no particular order; the
/// detection priority order lives in [`crate::scan::baud::BAUD_CANDIDATES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitRate {
    Rate500K,
    Rate250K,
    Rate125K,
    Rate1M,
}

impl BitRate {
    pub const fn bps(self) -> u32 {
        match self {
            BitRate::Rate500K => 500_000,
            BitRate::Rate250K => 250_000,
            BitRate::Rate125K => 125_000,
            BitRate::Rate1M => 1_000_000,
        }
    }
}

impl fmt::Display for BitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bps", self.bps())
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BusOptions: u32 {
        const NONE = 0;
        const LOOPBACK = 1;
        const LISTEN_ONLY = 2;
        const ACCEPT_ALL = 4;
    }
}

/// Controller timing profile derived from a [`BitRate`]. Platform
/// implementations translate this into their driver's timing registers
/// when [`BusTransport::reconfigure`] installs the controller.
#[derive(Debug, Clone)]
pub struct BusTiming {
    pub bitrate: u32,
    pub sample_point: f32,
    pub sjw: u8,
    pub options: BusOptions,
}

impl BusTiming {
    /// Standard 75% sample-point profile with an accept-all filter, the
    /// configuration used for every scan phase.
    pub fn for_rate(rate: BitRate) -> Self {
        Self {
            bitrate: rate.bps(),
            sample_point: 0.75,
            sjw: 1,
            options: BusOptions::ACCEPT_ALL,
        }
    }
}

impl Config for BusTiming {
    fn validate(&self) -> Result<()> {
        if self.bitrate == 0 {
            return Err(BusError::UnsupportedBitrate(self.bitrate));
        }
        if self.sample_point <= 0.0 || self.sample_point >= 1.0 {
            return Err(BusError::InvalidConfig);
        }
        if self.sjw == 0 {
            return Err(BusError::InvalidConfig);
        }
        Ok(())
    }
}
