//! Scriptable simulated bus.
//!
//! Stands in for the physical controller in tests and bench rigs: traffic
//! can be queued per bit rate, request handlers emulate ECU responses, and
//! reconfiguration can be made to fail for chosen bit rates. The simulator
//! shares a [`ManualClock`] with the engine and advances it on every
//! transfer and expired timeout, so polling loops make progress without
//! real delays.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{BitRate, BusTiming, BusTransport};
use crate::clock::ManualClock;
use crate::error::{BusError, Result};
use crate::types::{Config, Frame};

/// Handler invoked for every transmitted frame; returning a frame queues
/// it for the next receive.
pub type FrameHandler = Box<dyn FnMut(&Frame) -> Option<Frame> + Send>;

/// Simulated clock advance per delivered or transmitted frame.
const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(10);

pub struct SimulatedBus {
    clock: Arc<ManualClock>,
    rate: Option<BitRate>,
    running: bool,
    traffic: HashMap<BitRate, VecDeque<Frame>>,
    handlers: Vec<FrameHandler>,
    pending: VecDeque<Frame>,
    sent: Arc<Mutex<Vec<Frame>>>,
    failing: Vec<BitRate>,
    frame_interval: Duration,
}

impl SimulatedBus {
    /// Creates a stopped bus sharing `clock` with the engine under test.
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            rate: None,
            running: false,
            traffic: HashMap::new(),
            handlers: Vec::new(),
            pending: VecDeque::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: Vec::new(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }

    pub fn set_frame_interval(&mut self, interval: Duration) {
        self.frame_interval = interval;
    }

    /// Queues background frames observable while the bus is configured at
    /// `rate`. Frames are delivered in order, one per receive call.
    pub fn add_traffic(&mut self, rate: BitRate, frames: impl IntoIterator<Item = Frame>) {
        self.traffic.entry(rate).or_default().extend(frames);
    }

    /// Registers a response handler. Handlers are consulted in
    /// registration order; the first to return a frame wins.
    pub fn respond_with<F>(&mut self, handler: F)
    where
        F: FnMut(&Frame) -> Option<Frame> + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Makes every reconfigure attempt at `rate` fail at the install step.
    pub fn fail_reconfigure(&mut self, rate: BitRate) {
        self.failing.push(rate);
    }

    /// Shared log of every frame the engine transmitted.
    pub fn sent_log(&self) -> Arc<Mutex<Vec<Frame>>> {
        self.sent.clone()
    }

    pub fn current_rate(&self) -> Option<BitRate> {
        self.rate
    }
}

impl BusTransport for SimulatedBus {
    fn reconfigure(&mut self, rate: BitRate) -> Result<()> {
        // Stop first; a failed install leaves the bus not running.
        self.running = false;
        self.pending.clear();

        if self.failing.contains(&rate) {
            return Err(BusError::Install(format!(
                "simulated install failure at {rate}"
            )));
        }
        BusTiming::for_rate(rate).validate()?;

        self.rate = Some(rate);
        self.running = true;
        Ok(())
    }

    fn send(&mut self, frame: &Frame, _timeout: Duration) -> Result<()> {
        if !self.running {
            return Err(BusError::NotRunning);
        }
        self.sent.lock().push(frame.clone());
        for handler in &mut self.handlers {
            if let Some(response) = handler(frame) {
                self.pending.push_back(response);
                break;
            }
        }
        self.clock.advance(self.frame_interval);
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Option<Frame> {
        if !self.running {
            self.clock.advance(timeout);
            return None;
        }
        if let Some(frame) = self.pending.pop_front() {
            self.clock.advance(self.frame_interval);
            return Some(frame);
        }
        if let Some(queue) = self.rate.and_then(|rate| self.traffic.get_mut(&rate)) {
            if let Some(frame) = queue.pop_front() {
                self.clock.advance(self.frame_interval);
                return Some(frame);
            }
        }
        self.clock.advance(timeout);
        None
    }
}
