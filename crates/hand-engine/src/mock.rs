//! Instrumented in-memory bus.
//!
//! Records every operation with a timestamp and counts overlapping frames, so
//! tests can assert ordering and serialization without hardware.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use hand_core::protocol::SyncWriteFrame;
use hand_core::{ActuatorId, PositionMap};

use crate::bus::{Bus, BusError, OpenError, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Opened(String),
    Baud(u32),
    Register {
        actuator: ActuatorId,
        address: u8,
        value: u8,
    },
    Frame(PositionMap),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenFailure {
    Denied,
    Failed,
}

#[derive(Debug, Default)]
struct MockState {
    ports: Vec<String>,
    events: Vec<(Instant, BusEvent)>,
    open: bool,
    in_frame: bool,
    overlaps: usize,
    fail_open: Option<OpenFailure>,
    fail_baud: bool,
    torque_error: Option<(ActuatorId, u8)>,
    fail_transmit: bool,
    /// Counts down per frame; the frame that takes it to zero fails.
    fail_after: Option<usize>,
    transmit_delay: Duration,
    enumerate_delay: Duration,
}

/// Shareable handle onto one simulated serial bus. Clones observe the same
/// state, so a test keeps one and hands another to the engine.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new(ports: &[&str]) -> Self {
        let transport = Self::default();
        transport.lock().ports = ports.iter().map(|p| p.to_string()).collect();
        transport
    }

    // ─── Fault injection ──────────────────────────────────────────────────

    pub fn deny_permission(&self) {
        self.lock().fail_open = Some(OpenFailure::Denied);
    }

    pub fn fail_open(&self) {
        self.lock().fail_open = Some(OpenFailure::Failed);
    }

    pub fn fail_baud(&self) {
        self.lock().fail_baud = true;
    }

    /// `actuator` answers torque writes with a non-zero status byte.
    pub fn reject_register(&self, actuator: ActuatorId, code: u8) {
        self.lock().torque_error = Some((actuator, code));
    }

    pub fn fail_transmit(&self, fail: bool) {
        self.lock().fail_transmit = fail;
    }

    /// Fail only the `nth` frame from now (1-based); later frames succeed.
    pub fn fail_frame(&self, nth: usize) {
        self.lock().fail_after = Some(nth.max(1));
    }

    /// Hold every frame on the wire for `delay`.
    pub fn set_transmit_delay(&self, delay: Duration) {
        self.lock().transmit_delay = delay;
    }

    /// Make port enumeration block for `delay`.
    pub fn set_enumerate_delay(&self, delay: Duration) {
        self.lock().enumerate_delay = delay;
    }

    // ─── Observation ──────────────────────────────────────────────────────

    pub fn events(&self) -> Vec<BusEvent> {
        self.lock().events.iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn frames(&self) -> Vec<PositionMap> {
        self.timed_frames().into_iter().map(|(_, f)| f).collect()
    }

    pub fn timed_frames(&self) -> Vec<(Instant, PositionMap)> {
        self.lock()
            .events
            .iter()
            .filter_map(|(at, e)| match e {
                BusEvent::Frame(f) => Some((*at, f.clone())),
                _ => None,
            })
            .collect()
    }

    /// `(actuator, value)` of every torque register write, in order.
    pub fn torque_writes(&self) -> Vec<(ActuatorId, u8)> {
        self.lock()
            .events
            .iter()
            .filter_map(|(_, e)| match e {
                BusEvent::Register {
                    actuator,
                    address: hand_core::protocol::ADDR_TORQUE_ENABLE,
                    value,
                } => Some((*actuator, *value)),
                _ => None,
            })
            .collect()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Frames that started while another was still in flight.
    pub fn overlaps(&self) -> usize {
        self.lock().overlaps
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MockTransport {
    fn available_ports(&self) -> Result<Vec<String>, BusError> {
        let delay = self.lock().enumerate_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(self.lock().ports.clone())
    }

    fn open(&self, path: &str, _timeout: Duration) -> Result<Box<dyn Bus>, OpenError> {
        let mut state = self.lock();
        match state.fail_open {
            Some(OpenFailure::Denied) => {
                return Err(OpenError::PermissionDenied(format!(
                    "Permission denied: {path}"
                )))
            }
            Some(OpenFailure::Failed) => return Err(OpenError::Failed("device busy".into())),
            None => {}
        }
        state.open = true;
        state
            .events
            .push((Instant::now(), BusEvent::Opened(path.to_string())));
        drop(state);
        Ok(Box::new(MockBus {
            transport: self.clone(),
            closed: false,
        }))
    }
}

struct MockBus {
    transport: MockTransport,
    closed: bool,
}

impl Bus for MockBus {
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), BusError> {
        let mut state = self.transport.lock();
        if state.fail_baud {
            return Err(BusError::Other("unsupported baud rate".into()));
        }
        state.events.push((Instant::now(), BusEvent::Baud(baud)));
        Ok(())
    }

    fn write_register(&mut self, id: ActuatorId, address: u8, value: u8) -> Result<(), BusError> {
        let mut state = self.transport.lock();
        state.events.push((
            Instant::now(),
            BusEvent::Register {
                actuator: id,
                address,
                value,
            },
        ));
        match state.torque_error {
            Some((actuator, code)) if actuator == id => Err(BusError::Status { actuator, code }),
            _ => Ok(()),
        }
    }

    fn transmit(&mut self, frame: &SyncWriteFrame) -> Result<(), BusError> {
        let delay = {
            let mut state = self.transport.lock();
            if state.in_frame {
                state.overlaps += 1;
            }
            state.in_frame = true;
            state.events.push((Instant::now(), BusEvent::Frame(frame.positions())));
            state.transmit_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let mut state = self.transport.lock();
        state.in_frame = false;
        let scheduled = match state.fail_after {
            Some(1) => {
                state.fail_after = None;
                true
            }
            Some(n) => {
                state.fail_after = Some(n - 1);
                false
            }
            None => false,
        };
        if state.fail_transmit || scheduled {
            return Err(BusError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "write failed",
            )));
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut state = self.transport.lock();
        state.open = false;
        state.events.push((Instant::now(), BusEvent::Closed));
    }
}

impl Drop for MockBus {
    fn drop(&mut self) {
        self.close();
    }
}
