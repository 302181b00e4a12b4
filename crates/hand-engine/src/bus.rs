use std::time::Duration;

use hand_core::protocol::{FrameError, SyncWriteFrame};
use hand_core::ActuatorId;
use thiserror::Error;

/// Low-level failure reported by a bus implementation.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("timed out waiting for the bus")]
    Timeout,

    #[error("{actuator} returned status error {code:#04x}")]
    Status { actuator: ActuatorId, code: u8 },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Why a device could not be opened.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Failed(String),
}

/// An open connection to the servo bus.
///
/// Calls block; the engine runs them off the async runtime and bounds each
/// one with its own timeout.
pub trait Bus: Send + 'static {
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), BusError>;

    /// Single-byte register write that waits for the actuator's status reply.
    fn write_register(&mut self, id: ActuatorId, address: u8, value: u8) -> Result<(), BusError>;

    /// Transmit one synchronized frame. No reply is expected.
    fn transmit(&mut self, frame: &SyncWriteFrame) -> Result<(), BusError>;

    /// Release the device. Dropping the bus must also release it.
    fn close(&mut self) {}
}

/// Enumerates and opens buses.
pub trait Transport: Send + Sync + 'static {
    fn available_ports(&self) -> Result<Vec<String>, BusError>;

    fn open(&self, path: &str, timeout: Duration) -> Result<Box<dyn Bus>, OpenError>;
}
