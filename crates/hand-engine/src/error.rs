use std::time::Duration;

use hand_core::ActuatorId;
use thiserror::Error;

use crate::executor::Phase;

/// Failures while bringing the channel up.
#[derive(Debug, Clone, Error)]
pub enum ConnectError {
    #[error("port {path} not found; available: {}", fmt_ports(.available))]
    PortNotFound {
        path: String,
        available: Vec<String>,
    },

    #[error("failed to open port {path}: {detail}")]
    OpenFailed { path: String, detail: String },

    #[error("failed to set baud rate {baud} on {path}: {detail}")]
    BaudRateFailed {
        path: String,
        baud: u32,
        detail: String,
    },

    #[error("permission denied for {path}")]
    PermissionDenied { path: String },

    #[error("failed to enable torque on {actuator}: {detail}")]
    TorqueEnableFailed { actuator: ActuatorId, detail: String },
}

fn fmt_ports(ports: &[String]) -> String {
    if ports.is_empty() {
        "none".to_string()
    } else {
        ports.join(", ")
    }
}

/// Failures of a single write against the bus.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("servos not connected")]
    NotConnected,

    #[error("bus operation timed out after {} ms", .elapsed.as_millis())]
    Timeout { elapsed: Duration },

    #[error("transmit failed after {} ms: {detail}", .elapsed.as_millis())]
    TransmitFailed { detail: String, elapsed: Duration },

    #[error("{actuator} reported error code {code:#04x}")]
    ActuatorError { actuator: ActuatorId, code: u8 },

    #[error("actuator not configured: {0}")]
    UnknownActuator(ActuatorId),
}

impl CommandError {
    /// Time spent on the bus before the failure, when known.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Self::Timeout { elapsed } | Self::TransmitFailed { elapsed, .. } => Some(*elapsed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum GestureError {
    #[error("gesture not found: {0}")]
    NotFound(String),

    #[error("staged execution requires {0}, which is not configured")]
    MissingActuator(ActuatorId),

    #[error("{phase} phase failed: {source}")]
    Command {
        phase: Phase,
        #[source]
        source: CommandError,
    },
}

/// Everything a caller of the engine handle can get back.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("engine is shutting down")]
    ShuttingDown,

    #[error("engine has stopped")]
    Stopped,

    #[error("execution not found: {0}")]
    ExecutionNotFound(uuid::Uuid),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Gesture(#[from] GestureError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
