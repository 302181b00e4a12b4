use thiserror::Error;

use crate::actuator::ActuatorId;

#[derive(Debug, Error)]
pub enum HandError {
    #[error("invalid actuator key '{0}': expected servo_<id> with id in 0..=253")]
    InvalidActuatorKey(String),

    #[error("invalid limit for {actuator}: min {min} is greater than max {max}")]
    InvalidLimit {
        actuator: ActuatorId,
        min: u16,
        max: u16,
    },

    #[error("servo_limits is empty: define at least one actuator")]
    MissingLimits,

    #[error("actuator not configured: {0}")]
    UnknownActuator(ActuatorId),

    #[error("gesture '{gesture}' references unconfigured actuator {actuator}")]
    GestureActuator {
        gesture: String,
        actuator: ActuatorId,
    },

    #[error("gesture not found: {0}")]
    GestureNotFound(String),

    #[error("gesture already exists: {0}")]
    GestureExists(String),

    #[error("sequence not found: {0}")]
    SequenceNotFound(String),

    #[error("sequence '{sequence}' references unknown gesture '{gesture}'")]
    SequenceGesture { sequence: String, gesture: String },

    #[error("document not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HandError>;
