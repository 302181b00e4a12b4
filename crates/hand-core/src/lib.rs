pub mod actuator;
pub mod calibration;
pub mod document;
pub mod error;
pub mod io;
pub mod protocol;
pub mod store;

pub use actuator::{ActuatorId, ActuatorLimit, Limits, PositionMap, PositionRequest};
pub use calibration::CalibrationFile;
pub use document::{HandDocument, SequenceStep, Settings};
pub use error::{HandError, Result};
pub use store::GestureStore;
