use hand_core::{CalibrationFile, GestureStore};
use hand_engine::{EngineError, EngineHandle};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    /// Lives beside the gesture document; absent for in-memory stores.
    pub calibration: Option<CalibrationFile>,
}

impl AppState {
    pub fn new(engine: EngineHandle) -> Self {
        let calibration = engine.store().path().map(CalibrationFile::beside);
        Self {
            engine,
            calibration,
        }
    }

    pub fn store(&self) -> GestureStore {
        self.engine.store().clone()
    }

    /// Document edits are refused once shutdown has begun, like engine
    /// commands.
    pub fn ensure_accepting(&self) -> Result<(), EngineError> {
        if self.engine.is_accepting() {
            Ok(())
        } else {
            Err(EngineError::ShuttingDown)
        }
    }
}
