use crate::error::Result;
use crate::io::write_json;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// File name of the hand calibration blob, kept next to the gesture document.
pub const CALIBRATION_FILE: &str = "hand_calibration.json";

/// Opaque calibration data saved by the UI. The server never interprets it;
/// it is stored as `{"calibration": <data>}`.
#[derive(Debug, Clone)]
pub struct CalibrationFile {
    path: PathBuf,
}

impl CalibrationFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The calibration file in the same directory as `document`.
    pub fn beside(document: &Path) -> Self {
        let dir = match document.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        Self::new(dir.join(CALIBRATION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored contents, or `{"calibration": null}` when nothing was saved yet.
    pub fn load(&self) -> Result<Value> {
        match std::fs::read(&self.path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(json!({ "calibration": null }))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the stored data, returning what was written.
    pub fn save(&self, calibration: Value) -> Result<Value> {
        let body = json!({ "calibration": calibration });
        write_json(&self.path, &body)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_null() {
        let dir = TempDir::new().unwrap();
        let file = CalibrationFile::new(dir.path().join(CALIBRATION_FILE));
        assert_eq!(file.load().unwrap(), json!({ "calibration": null }));
        assert!(!file.path().exists());
    }

    #[test]
    fn save_wraps_and_replaces() {
        let dir = TempDir::new().unwrap();
        let file = CalibrationFile::beside(&dir.path().join("gestures.json"));
        assert_eq!(file.path(), dir.path().join(CALIBRATION_FILE));

        file.save(json!({ "index_1": { "offset": 0.5 } })).unwrap();
        file.save(json!({ "thumb": { "multiplier": 1.2 } })).unwrap();
        assert_eq!(
            file.load().unwrap(),
            json!({ "calibration": { "thumb": { "multiplier": 1.2 } } })
        );
    }

    #[test]
    fn bare_document_name_resolves_to_current_dir() {
        let file = CalibrationFile::beside(Path::new("gestures.json"));
        assert_eq!(file.path(), Path::new(".").join(CALIBRATION_FILE));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = CalibrationFile::new(dir.path().join(CALIBRATION_FILE));
        std::fs::write(file.path(), b"{ nope").unwrap();
        assert!(file.load().is_err());
    }
}
