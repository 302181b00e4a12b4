use crate::actuator::{ActuatorId, Limits, PositionMap};
use crate::error::{HandError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const DOCUMENT_FILE: &str = "gestures.json";

pub const DEFAULT_STEP_DELAY_MS: u64 = 500;
const STEP_DELAY_KEY: &str = "gesture_step_delay_ms";
const LEGACY_STEP_DELAY_KEY: &str = "gesture_step_delay";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Free-form settings object. Only the step delay is interpreted here; every
/// other key is carried through untouched for the web UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between staged gesture phases. Falls back to the legacy key and
    /// then to 500 ms when absent or not a non-negative integer.
    pub fn gesture_step_delay(&self) -> Duration {
        let ms = [STEP_DELAY_KEY, LEGACY_STEP_DELAY_KEY]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_u64))
            .unwrap_or(DEFAULT_STEP_DELAY_MS);
        Duration::from_millis(ms)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }
}

// ---------------------------------------------------------------------------
// SequenceStep
// ---------------------------------------------------------------------------

/// One step of a stored sequence. Playback happens client-side; the server
/// only keeps the gesture reference consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub gesture: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl SequenceStep {
    pub fn new(gesture: impl Into<String>) -> Self {
        Self {
            gesture: gesture.into(),
            data: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// HandDocument
// ---------------------------------------------------------------------------

/// The persisted `gestures.json` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandDocument {
    pub servo_limits: Limits,
    #[serde(default)]
    pub gestures: BTreeMap<String, PositionMap>,
    #[serde(default)]
    pub sequences: BTreeMap<String, Vec<SequenceStep>>,
    #[serde(default)]
    pub settings: Settings,
}

impl HandDocument {
    pub fn new(servo_limits: Limits) -> Self {
        Self {
            servo_limits,
            ..Self::default()
        }
    }

    /// Parse and validate. Actuator keys are checked during deserialization.
    pub fn parse(json: &str) -> Result<Self> {
        let doc: HandDocument = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Read-only load; does not generate or persist anything.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HandError::NotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        crate::io::write_json(path, self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.servo_limits.is_empty() {
            return Err(HandError::MissingLimits);
        }
        for (&actuator, limit) in &self.servo_limits {
            limit.validate(actuator)?;
        }
        for (name, positions) in &self.gestures {
            self.check_gesture(name, positions)?;
        }
        for (id, steps) in &self.sequences {
            self.check_sequence(id, steps)?;
        }
        Ok(())
    }

    pub(crate) fn check_gesture(&self, name: &str, positions: &PositionMap) -> Result<()> {
        match positions
            .keys()
            .find(|a| !self.servo_limits.contains_key(a))
        {
            Some(&actuator) => Err(HandError::GestureActuator {
                gesture: name.to_string(),
                actuator,
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn check_sequence(&self, id: &str, steps: &[SequenceStep]) -> Result<()> {
        match steps
            .iter()
            .find(|s| !self.gestures.contains_key(&s.gesture))
        {
            Some(step) => Err(HandError::SequenceGesture {
                sequence: id.to_string(),
                gesture: step.gesture.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Seed `fist`, `point` and `peace` when the document has no gestures.
    /// Returns `true` if anything was generated.
    pub fn ensure_common_gestures(&mut self) -> bool {
        if !self.gestures.is_empty() {
            return false;
        }
        self.gestures = common_gestures(&self.servo_limits);
        true
    }

    /// Remove every step that references `gesture` from every sequence.
    /// Returns the number of steps removed.
    pub(crate) fn remove_gesture_references(&mut self, gesture: &str) -> usize {
        let mut removed = 0;
        for steps in self.sequences.values_mut() {
            let before = steps.len();
            steps.retain(|s| s.gesture != gesture);
            removed += before - steps.len();
        }
        removed
    }
}

/// Hand poses derived from the limits: fully curled fist, and two poses that
/// leave selected fingers open.
pub fn common_gestures(limits: &Limits) -> BTreeMap<String, PositionMap> {
    let pose = |open: &[u8]| -> PositionMap {
        limits
            .iter()
            .map(|(&id, limit)| {
                let value = if open.contains(&id.get()) {
                    limit.min
                } else {
                    limit.max
                };
                (id, value)
            })
            .collect()
    };

    let mut gestures = BTreeMap::new();
    gestures.insert("fist".to_string(), pose(&[]));
    gestures.insert("point".to_string(), pose(&[6, 8]));
    gestures.insert("peace".to_string(), pose(&[4, 5, 6, 8]));
    gestures
}

pub fn actuator_ids(limits: &Limits) -> Vec<ActuatorId> {
    limits.keys().copied().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::ActuatorLimit;
    use serde_json::json;

    fn id(raw: u8) -> ActuatorId {
        ActuatorId::new(raw).unwrap()
    }

    fn sample() -> String {
        json!({
            "servo_limits": {
                "servo_1": { "min": 0, "max": 100 },
                "servo_12": { "min": 200, "max": 800 }
            },
            "gestures": {
                "open": { "servo_1": 0, "servo_12": 200 }
            },
            "sequences": {
                "wave": [ { "gesture": "open", "duration": 1000 } ]
            },
            "settings": { "gesture_step_delay_ms": 250, "theme": "dark" }
        })
        .to_string()
    }

    #[test]
    fn parses_full_document() {
        let doc = HandDocument::parse(&sample()).unwrap();
        assert_eq!(doc.servo_limits[&id(12)], ActuatorLimit::new(200, 800));
        assert_eq!(doc.gestures["open"][&id(1)], 0);
        assert_eq!(doc.sequences["wave"][0].gesture, "open");
        assert_eq!(doc.sequences["wave"][0].data["duration"], 1000);
        assert_eq!(doc.settings.gesture_step_delay(), Duration::from_millis(250));
        assert_eq!(doc.settings.get("theme"), Some(&json!("dark")));
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let doc =
            HandDocument::parse(r#"{"servo_limits":{"servo_1":{"min":0,"max":10}}}"#).unwrap();
        assert!(doc.gestures.is_empty());
        assert!(doc.sequences.is_empty());
        assert_eq!(doc.settings, Settings::new());
    }

    #[test]
    fn rejects_malformed_actuator_key() {
        let err = HandDocument::parse(r#"{"servo_limits":{"servo_x":{"min":0,"max":10}}}"#)
            .unwrap_err();
        assert!(matches!(err, HandError::Json(_)));
    }

    #[test]
    fn rejects_inverted_limit() {
        let err = HandDocument::parse(r#"{"servo_limits":{"servo_1":{"min":20,"max":10}}}"#)
            .unwrap_err();
        assert!(matches!(err, HandError::InvalidLimit { .. }));
    }

    #[test]
    fn rejects_empty_limits() {
        let err = HandDocument::parse(r#"{"servo_limits":{}}"#).unwrap_err();
        assert!(matches!(err, HandError::MissingLimits));
    }

    #[test]
    fn rejects_gesture_with_unconfigured_actuator() {
        let err = HandDocument::parse(
            r#"{"servo_limits":{"servo_1":{"min":0,"max":10}},
                "gestures":{"g":{"servo_2":5}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, HandError::GestureActuator { .. }));
    }

    #[test]
    fn rejects_sequence_with_unknown_gesture() {
        let err = HandDocument::parse(
            r#"{"servo_limits":{"servo_1":{"min":0,"max":10}},
                "sequences":{"s":[{"gesture":"ghost"}]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, HandError::SequenceGesture { .. }));
    }

    #[test]
    fn step_delay_defaults_and_legacy_key() {
        let mut settings = Settings::new();
        assert_eq!(settings.gesture_step_delay(), Duration::from_millis(500));
        settings.set("gesture_step_delay", json!(750));
        assert_eq!(settings.gesture_step_delay(), Duration::from_millis(750));
        settings.set("gesture_step_delay_ms", json!(100));
        assert_eq!(settings.gesture_step_delay(), Duration::from_millis(100));
    }

    #[test]
    fn common_gestures_follow_limits() {
        let limits: Limits = (1..=8)
            .map(|raw| (id(raw), ActuatorLimit::new(10, 90)))
            .collect();
        let mut doc = HandDocument::new(limits);
        assert!(doc.ensure_common_gestures());
        assert!(doc.gestures["fist"].values().all(|&v| v == 90));
        assert_eq!(doc.gestures["point"][&id(6)], 10);
        assert_eq!(doc.gestures["point"][&id(1)], 90);
        assert_eq!(doc.gestures["peace"][&id(4)], 10);
        assert_eq!(doc.gestures["peace"][&id(3)], 90);
        assert!(!doc.ensure_common_gestures());
    }

    #[test]
    fn removing_references_cascades_through_all_sequences() {
        let mut doc = HandDocument::parse(&sample()).unwrap();
        doc.sequences
            .insert("other".into(), vec![SequenceStep::new("open"), SequenceStep::new("open")]);
        assert_eq!(doc.remove_gesture_references("open"), 3);
        assert!(doc.sequences.values().all(|s| s.is_empty()));
    }
}
