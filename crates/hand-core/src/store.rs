use crate::actuator::{clamp_request, rest_positions, Limits, PositionMap, PositionRequest};
use crate::document::{HandDocument, SequenceStep, Settings};
use crate::error::{HandError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared, file-backed view of the hand document.
///
/// Every mutation is validated against a copy of the document, persisted, and
/// only then swapped in, so readers see either the old or the new document and
/// the file on disk always matches memory.
#[derive(Debug, Clone)]
pub struct GestureStore {
    doc: Arc<RwLock<HandDocument>>,
    path: Option<Arc<PathBuf>>,
}

impl GestureStore {
    /// Load the document at `path`, seeding the common gestures (and writing
    /// them back) when it has none.
    pub fn open(path: &Path) -> Result<Self> {
        let mut doc = HandDocument::load(path)?;
        if doc.ensure_common_gestures() {
            doc.save(path)?;
        }
        Ok(Self {
            doc: Arc::new(RwLock::new(doc)),
            path: Some(Arc::new(path.to_path_buf())),
        })
    }

    /// A store that never touches the filesystem.
    pub fn in_memory(doc: HandDocument) -> Result<Self> {
        doc.validate()?;
        Ok(Self {
            doc: Arc::new(RwLock::new(doc)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    // ---------------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------------

    pub fn document(&self) -> HandDocument {
        self.read().clone()
    }

    pub fn limits(&self) -> Limits {
        self.read().servo_limits.clone()
    }

    pub fn settings(&self) -> Settings {
        self.read().settings.clone()
    }

    pub fn gesture(&self, name: &str) -> Option<PositionMap> {
        self.read().gestures.get(name).cloned()
    }

    pub fn contains_gesture(&self, name: &str) -> bool {
        self.read().gestures.contains_key(name)
    }

    pub fn gesture_names(&self) -> Vec<String> {
        self.read().gestures.keys().cloned().collect()
    }

    pub fn sequences(&self) -> BTreeMap<String, Vec<SequenceStep>> {
        self.read().sequences.clone()
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    /// Clamp `request` against the current limits and store it under `name`,
    /// replacing any existing gesture.
    pub fn save_gesture(&self, name: &str, request: &PositionRequest) -> Result<PositionMap> {
        self.mutate(|doc| {
            let positions = clamp_request(&doc.servo_limits, request)
                .map_err(HandError::UnknownActuator)?;
            doc.gestures.insert(name.to_string(), positions.clone());
            Ok(positions)
        })
    }

    /// Create a gesture with every actuator at its minimum.
    pub fn add_gesture(&self, name: &str) -> Result<PositionMap> {
        self.mutate(|doc| {
            if doc.gestures.contains_key(name) {
                return Err(HandError::GestureExists(name.to_string()));
            }
            let positions = rest_positions(&doc.servo_limits);
            doc.gestures.insert(name.to_string(), positions.clone());
            Ok(positions)
        })
    }

    /// Delete a gesture and every sequence step that references it.
    /// Returns the number of sequence steps removed.
    pub fn remove_gesture(&self, name: &str) -> Result<usize> {
        self.mutate(|doc| {
            if doc.gestures.remove(name).is_none() {
                return Err(HandError::GestureNotFound(name.to_string()));
            }
            Ok(doc.remove_gesture_references(name))
        })
    }

    /// Create or replace a sequence. Every step must name an existing gesture.
    pub fn put_sequence(&self, id: &str, steps: Vec<SequenceStep>) -> Result<()> {
        self.mutate(|doc| {
            doc.check_sequence(id, &steps)?;
            doc.sequences.insert(id.to_string(), steps);
            Ok(())
        })
    }

    pub fn delete_sequence(&self, id: &str) -> Result<()> {
        self.mutate(|doc| match doc.sequences.remove(id) {
            Some(_) => Ok(()),
            None => Err(HandError::SequenceNotFound(id.to_string())),
        })
    }

    /// Replace all limits. Rejected if any limit is inverted or any stored
    /// gesture would reference an actuator that is no longer configured.
    pub fn set_limits(&self, limits: Limits) -> Result<()> {
        self.mutate(|doc| {
            doc.servo_limits = limits;
            Ok(())
        })
    }

    pub fn set_settings(&self, settings: Settings) -> Result<()> {
        self.mutate(|doc| {
            doc.settings = settings;
            Ok(())
        })
    }

    // ---------------------------------------------------------------------------
    // Internal
    // ---------------------------------------------------------------------------

    fn mutate<T>(&self, f: impl FnOnce(&mut HandDocument) -> Result<T>) -> Result<T> {
        let mut guard = self.write();
        let mut next = guard.clone();
        let out = f(&mut next)?;
        next.validate()?;
        if let Some(path) = &self.path {
            next.save(path)?;
        }
        *guard = next;
        Ok(out)
    }

    fn read(&self) -> RwLockReadGuard<'_, HandDocument> {
        self.doc.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HandDocument> {
        self.doc.write().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
