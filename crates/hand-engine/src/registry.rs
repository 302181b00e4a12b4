use std::sync::{Arc, RwLock};

use hand_core::actuator::rest_positions;
use hand_core::{Limits, PositionMap};

/// Last confirmed position of every configured actuator.
///
/// There is no read-back on this bus, so the registry reflects what was
/// successfully commanded, starting from each actuator's minimum.
#[derive(Debug, Clone)]
pub struct PositionRegistry {
    inner: Arc<RwLock<PositionMap>>,
}

impl PositionRegistry {
    pub fn new(limits: &Limits) -> Self {
        Self {
            inner: Arc::new(RwLock::new(rest_positions(limits))),
        }
    }

    /// Independent copy of the current positions.
    pub fn snapshot(&self) -> PositionMap {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Merge a confirmed batch. Actuators outside `subset` keep their value.
    pub(crate) fn apply(&self, subset: &PositionMap) {
        let mut positions = self.inner.write().unwrap_or_else(|e| e.into_inner());
        positions.extend(subset.iter().map(|(&id, &pos)| (id, pos)));
    }

    /// Track a new set of limits: new actuators start at their minimum,
    /// removed ones are dropped, survivors keep their confirmed position.
    pub(crate) fn reconcile(&self, limits: &Limits) {
        let mut positions = self.inner.write().unwrap_or_else(|e| e.into_inner());
        positions.retain(|id, _| limits.contains_key(id));
        for (&id, limit) in limits {
            positions.entry(id).or_insert(limit.min);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hand_core::{ActuatorId, ActuatorLimit};

    fn id(raw: u8) -> ActuatorId {
        ActuatorId::new(raw).unwrap()
    }

    fn limits() -> Limits {
        [
            (id(1), ActuatorLimit::new(5, 100)),
            (id(2), ActuatorLimit::new(7, 100)),
        ]
        .into()
    }

    #[test]
    fn starts_at_minimums() {
        let registry = PositionRegistry::new(&limits());
        let snap = registry.snapshot();
        assert_eq!(snap[&id(1)], 5);
        assert_eq!(snap[&id(2)], 7);
    }

    #[test]
    fn apply_touches_only_the_batch() {
        let registry = PositionRegistry::new(&limits());
        registry.apply(&[(id(1), 50)].into());
        let snap = registry.snapshot();
        assert_eq!(snap[&id(1)], 50);
        assert_eq!(snap[&id(2)], 7);
    }

    #[test]
    fn snapshot_is_independent() {
        let registry = PositionRegistry::new(&limits());
        let before = registry.snapshot();
        registry.apply(&[(id(2), 99)].into());
        assert_eq!(before[&id(2)], 7);
    }

    #[test]
    fn reconcile_adds_and_drops_actuators() {
        let registry = PositionRegistry::new(&limits());
        registry.apply(&[(id(2), 60)].into());
        let next: Limits = [
            (id(2), ActuatorLimit::new(0, 100)),
            (id(3), ActuatorLimit::new(30, 40)),
        ]
        .into();
        registry.reconcile(&next);
        let snap = registry.snapshot();
        assert!(!snap.contains_key(&id(1)));
        assert_eq!(snap[&id(2)], 60);
        assert_eq!(snap[&id(3)], 30);
    }
}
