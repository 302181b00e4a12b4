use crate::error::{HandError, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// ActuatorId
// ---------------------------------------------------------------------------

/// Bus address of a single servo.
///
/// Only ever constructed from a validated `servo_<id>` key (or a checked raw
/// id), so code holding an `ActuatorId` never re-parses strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActuatorId(u8);

impl ActuatorId {
    /// Highest addressable id; 254 is the bus broadcast address.
    pub const MAX: u8 = 253;

    pub fn new(raw: u8) -> Result<Self> {
        if raw > Self::MAX {
            return Err(HandError::InvalidActuatorKey(format!("servo_{raw}")));
        }
        Ok(Self(raw))
    }

    /// Id for a fixed hardware role, checked at compile time when bound to a
    /// `const`.
    pub const fn fixed(raw: u8) -> Self {
        assert!(raw <= Self::MAX, "actuator id out of range");
        Self(raw)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// The `servo_<id>` form used in the persisted document.
    pub fn key(self) -> String {
        format!("servo_{}", self.0)
    }
}

static KEY_RE: OnceLock<Regex> = OnceLock::new();

fn key_re() -> &'static Regex {
    KEY_RE.get_or_init(|| Regex::new(r"^servo_([0-9]{1,3})$").unwrap())
}

impl FromStr for ActuatorId {
    type Err = HandError;

    fn from_str(key: &str) -> Result<Self> {
        let invalid = || HandError::InvalidActuatorKey(key.to_string());
        let caps = key_re().captures(key).ok_or_else(invalid)?;
        let raw: u16 = caps[1].parse().map_err(|_| invalid())?;
        let raw = u8::try_from(raw).map_err(|_| invalid())?;
        if raw > Self::MAX {
            return Err(invalid());
        }
        Ok(Self(raw))
    }
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "servo_{}", self.0)
    }
}

impl Serialize for ActuatorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ActuatorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ActuatorLimit
// ---------------------------------------------------------------------------

/// Inclusive position bounds for one actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorLimit {
    pub min: u16,
    pub max: u16,
}

impl ActuatorLimit {
    pub fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    pub fn validate(&self, actuator: ActuatorId) -> Result<()> {
        if self.min > self.max {
            return Err(HandError::InvalidLimit {
                actuator,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Constrain any requested value into `[min, max]`.
    pub fn clamp(&self, value: i64) -> u16 {
        let clamped = value.max(i64::from(self.min)).min(i64::from(self.max));
        // In range for u16 once bounded by a valid limit; saturate otherwise.
        u16::try_from(clamped).unwrap_or(self.max)
    }

    pub fn contains(&self, value: u16) -> bool {
        self.min <= value && value <= self.max
    }
}

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

/// Confirmed or requested position per actuator.
pub type PositionMap = BTreeMap<ActuatorId, u16>;

/// Unclamped inbound request; values may be out of range or negative.
pub type PositionRequest = BTreeMap<ActuatorId, i64>;

pub type Limits = BTreeMap<ActuatorId, ActuatorLimit>;

/// Clamp every requested position against `limits`.
///
/// Fails with the first actuator that has no configured limit; callers wrap
/// it in their own error type.
pub fn clamp_request(
    limits: &Limits,
    request: &PositionRequest,
) -> std::result::Result<PositionMap, ActuatorId> {
    request
        .iter()
        .map(|(&id, &value)| {
            let limit = limits.get(&id).ok_or(id)?;
            Ok((id, limit.clamp(value)))
        })
        .collect()
}

/// Re-clamp an already stored map, e.g. a gesture written under older limits.
pub fn clamp_positions(
    limits: &Limits,
    positions: &PositionMap,
) -> std::result::Result<PositionMap, ActuatorId> {
    let request: PositionRequest = positions
        .iter()
        .map(|(&id, &value)| (id, i64::from(value)))
        .collect();
    clamp_request(limits, &request)
}

/// Every configured actuator at its minimum.
pub fn rest_positions(limits: &Limits) -> PositionMap {
    limits.iter().map(|(&id, limit)| (id, limit.min)).collect()
}

/// Restrict `positions` to the given actuator ids, preserving order.
pub fn select(positions: &PositionMap, ids: &[u8]) -> PositionMap {
    positions
        .iter()
        .filter(|(id, _)| ids.contains(&id.get()))
        .map(|(&id, &value)| (id, value))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u8) -> ActuatorId {
        ActuatorId::new(raw).unwrap()
    }

    #[test]
    fn parses_valid_keys() {
        assert_eq!("servo_1".parse::<ActuatorId>().unwrap().get(), 1);
        assert_eq!("servo_12".parse::<ActuatorId>().unwrap().get(), 12);
        assert_eq!("servo_253".parse::<ActuatorId>().unwrap().get(), 253);
    }

    #[test]
    fn rejects_malformed_keys() {
        for key in [
            "", "servo_", "servo_x", "motor_1", "servo_1a", "servo_254", "servo_999", "servo_-1",
            " servo_1", "servo_1000",
        ] {
            assert!(key.parse::<ActuatorId>().is_err(), "expected invalid: {key}");
        }
    }

    #[test]
    fn new_rejects_broadcast_address() {
        assert!(ActuatorId::new(254).is_err());
        assert!(ActuatorId::new(253).is_ok());
    }

    #[test]
    fn serializes_as_document_key() {
        let mut map = PositionMap::new();
        map.insert(id(3), 120);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"servo_3":120}"#);
        let back: PositionMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn map_deserialization_rejects_bad_key() {
        let err = serde_json::from_str::<PositionMap>(r#"{"servo_one":1}"#).unwrap_err();
        assert!(err.to_string().contains("servo_one"));
    }

    #[test]
    fn clamp_stays_within_bounds() {
        let limit = ActuatorLimit::new(100, 900);
        for v in [i64::MIN, -1, 0, 99, 100, 500, 900, 901, 65_536, i64::MAX] {
            let c = limit.clamp(v);
            assert!(limit.contains(c), "{v} clamped to {c}");
        }
    }

    #[test]
    fn clamp_is_idempotent() {
        let limit = ActuatorLimit::new(0, 100);
        for v in [-50, 0, 42, 100, 150, 70_000] {
            let once = limit.clamp(v);
            assert_eq!(limit.clamp(i64::from(once)), once);
        }
    }

    #[test]
    fn clamp_request_caps_to_max() {
        let mut limits = Limits::new();
        limits.insert(id(1), ActuatorLimit::new(0, 100));
        let mut request = PositionRequest::new();
        request.insert(id(1), 150);
        let clamped = clamp_request(&limits, &request).unwrap();
        assert_eq!(clamped[&id(1)], 100);
    }

    #[test]
    fn clamp_request_rejects_unconfigured_actuator() {
        let limits = Limits::new();
        let mut request = PositionRequest::new();
        request.insert(id(7), 10);
        assert_eq!(clamp_request(&limits, &request), Err(id(7)));
    }

    #[test]
    fn clamp_positions_pulls_stored_values_into_new_limits() {
        let limits: Limits = [(id(1), ActuatorLimit::new(200, 300))].into();
        let stored: PositionMap = [(id(1), 900)].into();
        assert_eq!(clamp_positions(&limits, &stored).unwrap()[&id(1)], 300);
        let stale: PositionMap = [(id(2), 5)].into();
        assert_eq!(clamp_positions(&limits, &stale), Err(id(2)));
    }

    #[test]
    fn validate_rejects_inverted_limit() {
        assert!(ActuatorLimit::new(10, 5).validate(id(1)).is_err());
        assert!(ActuatorLimit::new(5, 5).validate(id(1)).is_ok());
    }

    #[test]
    fn select_keeps_only_requested_ids() {
        let positions: PositionMap = [(id(1), 10), (id(9), 90), (id(12), 120)].into();
        let thumb = select(&positions, &[9, 10, 12]);
        assert_eq!(thumb.keys().map(|a| a.get()).collect::<Vec<_>>(), vec![9, 12]);
    }
}
