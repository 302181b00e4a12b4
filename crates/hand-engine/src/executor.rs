//! Gesture execution: direct single-frame writes and the staged
//! thumb-clearance sequence.
//!
//! Staged mode swings the thumb out of the palm before the fingers close and
//! only then brings the thumb to its target:
//!
//! ```text
//! ThumbClearance  { servo_12: min }          wait step delay
//! Fingers         target ∩ servo_1..8        wait step delay
//! Thumb           target ∩ servo_9,10,12
//! ```

use std::fmt;
use std::time::Duration;

use hand_core::actuator::{clamp_positions, select};
use hand_core::{ActuatorId, Limits, PositionMap};
use serde::Serialize;
use tracing::debug;

use crate::commander::BatchCommander;
use crate::error::{CommandError, GestureError};

/// Thumb opposition actuator, parked at its minimum before fingers move.
pub const THUMB_OPPOSITION: ActuatorId = ActuatorId::fixed(12);
pub const FINGER_GROUP: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];
pub const THUMB_GROUP: [u8; 3] = [9, 10, THUMB_OPPOSITION.get()];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    ThumbClearance,
    Fingers,
    Thumb,
    Direct,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ThumbClearance => "thumb clearance",
            Phase::Fingers => "fingers",
            Phase::Thumb => "thumb",
            Phase::Direct => "direct",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub phase: Phase,
    pub positions: PositionMap,
}

/// Work out the frames for a gesture without touching the bus.
///
/// The target is re-clamped against the current limits, since the gesture may
/// have been stored under different ones.
pub fn plan(limits: &Limits, target: &PositionMap, staged: bool) -> Result<Vec<Step>, GestureError> {
    if !staged {
        return Ok(vec![Step {
            phase: Phase::Direct,
            positions: reclamp(limits, target, Phase::Direct)?,
        }]);
    }

    let thumb_limit = limits
        .get(&THUMB_OPPOSITION)
        .ok_or(GestureError::MissingActuator(THUMB_OPPOSITION))?;
    let target = reclamp(limits, target, Phase::Fingers)?;

    Ok(vec![
        Step {
            phase: Phase::ThumbClearance,
            positions: [(THUMB_OPPOSITION, thumb_limit.min)].into(),
        },
        Step {
            phase: Phase::Fingers,
            positions: select(&target, &FINGER_GROUP),
        },
        Step {
            phase: Phase::Thumb,
            positions: select(&target, &THUMB_GROUP),
        },
    ])
}

fn reclamp(limits: &Limits, target: &PositionMap, phase: Phase) -> Result<PositionMap, GestureError> {
    clamp_positions(limits, target).map_err(|id| GestureError::Command {
        phase,
        source: CommandError::UnknownActuator(id),
    })
}

/// Write each planned step in order, sleeping `delay` between steps.
///
/// Stops at the first failed step. Empty steps write nothing but still keep
/// their place in the timing. `on_applied` runs after every frame that went
/// out.
pub(crate) async fn run(
    commander: &BatchCommander<'_>,
    limits: &Limits,
    steps: &[Step],
    delay: Duration,
    mut on_applied: impl FnMut(&Step),
) -> Result<(), GestureError> {
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }
        if step.positions.is_empty() {
            debug!(phase = %step.phase, "nothing to move in this phase");
            continue;
        }
        commander
            .write(limits, &step.positions)
            .await
            .map_err(|source| GestureError::Command {
                phase: step.phase,
                source,
            })?;
        on_applied(step);
    }
    Ok(())
}
