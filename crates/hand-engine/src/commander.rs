use hand_core::protocol::SyncWriteFrame;
use hand_core::{Limits, PositionMap};
use tracing::{debug, warn};

use crate::channel::ChannelManager;
use crate::error::CommandError;
use crate::registry::PositionRegistry;

/// Turns position maps into single sync-write frames and records what landed.
pub(crate) struct BatchCommander<'a> {
    channel: &'a ChannelManager,
    registry: &'a PositionRegistry,
}

impl<'a> BatchCommander<'a> {
    pub(crate) fn new(channel: &'a ChannelManager, registry: &'a PositionRegistry) -> Self {
        Self { channel, registry }
    }

    /// Write `positions` as one frame. The registry changes only if the frame
    /// went out; an empty map succeeds without touching the bus.
    pub(crate) async fn write(
        &self,
        limits: &Limits,
        positions: &PositionMap,
    ) -> Result<(), CommandError> {
        if let Some(&unknown) = positions.keys().find(|id| !limits.contains_key(id)) {
            return Err(CommandError::UnknownActuator(unknown));
        }
        if positions.is_empty() {
            return Ok(());
        }
        if !self.channel.is_connected() {
            return Err(CommandError::NotConnected);
        }

        let frame = SyncWriteFrame::goal_positions(positions).map_err(|e| {
            CommandError::TransmitFailed {
                detail: e.to_string(),
                elapsed: Default::default(),
            }
        })?;

        match self.channel.transmit(frame).await {
            Ok(elapsed) => {
                self.registry.apply(positions);
                debug!(
                    actuators = positions.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "frame sent"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    actuators = positions.len(),
                    elapsed_ms = e.elapsed().map(|d| d.as_millis() as u64),
                    "frame failed: {e}"
                );
                Err(e)
            }
        }
    }
}
