//! Packet framing for Feetech SCS/STS serial bus servos.
//!
//! Every packet is `FF FF id len instr params.. chk` where `len` counts the
//! instruction, the params and the checksum, and `chk` is the bitwise NOT of
//! the byte sum from `id` through the last param. Status replies use the same
//! layout with the error byte in place of the instruction.

use crate::actuator::{ActuatorId, PositionMap};
use thiserror::Error;

pub const HEADER: [u8; 2] = [0xFF, 0xFF];
pub const BROADCAST_ID: u8 = 0xFE;

pub const INSTR_WRITE: u8 = 0x03;
pub const INSTR_SYNC_WRITE: u8 = 0x83;

/// Control table: torque enable, single byte.
pub const ADDR_TORQUE_ENABLE: u8 = 40;
/// Control table: goal position, two bytes little-endian.
pub const ADDR_GOAL_POSITION: u8 = 42;
pub const GOAL_POSITION_LEN: u8 = 2;

pub const BAUD_RATE: u32 = 1_000_000;

/// Smallest valid status packet: header, id, len, error, checksum.
pub const STATUS_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("packet too short: {0} bytes")]
    Truncated(usize),

    #[error("bad packet header {0:02X?}")]
    BadHeader([u8; 2]),

    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },

    #[error("reply from id {actual}, expected {expected}")]
    WrongId { expected: u8, actual: u8 },

    #[error("frame of {0} actuators exceeds the packet length field")]
    TooLarge(usize),
}

pub fn checksum(data: &[u8]) -> u8 {
    !data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Assemble a raw instruction packet. `params` must leave room in the
/// one-byte length field; the public builders below guarantee that.
pub(crate) fn packet(id: u8, instr: u8, params: &[u8]) -> Vec<u8> {
    let length = (params.len() + 2) as u8;
    let mut pkt = Vec::with_capacity(6 + params.len());
    pkt.extend_from_slice(&HEADER);
    pkt.push(id);
    pkt.push(length);
    pkt.push(instr);
    pkt.extend_from_slice(params);
    pkt.push(checksum(&pkt[2..]));
    pkt
}

/// Single-byte register write addressed to one actuator.
pub fn write_byte(id: ActuatorId, address: u8, value: u8) -> Vec<u8> {
    packet(id.get(), INSTR_WRITE, &[address, value])
}

// ---------------------------------------------------------------------------
// Sync write
// ---------------------------------------------------------------------------

/// One synchronized goal-position write covering several actuators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWriteFrame {
    entries: Vec<(ActuatorId, [u8; 2])>,
}

impl SyncWriteFrame {
    /// Largest actuator count whose params still fit the one-byte length.
    pub const MAX_ACTUATORS: usize = (u8::MAX as usize - 4) / (GOAL_POSITION_LEN as usize + 1);

    pub fn goal_positions(positions: &PositionMap) -> Result<Self, FrameError> {
        if positions.len() > Self::MAX_ACTUATORS {
            return Err(FrameError::TooLarge(positions.len()));
        }
        let entries = positions
            .iter()
            .map(|(&id, &pos)| (id, pos.to_le_bytes()))
            .collect();
        Ok(Self { entries })
    }

    /// Decoded view of the positions carried by this frame.
    pub fn positions(&self) -> PositionMap {
        self.entries
            .iter()
            .map(|(id, bytes)| (*id, u16::from_le_bytes(*bytes)))
            .collect()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut params = Vec::with_capacity(2 + self.entries.len() * 3);
        params.push(ADDR_GOAL_POSITION);
        params.push(GOAL_POSITION_LEN);
        for (id, [lo, hi]) in &self.entries {
            params.push(id.get());
            params.push(*lo);
            params.push(*hi);
        }
        packet(BROADCAST_ID, INSTR_SYNC_WRITE, &params)
    }
}

// ---------------------------------------------------------------------------
// Status replies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPacket {
    pub id: u8,
    pub error: u8,
}

/// Parse a status reply and check it came from `expected`.
pub fn parse_status(bytes: &[u8], expected: ActuatorId) -> Result<StatusPacket, FrameError> {
    if bytes.len() < STATUS_LEN {
        return Err(FrameError::Truncated(bytes.len()));
    }
    if bytes[..2] != HEADER {
        return Err(FrameError::BadHeader([bytes[0], bytes[1]]));
    }
    let len = bytes[3] as usize;
    let end = 4 + len;
    if len < 2 || bytes.len() < end {
        return Err(FrameError::Truncated(bytes.len()));
    }
    let expected_sum = checksum(&bytes[2..end - 1]);
    let actual_sum = bytes[end - 1];
    if expected_sum != actual_sum {
        return Err(FrameError::Checksum {
            expected: expected_sum,
            actual: actual_sum,
        });
    }
    let id = bytes[2];
    if id != expected.get() {
        return Err(FrameError::WrongId {
            expected: expected.get(),
            actual: id,
        });
    }
    Ok(StatusPacket {
        id,
        error: bytes[4],
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
