//! Bed status payload parsing and change detection
//! This module handles decoding of the raw status payload reported by the
//! control box into a structured bed state.

use serde::{Deserialize, Serialize};

use crate::error::{BedError, Result};
use crate::session::constants::{
    FOOT_MAX_ANGLE, FOOT_MAX_RAW, HEAD_MAX_ANGLE, HEAD_MAX_RAW, STATUS_FOOT_OFFSET,
    STATUS_HEAD_OFFSET, STATUS_LIGHT_OFFSET, STATUS_LIGHT_SENTINEL, STATUS_PAYLOAD_SIZE,
};

/// Represents the state of the bed frame
///
/// A snapshot is always derived from a single status payload; fields are
/// never mixed across reads. Angles are degrees of elevation from flat.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BedState {
    /// Head section elevation in degrees
    pub head_angle: f32,

    /// Foot section elevation in degrees
    pub foot_angle: f32,

    /// Whether the underbed light is on
    pub light_on: bool,
}

/// Decodes a raw status payload into a bed state
///
/// Pure and deterministic: the same payload always yields the same state.
/// Fails with [`BedError::Decode`] when the payload is not exactly
/// [`STATUS_PAYLOAD_SIZE`] bytes; callers treat that like a transient
/// read failure.
pub fn decode_status(data: &[u8]) -> Result<BedState> {
    if data.len() != STATUS_PAYLOAD_SIZE {
        return Err(BedError::Decode(format!(
            "payload length {}, expected {}",
            data.len(),
            STATUS_PAYLOAD_SIZE
        )));
    }

    // The control box sends positions low byte first.
    let head_raw = u16::from_le_bytes([data[STATUS_HEAD_OFFSET], data[STATUS_HEAD_OFFSET + 1]]);
    let foot_raw = u16::from_le_bytes([data[STATUS_FOOT_OFFSET], data[STATUS_FOOT_OFFSET + 1]]);

    // Linear mapping from raw actuator position to degrees. Values past
    // the mechanical limit are reported as-is, not clamped.
    let head_angle = head_raw as f32 * HEAD_MAX_ANGLE / HEAD_MAX_RAW;
    let foot_angle = foot_raw as f32 * FOOT_MAX_ANGLE / FOOT_MAX_RAW;

    // Only the low nibble of the light byte carries the flag; the high
    // nibble belongs to unrelated massage bits.
    let light_on = (data[STATUS_LIGHT_OFFSET] & 0x0f) == STATUS_LIGHT_SENTINEL;

    Ok(BedState {
        head_angle,
        foot_angle,
        light_on,
    })
}

/// Logs every field that differs between two snapshots
pub(crate) fn log_transitions(prev: &BedState, next: &BedState) {
    if prev.head_angle != next.head_angle {
        log::info!(
            "Head angle changed: {:.2}° -> {:.2}°",
            prev.head_angle,
            next.head_angle
        );
    }
    if prev.foot_angle != next.foot_angle {
        log::info!(
            "Foot angle changed: {:.2}° -> {:.2}°",
            prev.foot_angle,
            next.foot_angle
        );
    }
    if prev.light_on != next.light_on {
        log::info!(
            "Underlight changed: {} -> {}",
            if prev.light_on { "on" } else { "off" },
            if next.light_on { "on" } else { "off" }
        );
    }
}
