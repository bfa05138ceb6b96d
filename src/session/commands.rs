//! Bed command table
//! This module contains all the commands that can be written to the
//! control box, each a fixed 9-byte packet.

use super::constants::COMMAND_PACKET_SIZE;

/// Bed commands
///
/// Every packet is `e6 fe 16`, six data bytes, and a trailing checksum
/// (the ones' complement of the sum of the first eight bytes). The
/// control box acts on the packet as a whole; there is no argument
/// encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedCommand {
    /// Move both sections to the flat preset
    PresetFlat,
    /// Move to the zero-gravity preset
    PresetZeroG,
    /// Move to the TV-watching preset
    PresetTv,
    /// Move to the lounge preset
    PresetLounge,
    /// Move to the quiet-sleep preset
    PresetQuietSleep,
    /// Recall memory position 1
    Memory1,
    /// Recall memory position 2
    Memory2,
    /// Toggle the underbed light
    Underlight,
    /// Raise the head section one step
    HeadUp,
    /// Lower the head section one step
    HeadDown,
    /// Raise the foot section one step
    FootUp,
    /// Lower the foot section one step
    FootDown,
    /// Toggle massage on or off
    MassageToggle,
    /// Step the wave massage program to its next setting
    MassageWaveCycle,
    /// Step the head massage intensity to its next setting
    MassageHeadCycle,
    /// Step the foot massage intensity to its next setting
    MassageFootCycle,
    /// Step the massage timer to its next duration
    MassageTimer,
    /// No-op probe used by the liveness monitor; not addressable by name
    Keepalive,
}

impl BedCommand {
    /// Every command in the table, including the internal keepalive
    pub const ALL: [BedCommand; 18] = [
        Self::PresetFlat,
        Self::PresetZeroG,
        Self::PresetTv,
        Self::PresetLounge,
        Self::PresetQuietSleep,
        Self::Memory1,
        Self::Memory2,
        Self::Underlight,
        Self::HeadUp,
        Self::HeadDown,
        Self::FootUp,
        Self::FootDown,
        Self::MassageToggle,
        Self::MassageWaveCycle,
        Self::MassageHeadCycle,
        Self::MassageFootCycle,
        Self::MassageTimer,
        Self::Keepalive,
    ];

    /// The fixed packet written to the control characteristic
    pub fn payload(&self) -> [u8; COMMAND_PACKET_SIZE] {
        match self {
            Self::PresetFlat => [0xe6, 0xfe, 0x16, 0x00, 0x00, 0x00, 0x08, 0x00, 0xfd],
            Self::PresetZeroG => [0xe6, 0xfe, 0x16, 0x00, 0x10, 0x00, 0x00, 0x00, 0xf5],
            Self::PresetTv => [0xe6, 0xfe, 0x16, 0x00, 0x40, 0x00, 0x00, 0x00, 0xc5],
            Self::PresetLounge => [0xe6, 0xfe, 0x16, 0x00, 0x20, 0x00, 0x00, 0x00, 0xe5],
            Self::PresetQuietSleep => [0xe6, 0xfe, 0x16, 0x00, 0x80, 0x00, 0x00, 0x00, 0x85],
            Self::Memory1 => [0xe6, 0xfe, 0x16, 0x00, 0x00, 0x01, 0x00, 0x00, 0x04],
            Self::Memory2 => [0xe6, 0xfe, 0x16, 0x00, 0x00, 0x04, 0x00, 0x00, 0x01],
            Self::Underlight => [0xe6, 0xfe, 0x16, 0x00, 0x00, 0x02, 0x00, 0x00, 0x03],
            Self::HeadUp => [0xe6, 0xfe, 0x16, 0x01, 0x00, 0x00, 0x00, 0x00, 0x04],
            Self::HeadDown => [0xe6, 0xfe, 0x16, 0x02, 0x00, 0x00, 0x00, 0x00, 0x03],
            Self::FootUp => [0xe6, 0xfe, 0x16, 0x04, 0x00, 0x00, 0x00, 0x00, 0x01],
            Self::FootDown => [0xe6, 0xfe, 0x16, 0x08, 0x00, 0x00, 0x00, 0x00, 0xfd],
            Self::MassageToggle => [0xe6, 0xfe, 0x16, 0x00, 0x01, 0x00, 0x00, 0x00, 0x04],
            Self::MassageWaveCycle => [0xe6, 0xfe, 0x16, 0x00, 0x00, 0x00, 0x10, 0x00, 0xf5],
            Self::MassageHeadCycle => [0xe6, 0xfe, 0x16, 0x00, 0x08, 0x00, 0x00, 0x00, 0xfd],
            Self::MassageFootCycle => [0xe6, 0xfe, 0x16, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01],
            Self::MassageTimer => [0xe6, 0xfe, 0x16, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03],
            Self::Keepalive => [0xe6, 0xfe, 0x16, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05],
        }
    }

    /// The canonical name used for lookup and logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::PresetFlat => "preset_flat",
            Self::PresetZeroG => "preset_zero_g",
            Self::PresetTv => "preset_tv",
            Self::PresetLounge => "preset_lounge",
            Self::PresetQuietSleep => "preset_quiet_sleep",
            Self::Memory1 => "memory_1",
            Self::Memory2 => "memory_2",
            Self::Underlight => "underlight",
            Self::HeadUp => "head_up",
            Self::HeadDown => "head_down",
            Self::FootUp => "foot_up",
            Self::FootDown => "foot_down",
            Self::MassageToggle => "massage_toggle",
            Self::MassageWaveCycle => "massage_wave_cycle",
            Self::MassageHeadCycle => "massage_head_cycle",
            Self::MassageFootCycle => "massage_foot_cycle",
            Self::MassageTimer => "massage_timer",
            Self::Keepalive => "keepalive",
        }
    }

    /// Looks up a command by its canonical name
    ///
    /// The match is exact; there is no case folding or aliasing. The
    /// keepalive never resolves, so callers cannot inject probes through
    /// the command path.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|cmd| !cmd.is_internal() && cmd.name() == name)
            .copied()
    }

    /// Whether the command is reserved for the session's own use
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Keepalive)
    }
}
