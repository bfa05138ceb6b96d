//! Constants used throughout the bed session core
//! This module contains all the constant values used by the session,
//! such as GATT UUIDs, payload layout offsets, and timing defaults.

use uuid::Uuid;

/// Manufacturer reported for the supported bed frame
pub const BED_MANUFACTURER: &str = "Lucid";

/// Model reported for the supported bed frame
pub const BED_MODEL: &str = "L600";

/// The UUID of the Okin control service (command writes)
pub const UUID_BED_CONTROL_SERVICE: Uuid = Uuid::from_u128(0x0000ffe5_0000_1000_8000_00805f9b34fb);

/// The UUID of the control characteristic all commands are written to
pub const UUID_BED_CONTROL_CHAR: Uuid = Uuid::from_u128(0x0000ffe9_0000_1000_8000_00805f9b34fb);

/// The UUID of the Okin status service (state reads)
pub const UUID_BED_STATUS_SERVICE: Uuid = Uuid::from_u128(0x0000ffe0_0000_1000_8000_00805f9b34fb);

/// The UUID of the status characteristic the control box reports through
pub const UUID_BED_STATUS_CHAR: Uuid = Uuid::from_u128(0x0000ffe4_0000_1000_8000_00805f9b34fb);

/// Command packet size in bytes
pub const COMMAND_PACKET_SIZE: usize = 9;

/// Status payload size in bytes
pub const STATUS_PAYLOAD_SIZE: usize = 16;

/// Offset of the underlight flag byte in the status payload
pub const STATUS_LIGHT_OFFSET: usize = 3;

/// Low-nibble value of the light byte that means the underlight is on
pub const STATUS_LIGHT_SENTINEL: u8 = 0x4;

/// Offset of the head position (little-endian u16) in the status payload
pub const STATUS_HEAD_OFFSET: usize = 4;

/// Offset of the foot position (little-endian u16) in the status payload
pub const STATUS_FOOT_OFFSET: usize = 6;

/// Raw head position value at the mechanical limit
pub const HEAD_MAX_RAW: f32 = 16000.0;

/// Head angle in degrees at the mechanical limit
pub const HEAD_MAX_ANGLE: f32 = 60.0;

/// Raw foot position value at the mechanical limit
pub const FOOT_MAX_RAW: f32 = 12000.0;

/// Foot angle in degrees at the mechanical limit
pub const FOOT_MAX_ANGLE: f32 = 45.0;

/// How long one connection attempt may scan for the device in seconds
pub const DEVICE_SCAN_TIMEOUT_SECS: u64 = 5;

/// Delay between connection attempts in milliseconds
pub const CONNECT_RETRY_DELAY_MS: u64 = 1000;

/// Keepalive probe interval in seconds (the control box drops silent
/// links well before two of these elapse)
pub const KEEPALIVE_INTERVAL_SECS: u64 = 10;

/// Delay before the second keepalive probe in milliseconds
pub const KEEPALIVE_RETRY_DELAY_MS: u64 = 500;

/// Window after a failed command write within which a fresh reconnect
/// still earns a single write retry, in seconds
pub const COMMAND_RETRY_WINDOW_SECS: u64 = 5;
