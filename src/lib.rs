//! Lucid bed controller library
//! This is the main library for driving an Okin-based Lucid adjustable
//! bed frame over BLE: a persistent session with keepalive probing,
//! serialized command dispatch, and decoded status tracking.

// Module declarations
pub mod config;
pub mod error;
pub mod peripheral;
pub mod session;
pub mod status;

// Re-export the surface most callers need
pub use config::BedConfig;
pub use error::{BedError, Result};
pub use peripheral::{BluestPeripheral, Peripheral, ServiceInfo};
pub use session::{BedCommand, BedSession, DeviceInfo};
pub use status::BedState;
