//! Session core for the bed's control box
//! This module handles the persistent device session: command dispatch,
//! liveness probing, reconnection, and status tracking.

mod commands;
mod connection;
pub mod constants;
mod diagnostics;
mod manager;
mod monitor;

// Re-export types that should be publicly accessible
pub use commands::BedCommand;
pub use connection::ConnectionManager;
pub use constants::*; // Re-export all constants
pub use manager::{BedSession, DeviceInfo};
