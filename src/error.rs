//! Error types for the bed session core.

use thiserror::Error;

/// Main error type for bed session operations.
///
/// Transport faults are absorbed by the session's recovery policy and
/// never escape as process-fatal conditions; callers only ever see the
/// variants below.
#[derive(Debug, Error)]
pub enum BedError {
    /// The link could not be established or was lost at the transport level.
    #[error("connection error: {0}")]
    Connection(String),

    /// A single read or write on an open link failed.
    #[error("device i/o error: {0}")]
    Io(String),

    /// Command name not present in the command table. No I/O was performed.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Command could not be delivered despite the reconnect-and-retry policy.
    /// The command was dropped, not queued.
    #[error("command dropped: {name}")]
    CommandFailed { name: String },

    /// Status payload had an unexpected length or shape.
    #[error("malformed status payload: {0}")]
    Decode(String),

    /// The session was shut down while the operation was in flight.
    #[error("session shut down")]
    Shutdown,
}

/// Convenience result type for bed session operations.
pub type Result<T> = std::result::Result<T, BedError>;
