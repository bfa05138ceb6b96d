//! Connection handling for the bed session
//! This module owns the link to the control box: indefinite-retry
//! establishment, the control-enable handshake, and the raw read/write
//! primitives the rest of the session goes through.

use log::{debug, info, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{BedError, Result};
use crate::peripheral::{Peripheral, ServiceInfo};
use crate::session::constants::{UUID_BED_CONTROL_CHAR, UUID_BED_STATUS_CHAR};

/// Connection manager for the bed
///
/// Owns the peripheral exclusively; the session serializes access so no
/// two operations ever touch the link at once.
pub struct ConnectionManager<P: Peripheral> {
    peripheral: P,
    retry_delay: Duration,
}

impl<P: Peripheral> ConnectionManager<P> {
    pub fn new(peripheral: P, retry_delay: Duration) -> Self {
        Self {
            peripheral,
            retry_delay,
        }
    }

    /// Connect to the bed, retrying until it succeeds or is cancelled
    ///
    /// Every attempt looks the same: connect, then the control-enable
    /// handshake. Failures are logged and retried after a fixed delay
    /// with no cap and no backoff growth; the bed being off overnight is
    /// normal operation, not an error state. Only cancellation makes
    /// this return without a live link.
    pub async fn establish(&mut self, cancel: &CancellationToken) -> Result<()> {
        let mut attempt: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(BedError::Shutdown);
            }
            attempt += 1;
            info!("Connecting to bed (attempt {})...", attempt);

            let result = tokio::select! {
                result = self.try_connect() => result,
                _ = cancel.cancelled() => return Err(BedError::Shutdown),
            };

            match result {
                Ok(()) => {
                    info!("Successfully connected to bed");
                    return Ok(());
                }
                Err(e) => {
                    warn!("Connection attempt {} failed: {}", attempt, e);
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_delay) => {}
                        _ = cancel.cancelled() => return Err(BedError::Shutdown),
                    }
                }
            }
        }
    }

    /// One connection attempt: link the device, then run the handshake
    ///
    /// The control box ignores command writes until both registers have
    /// been read once on the fresh link, and the second read confirms
    /// the status capability is present.
    async fn try_connect(&mut self) -> Result<()> {
        self.peripheral.connect().await?;

        let control = self
            .peripheral
            .read_characteristic(UUID_BED_CONTROL_CHAR)
            .await?;
        debug!("Control register read ({} bytes)", control.len());

        let status = self
            .peripheral
            .read_characteristic(UUID_BED_STATUS_CHAR)
            .await?;
        debug!("Status register read ({} bytes)", status.len());

        Ok(())
    }

    /// Write a command packet to the control characteristic
    ///
    /// Fails explicitly; recovery is the caller's policy, never this
    /// layer's.
    pub async fn write_control(&mut self, payload: &[u8]) -> Result<()> {
        debug!("Writing {} bytes to control characteristic", payload.len());
        self.peripheral
            .write_characteristic(UUID_BED_CONTROL_CHAR, payload)
            .await
    }

    /// Read the raw status payload from the status characteristic
    pub async fn read_status(&mut self) -> Result<Vec<u8>> {
        self.read_characteristic(UUID_BED_STATUS_CHAR).await
    }

    /// Read an arbitrary characteristic (used by the diagnostic sweep)
    pub async fn read_characteristic(&mut self, characteristic: Uuid) -> Result<Vec<u8>> {
        self.peripheral.read_characteristic(characteristic).await
    }

    /// Enumerate the device's services (used by the diagnostic sweep)
    pub async fn services(&mut self) -> Result<Vec<ServiceInfo>> {
        self.peripheral.services().await
    }
}
