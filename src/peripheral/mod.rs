//! Transport seam for the bed session
//! This module defines the narrow interface the session core drives;
//! everything behind it is a platform detail.

pub mod bluest;

use uuid::Uuid;

use crate::error::Result;

pub use self::bluest::BluestPeripheral;

/// A GATT service and the characteristics it contains
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub uuid: Uuid,
    pub characteristics: Vec<Uuid>,
}

/// Peripheral transport trait
///
/// The session core only ever connects, reads, writes, and enumerates;
/// implementations own the platform handle and replace it wholesale on
/// every [`connect`](Peripheral::connect). A failed call leaves the
/// peripheral in a state where `connect` may be called again.
#[async_trait::async_trait]
pub trait Peripheral: Send {
    /// Establish (or re-establish) the link to the device
    ///
    /// Any previously returned capability is invalid afterwards. One
    /// call maps to one connection attempt; retry policy lives in the
    /// caller.
    async fn connect(&mut self) -> Result<()>;

    /// Read the current value of a characteristic
    async fn read_characteristic(&mut self, characteristic: Uuid) -> Result<Vec<u8>>;

    /// Write a payload to a characteristic, waiting for the device's
    /// acknowledgement
    async fn write_characteristic(&mut self, characteristic: Uuid, payload: &[u8]) -> Result<()>;

    /// Enumerate the device's services and their characteristics
    async fn services(&mut self) -> Result<Vec<ServiceInfo>>;
}
