//! bluest-backed peripheral for the bed's control box
//! This module resolves the configured address to a platform device and
//! carries the GATT traffic for the session core.

use std::collections::HashMap;
use std::time::Duration;

use bluest::{Adapter, Characteristic, Device};
use futures_util::StreamExt;
use log::{debug, info};
use regex::Regex;
use uuid::Uuid;

use crate::error::{BedError, Result};
use crate::peripheral::{Peripheral, ServiceInfo};
use crate::session::constants::DEVICE_SCAN_TIMEOUT_SECS;

impl From<bluest::Error> for BedError {
    fn from(err: bluest::Error) -> Self {
        BedError::Io(err.to_string())
    }
}

/// Production transport over the platform Bluetooth stack
///
/// The device and characteristic handles are replaced wholesale on every
/// [`connect`](Peripheral::connect); nothing from a previous link
/// survives a reconnect.
pub struct BluestPeripheral {
    adapter: Adapter,
    address: String,
    device: Option<Device>,
    characteristics: HashMap<Uuid, Characteristic>,
}

impl BluestPeripheral {
    /// Creates a peripheral bound to the given Bluetooth address
    pub async fn new(address: &str) -> Result<Self> {
        let adapter = Adapter::default()
            .await
            .ok_or_else(|| BedError::Connection("no Bluetooth adapter found".to_string()))?;
        adapter
            .wait_available()
            .await
            .map_err(|e| BedError::Connection(e.to_string()))?;
        info!("Bluetooth adapter is available.");

        Ok(Self {
            adapter,
            address: address.to_string(),
            device: None,
            characteristics: HashMap::new(),
        })
    }

    /// Resolves the configured address to a device handle
    ///
    /// Checks devices the platform already holds a link to first, then
    /// scans. The address is known ahead of time, so the scan stops at
    /// the first match.
    async fn locate_device(&self) -> Result<Device> {
        let connected = self
            .adapter
            .connected_devices()
            .await
            .map_err(|e| BedError::Connection(e.to_string()))?;
        for device in connected {
            if Self::matches_address(&device.id().to_string(), &self.address) {
                debug!("Bed is already linked at the platform level");
                return Ok(device);
            }
        }

        info!("Scanning for bed at {}", self.address);
        let scan = async {
            let mut scan_stream = self
                .adapter
                .scan(&[])
                .await
                .map_err(|e| BedError::Connection(e.to_string()))?;
            while let Some(discovered) = scan_stream.next().await {
                let device = discovered.device;
                let id = device.id().to_string();
                debug!("Found device - ID: {}, RSSI: {:?}", id, discovered.rssi);
                if Self::matches_address(&id, &self.address) {
                    return Ok(device);
                }
            }
            Err(BedError::Connection(
                "Bluetooth scan stream has ended".to_string(),
            ))
        };

        match tokio::time::timeout(Duration::from_secs(DEVICE_SCAN_TIMEOUT_SECS), scan).await {
            Ok(result) => result,
            Err(_) => Err(BedError::Connection(format!(
                "bed {} not seen within {} seconds",
                self.address, DEVICE_SCAN_TIMEOUT_SECS
            ))),
        }
    }

    /// Returns true if the platform device id refers to the target address
    fn matches_address(device_id_str: &str, target: &str) -> bool {
        let target_hex = Self::hex_digits(target);
        if target_hex.is_empty() {
            return false;
        }
        if let Some(mac) = Self::extract_mac_address(device_id_str) {
            if Self::hex_digits(&mac) == target_hex {
                return true;
            }
        }
        // BlueZ object paths separate the address with underscores, which
        // the colon/dash pattern does not cover.
        Self::hex_digits(device_id_str).contains(&target_hex)
    }

    fn extract_mac_address(device_id_str: &str) -> Option<String> {
        let re = Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})").unwrap();
        re.find_iter(device_id_str)
            .last()
            .map(|m| m.as_str().to_string().to_uppercase())
    }

    fn hex_digits(s: &str) -> String {
        s.chars()
            .filter(|c| c.is_ascii_hexdigit())
            .collect::<String>()
            .to_uppercase()
    }
}

#[async_trait::async_trait]
impl Peripheral for BluestPeripheral {
    async fn connect(&mut self) -> Result<()> {
        // Capabilities from the previous link are invalid from here on.
        self.device = None;
        self.characteristics.clear();

        let device = self.locate_device().await?;
        let id = device.id().to_string();
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Device details - ID: {}, Name: {:?}", id, name);

        if !device.is_connected().await {
            info!("Initiating connection to {}...", id);
            self.adapter
                .connect_device(&device)
                .await
                .map_err(|e| BedError::Connection(e.to_string()))?;
        }

        info!("Connection successful, discovering services...");
        let services = device
            .services()
            .await
            .map_err(|e| BedError::Connection(e.to_string()))?;
        for service in &services {
            let chars = service
                .characteristics()
                .await
                .map_err(|e| BedError::Connection(e.to_string()))?;
            for characteristic in chars {
                self.characteristics.insert(characteristic.uuid(), characteristic);
            }
        }
        debug!("Cached {} characteristics", self.characteristics.len());

        self.device = Some(device);
        Ok(())
    }

    async fn read_characteristic(&mut self, characteristic: Uuid) -> Result<Vec<u8>> {
        let ch = self.characteristics.get(&characteristic).ok_or_else(|| {
            BedError::Io(format!("characteristic {} not available", characteristic))
        })?;
        let value = ch.read().await?;
        Ok(value)
    }

    async fn write_characteristic(&mut self, characteristic: Uuid, payload: &[u8]) -> Result<()> {
        let ch = self.characteristics.get(&characteristic).ok_or_else(|| {
            BedError::Io(format!("characteristic {} not available", characteristic))
        })?;
        ch.write(payload).await?;
        Ok(())
    }

    async fn services(&mut self) -> Result<Vec<ServiceInfo>> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| BedError::Io("not connected".to_string()))?;
        let mut out = Vec::new();
        for service in device.services().await? {
            let mut characteristics = Vec::new();
            for ch in service.characteristics().await? {
                characteristics.push(ch.uuid());
            }
            out.push(ServiceInfo {
                uuid: service.uuid(),
                characteristics,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_colon_separated_ids() {
        assert!(BluestPeripheral::matches_address(
            "Peripheral(DC:BB:48:42:D9:3E)",
            "DC:BB:48:42:D9:3E"
        ));
        assert!(BluestPeripheral::matches_address(
            "dc-bb-48-42-d9-3e",
            "DC:BB:48:42:D9:3E"
        ));
    }

    #[test]
    fn matches_bluez_object_paths() {
        assert!(BluestPeripheral::matches_address(
            "/org/bluez/hci0/dev_DC_BB_48_42_D9_3E",
            "DC:BB:48:42:D9:3E"
        ));
    }

    #[test]
    fn rejects_other_devices_and_empty_targets() {
        assert!(!BluestPeripheral::matches_address(
            "AA:BB:CC:DD:EE:FF",
            "DC:BB:48:42:D9:3E"
        ));
        assert!(!BluestPeripheral::matches_address("anything", ""));
    }
}
