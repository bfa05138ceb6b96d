//! Diagnostic characteristic sweep
//! Protocol-exploration aid: reads everything the control box exposes
//! and logs whatever moved since the last look. Off by default.

use log::{debug, info};
use std::collections::HashMap;
use uuid::Uuid;

use crate::peripheral::Peripheral;
use crate::session::connection::ConnectionManager;

/// Tracks the last observed value of every readable characteristic
///
/// The map is bounded by the device's fixed characteristic set. Values
/// are compared byte-for-byte; unrelated characteristics are included
/// on purpose, since the point is spotting where undocumented state
/// lives.
pub(crate) struct CharacteristicScanner {
    last_values: HashMap<Uuid, Vec<u8>>,
}

impl CharacteristicScanner {
    pub(crate) fn new() -> Self {
        Self {
            last_values: HashMap::new(),
        }
    }

    /// Reads every characteristic once and logs the changes
    ///
    /// Runs inside the caller's I/O section. Read failures are normal
    /// (plenty of characteristics are not readable) and skipped.
    pub(crate) async fn sweep<P: Peripheral>(&mut self, link: &mut ConnectionManager<P>) {
        let services = match link.services().await {
            Ok(services) => services,
            Err(e) => {
                debug!("Diagnostic sweep skipped: {}", e);
                return;
            }
        };

        for service in services {
            for characteristic in service.characteristics {
                let value = match link.read_characteristic(characteristic).await {
                    Ok(value) => value,
                    Err(e) => {
                        debug!("Characteristic {} not readable: {}", characteristic, e);
                        continue;
                    }
                };

                match self.last_values.get(&characteristic) {
                    None => {
                        debug!(
                            "Characteristic {} initial value: {}",
                            characteristic,
                            hex(&value)
                        );
                    }
                    Some(prev) if *prev != value => {
                        info!(
                            "Characteristic {} changed: {} -> {}",
                            characteristic,
                            hex(prev),
                            hex(&value)
                        );
                    }
                    Some(_) => {}
                }
                self.last_values.insert(characteristic, value);
            }
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
