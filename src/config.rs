//! Session configuration
//! Persistent settings for the bed session, loaded from and saved to a
//! JSON file next to the supervising process's other state.

use anyhow::Result;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::session::constants::{
    COMMAND_RETRY_WINDOW_SECS, CONNECT_RETRY_DELAY_MS, KEEPALIVE_INTERVAL_SECS,
    KEEPALIVE_RETRY_DELAY_MS,
};

pub const CONFIG_FILE_NAME: &str = "bed_config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedConfig {
    /// Bluetooth address of the bed's control box, e.g. "DC:BB:48:42:D9:3E".
    /// Must be set before a session can connect.
    pub address: String,

    /// Seconds between keepalive probes. The control box drops links it
    /// considers idle, so this should stay in the 1-10 second range.
    pub keepalive_interval_secs: u64,

    /// Milliseconds to wait before the second probe after a failed one.
    pub keepalive_retry_delay_ms: u64,

    /// Milliseconds between connection attempts while reconnecting.
    pub connect_retry_delay_ms: u64,

    /// Seconds a reconnect may take before a pending command write is
    /// dropped instead of retried.
    pub command_retry_window_secs: u64,

    /// When true, every liveness tick also reads all readable
    /// characteristics and logs any change. Noisy; for protocol
    /// exploration only.
    pub diagnostic_scan: bool,
}

impl Default for BedConfig {
    fn default() -> Self {
        BedConfig {
            address: String::new(),
            keepalive_interval_secs: KEEPALIVE_INTERVAL_SECS,
            keepalive_retry_delay_ms: KEEPALIVE_RETRY_DELAY_MS,
            connect_retry_delay_ms: CONNECT_RETRY_DELAY_MS,
            command_retry_window_secs: COMMAND_RETRY_WINDOW_SECS,
            diagnostic_scan: false,
        }
    }
}

impl BedConfig {
    /// Loads the config from a configuration file.
    pub async fn load_config(config_dir: &Path) -> Result<Self> {
        let file_path = config_dir.join(CONFIG_FILE_NAME);
        let file_path_str = file_path.to_string_lossy().into_owned();

        if !file_path.exists() {
            warn!(
                "Config file not found at {:?}, using default.",
                file_path_str
            );
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(file_path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Config loaded from {:?}", file_path_str);
        Ok(config)
    }

    /// Saves the current config to a configuration file.
    pub async fn save_config(&self, config_dir: &Path) -> Result<()> {
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).await?;
        }

        let file_path = config_dir.join(CONFIG_FILE_NAME);
        let file_path_str = file_path.to_string_lossy().into_owned();

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize bed config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(file_path, config_json).await?;

        info!("Bed config saved to {:?}.", file_path_str);
        Ok(())
    }
}
