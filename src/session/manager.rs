//! Bed session facade
//! This module wires the connection manager, liveness monitor, and
//! status tracking together behind one owned handle, and carries the
//! command dispatch policy.

use log::{error, info, warn};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::BedConfig;
use crate::error::{BedError, Result};
use crate::peripheral::Peripheral;
use crate::session::commands::BedCommand;
use crate::session::connection::ConnectionManager;
use crate::session::constants::{BED_MANUFACTURER, BED_MODEL};
use crate::session::monitor;
use crate::status::{self, BedState};

/// Static identity of the supported bed frame
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct DeviceInfo {
    pub manufacturer: &'static str,
    pub model: &'static str,
}

/// Shared state behind a session handle
pub(crate) struct SessionInner<P: Peripheral> {
    /// The exclusive I/O section. Command dispatch and the liveness
    /// monitor both lock this for their whole write/read sequence, so
    /// device traffic is strictly serialized.
    pub(crate) link: Mutex<ConnectionManager<P>>,
    pub(crate) state_tx: watch::Sender<BedState>,
    pub(crate) current_preset: StdMutex<Option<&'static str>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) config: BedConfig,
}

/// Handle to a live bed session
///
/// Cheap to clone; all clones drive the same session. Transport faults
/// are handled internally by reconnecting, so apart from
/// [`BedError::CommandFailed`] the caller never deals with link state.
pub struct BedSession<P: Peripheral> {
    inner: Arc<SessionInner<P>>,
}

impl<P: Peripheral> Clone for BedSession<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Peripheral + 'static> BedSession<P> {
    /// Connects to the bed and starts the liveness monitor
    ///
    /// Blocks until the first connection and handshake succeed, however
    /// long that takes; a powered-off bed simply keeps this waiting.
    pub async fn connect(peripheral: P, config: BedConfig) -> Result<Self> {
        let cancel = CancellationToken::new();
        let mut link = ConnectionManager::new(
            peripheral,
            Duration::from_millis(config.connect_retry_delay_ms),
        );
        link.establish(&cancel).await?;

        let (state_tx, _) = watch::channel(BedState::default());
        let inner = Arc::new(SessionInner {
            link: Mutex::new(link),
            state_tx,
            current_preset: StdMutex::new(None),
            cancel,
            config,
        });

        monitor::spawn(inner.clone());
        info!("Bed session established");
        Ok(Self { inner })
    }

    /// Sends a named command to the bed
    ///
    /// Serialized against keepalive probes. If the write fails, the
    /// session reconnects; a reconnect faster than the configured
    /// window earns the command exactly one retry, a slower one drops
    /// it with [`BedError::CommandFailed`]. Dropped commands are never
    /// queued or replayed.
    pub async fn send_command(&self, name: &str) -> Result<BedState> {
        let Some(command) = BedCommand::from_name(name) else {
            error!("Unknown command: {}", name);
            return Err(BedError::UnknownCommand(name.to_string()));
        };
        let payload = command.payload();

        let mut link = self.inner.link.lock().await;

        info!("Sending command: {}", command.name());
        match link.write_control(&payload).await {
            Ok(()) => self.inner.after_delivery(&mut link, command).await,
            Err(e) => {
                warn!("Command write failed ({}), reconnecting...", e);
                let reconnect_started = Instant::now();
                link.establish(&self.inner.cancel).await?;
                let elapsed = reconnect_started.elapsed();

                let window = Duration::from_secs(self.inner.config.command_retry_window_secs);
                if elapsed >= window {
                    error!(
                        "Reconnect took {:.1}s, dropping command {}",
                        elapsed.as_secs_f32(),
                        command.name()
                    );
                    return Err(BedError::CommandFailed {
                        name: command.name().to_string(),
                    });
                }

                info!(
                    "Reconnected in {:.1}s, retrying command {}",
                    elapsed.as_secs_f32(),
                    command.name()
                );
                match link.write_control(&payload).await {
                    Ok(()) => self.inner.after_delivery(&mut link, command).await,
                    Err(e) => {
                        error!(
                            "Retry failed ({}), dropping command {}",
                            e,
                            command.name()
                        );
                        Err(BedError::CommandFailed {
                            name: command.name().to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Last known bed state; never blocks on device I/O
    pub fn state(&self) -> BedState {
        *self.inner.state_tx.borrow()
    }

    /// Subscribes to state changes
    ///
    /// The receiver wakes only when a status refresh actually changed a
    /// field; identical consecutive payloads produce nothing.
    pub fn subscribe(&self) -> watch::Receiver<BedState> {
        self.inner.state_tx.subscribe()
    }

    /// The last command delivered successfully, if any
    pub fn current_preset(&self) -> Option<&'static str> {
        *self.inner.current_preset.lock().unwrap()
    }

    /// Identity of the bed frame this crate speaks to
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            manufacturer: BED_MANUFACTURER,
            model: BED_MODEL,
        }
    }

    /// Stops the liveness monitor and any in-flight reconnect
    ///
    /// In-flight I/O finishes first; nothing is interrupted mid-write.
    pub fn shutdown(&self) {
        info!("Shutting down bed session");
        self.inner.cancel.cancel();
    }
}

impl<P: Peripheral> SessionInner<P> {
    /// Bookkeeping after a command write was acknowledged
    ///
    /// A failed refresh does not fail the command; delivery already
    /// succeeded, so the last known state is returned instead.
    pub(crate) async fn after_delivery(
        &self,
        link: &mut ConnectionManager<P>,
        command: BedCommand,
    ) -> Result<BedState> {
        *self.current_preset.lock().unwrap() = Some(command.name());
        match self.refresh(link).await {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!("Status refresh after command failed: {}", e);
                Ok(*self.state_tx.borrow())
            }
        }
    }

    /// Reads and decodes the status payload, publishing on change
    ///
    /// Each snapshot replaces the previous one atomically; subscribers
    /// are only woken when a field actually differs.
    pub(crate) async fn refresh(&self, link: &mut ConnectionManager<P>) -> Result<BedState> {
        let raw = link.read_status().await?;
        let next = status::decode_status(&raw)?;
        let prev = *self.state_tx.borrow();
        if next != prev {
            status::log_transitions(&prev, &next);
            self.state_tx.send_replace(next);
        }
        Ok(next)
    }
}
