//! Liveness monitoring for the bed session
//! The control box drops links silently; the only way to notice is to
//! write to it and see whether the write is acknowledged.

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::peripheral::Peripheral;
use crate::session::commands::BedCommand;
use crate::session::diagnostics::CharacteristicScanner;
use crate::session::manager::SessionInner;

/// Starts the keepalive loop for a session
///
/// Each tick holds the I/O section for its whole probe sequence, so a
/// half-dead link is never interleaved with command dispatch. The task
/// runs until the session is cancelled; probe failures feed the
/// reconnect policy and are never surfaced to callers.
pub(crate) fn spawn<P: Peripheral + 'static>(inner: Arc<SessionInner<P>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = Duration::from_secs(inner.config.keepalive_interval_secs);
        let retry_delay = Duration::from_millis(inner.config.keepalive_retry_delay_ms);
        let mut scanner = inner.config.diagnostic_scan.then(CharacteristicScanner::new);
        let mut ticker = tokio::time::interval(interval);
        // Ticks missed while a reconnect holds the loop are dropped,
        // not replayed back-to-back once the link returns.
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            "Liveness monitor started with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = inner.cancel.cancelled() => break,
            }

            let mut link = inner.link.lock().await;
            let keepalive = BedCommand::Keepalive.payload();

            let mut alive = match link.write_control(&keepalive).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Keepalive probe failed (1/2): {}", e);
                    false
                }
            };

            if !alive {
                // One more chance; momentary hiccups are common while
                // the frame's motors are running.
                tokio::time::sleep(retry_delay).await;
                alive = match link.write_control(&keepalive).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Keepalive probe failed (2/2), link presumed dead: {}", e);
                        false
                    }
                };
            }

            if alive {
                debug!("Keepalive acknowledged");
                match inner.refresh(&mut link).await {
                    Ok(_) => {
                        if let Some(scanner) = scanner.as_mut() {
                            scanner.sweep(&mut link).await;
                        }
                    }
                    Err(e) => warn!("Status refresh failed: {}", e),
                }
            } else if link.establish(&inner.cancel).await.is_err() {
                // Establish only fails on shutdown.
                break;
            }
        }

        info!("Liveness monitor stopped");
    })
}
