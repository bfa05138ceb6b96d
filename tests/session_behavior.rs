//! Behavioral tests for the bed session, driven through a scripted
//! peripheral under paused tokio time.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time;
use uuid::Uuid;

use lucid_bed_controller::session::{UUID_BED_CONTROL_CHAR, UUID_BED_STATUS_CHAR};
use lucid_bed_controller::{
    BedCommand, BedConfig, BedError, BedSession, Peripheral, Result, ServiceInfo,
};

/// Shared script controlling and observing a [`FakeBed`].
#[derive(Default)]
struct Script {
    /// Next N control writes fail.
    fail_writes: Mutex<u32>,
    /// Next N connection attempts fail.
    fail_connects: Mutex<u32>,
    /// Time a successful connection attempt takes.
    connect_delay: Mutex<Duration>,
    /// Payload served on status reads.
    status: Mutex<Vec<u8>>,

    /// Successfully delivered control writes.
    writes: Mutex<Vec<Vec<u8>>>,
    /// Every control write attempt, including failed ones.
    write_attempts: AtomicU32,
    /// Characteristics read so far.
    reads: Mutex<Vec<Uuid>>,
    /// Connection attempts.
    connect_attempts: AtomicU32,
    /// Successful connections.
    connects: AtomicU32,
    /// Overlap detector: set while any I/O call is in progress.
    in_io: AtomicBool,
    overlapped: AtomicBool,
}

impl Script {
    fn new(status: Vec<u8>) -> Arc<Self> {
        let script = Script::default();
        *script.status.lock().unwrap() = status;
        Arc::new(script)
    }

    fn set_status(&self, status: Vec<u8>) {
        *self.status.lock().unwrap() = status;
    }

    fn set_fail_writes(&self, n: u32) {
        *self.fail_writes.lock().unwrap() = n;
    }

    fn set_fail_connects(&self, n: u32) {
        *self.fail_connects.lock().unwrap() = n;
    }

    fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    /// Delivered writes that are not keepalive probes.
    fn command_writes(&self) -> Vec<Vec<u8>> {
        let keepalive = BedCommand::Keepalive.payload().to_vec();
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|w| **w != keepalive)
            .cloned()
            .collect()
    }

    fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    fn write_attempts(&self) -> u32 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn reads_of(&self, characteristic: Uuid) -> usize {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|u| **u == characteristic)
            .count()
    }

    fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

/// Guard that trips the overlap flag if two I/O calls are ever live at
/// the same time.
struct IoGuard<'a>(&'a Script);

impl<'a> IoGuard<'a> {
    fn enter(script: &'a Script) -> IoGuard<'a> {
        if script.in_io.swap(true, Ordering::SeqCst) {
            script.overlapped.store(true, Ordering::SeqCst);
        }
        IoGuard(script)
    }
}

impl Drop for IoGuard<'_> {
    fn drop(&mut self) {
        self.0.in_io.store(false, Ordering::SeqCst);
    }
}

/// Scripted peripheral standing in for the bed's control box.
struct FakeBed {
    script: Arc<Script>,
    connected: bool,
}

impl FakeBed {
    fn new(script: Arc<Script>) -> Self {
        Self {
            script,
            connected: false,
        }
    }
}

#[async_trait::async_trait]
impl Peripheral for FakeBed {
    async fn connect(&mut self) -> Result<()> {
        let _guard = IoGuard::enter(&self.script);
        self.connected = false;
        self.script.connect_attempts.fetch_add(1, Ordering::SeqCst);

        {
            let mut fails = self.script.fail_connects.lock().unwrap();
            if *fails > 0 {
                *fails -= 1;
                return Err(BedError::Connection("scripted connect failure".into()));
            }
        }

        let delay = *self.script.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            time::sleep(delay).await;
        }

        self.connected = true;
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_characteristic(&mut self, characteristic: Uuid) -> Result<Vec<u8>> {
        let _guard = IoGuard::enter(&self.script);
        tokio::task::yield_now().await;
        if !self.connected {
            return Err(BedError::Io("not connected".into()));
        }
        self.script.reads.lock().unwrap().push(characteristic);
        if characteristic == UUID_BED_STATUS_CHAR {
            Ok(self.script.status.lock().unwrap().clone())
        } else if characteristic == UUID_BED_CONTROL_CHAR {
            Ok(vec![0x01])
        } else {
            Err(BedError::Io("no such characteristic".into()))
        }
    }

    async fn write_characteristic(&mut self, characteristic: Uuid, payload: &[u8]) -> Result<()> {
        let _guard = IoGuard::enter(&self.script);
        tokio::task::yield_now().await;
        if !self.connected {
            return Err(BedError::Io("not connected".into()));
        }
        if characteristic != UUID_BED_CONTROL_CHAR {
            return Err(BedError::Io("no such characteristic".into()));
        }
        self.script.write_attempts.fetch_add(1, Ordering::SeqCst);

        {
            let mut fails = self.script.fail_writes.lock().unwrap();
            if *fails > 0 {
                *fails -= 1;
                return Err(BedError::Io("scripted write failure".into()));
            }
        }

        self.script.writes.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    async fn services(&mut self) -> Result<Vec<ServiceInfo>> {
        let _guard = IoGuard::enter(&self.script);
        if !self.connected {
            return Err(BedError::Io("not connected".into()));
        }
        Ok(vec![
            ServiceInfo {
                uuid: Uuid::from_u128(0x0000ffe5_0000_1000_8000_00805f9b34fb),
                characteristics: vec![UUID_BED_CONTROL_CHAR],
            },
            ServiceInfo {
                uuid: Uuid::from_u128(0x0000ffe0_0000_1000_8000_00805f9b34fb),
                characteristics: vec![UUID_BED_STATUS_CHAR],
            },
        ])
    }
}

/// Builds a 16-byte status payload.
fn status_payload(light_on: bool, head_raw: u16, foot_raw: u16) -> Vec<u8> {
    let mut data = vec![0u8; 16];
    data[0] = 0xe6;
    data[1] = 0xfe;
    data[2] = 0x17;
    data[3] = if light_on { 0x04 } else { 0x00 };
    data[4..6].copy_from_slice(&head_raw.to_le_bytes());
    data[6..8].copy_from_slice(&foot_raw.to_le_bytes());
    data
}

async fn start_session(script: &Arc<Script>, config: BedConfig) -> BedSession<FakeBed> {
    let session = BedSession::connect(FakeBed::new(script.clone()), config)
        .await
        .unwrap();
    // Let the monitor's immediate first tick finish so its traffic does
    // not mix into per-test counters.
    time::sleep(Duration::from_millis(10)).await;
    session
}

#[tokio::test(start_paused = true)]
async fn command_write_reaches_the_control_characteristic() {
    let script = Script::new(status_payload(true, 15936, 6000));
    let session = start_session(&script, BedConfig::default()).await;

    // The handshake read both registers during the initial connect.
    assert!(script.reads_of(UUID_BED_CONTROL_CHAR) >= 1);
    assert!(script.reads_of(UUID_BED_STATUS_CHAR) >= 1);

    let state = session.send_command("preset_flat").await.unwrap();

    assert_eq!(
        script.command_writes(),
        vec![BedCommand::PresetFlat.payload().to_vec()]
    );
    assert!((state.head_angle - 59.76).abs() < 1e-3);
    assert!((state.foot_angle - 22.5).abs() < 1e-3);
    assert!(state.light_on);
    assert_eq!(session.current_preset(), Some("preset_flat"));
    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn unknown_command_performs_no_io() {
    let script = Script::new(status_payload(false, 0, 0));
    let session = start_session(&script, BedConfig::default()).await;

    match session.send_command("preset flat").await {
        Err(BedError::UnknownCommand(name)) => assert_eq!(name, "preset flat"),
        other => panic!("expected unknown command, got {other:?}"),
    }

    assert!(script.command_writes().is_empty());
    assert_eq!(script.connects(), 1);
    assert_eq!(session.current_preset(), None);
    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn quick_reconnect_earns_one_retry() {
    let script = Script::new(status_payload(false, 8000, 0));
    let session = start_session(&script, BedConfig::default()).await;

    script.set_fail_writes(1);
    script.set_connect_delay(Duration::from_secs(2));

    let state = session.send_command("preset_zero_g").await.unwrap();

    // One failed write, one reconnect, exactly one delivered retry.
    assert_eq!(script.connects(), 2);
    assert_eq!(
        script.command_writes(),
        vec![BedCommand::PresetZeroG.payload().to_vec()]
    );
    assert!((state.head_angle - 30.0).abs() < 1e-3);
    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn slow_reconnect_drops_the_command() {
    let script = Script::new(status_payload(false, 0, 0));
    let session = start_session(&script, BedConfig::default()).await;

    script.set_fail_writes(1);
    script.set_connect_delay(Duration::from_secs(7));

    match session.send_command("preset_flat").await {
        Err(BedError::CommandFailed { name }) => assert_eq!(name, "preset_flat"),
        other => panic!("expected dropped command, got {other:?}"),
    }

    // The session reconnected, but the stale command was not replayed.
    assert_eq!(script.connects(), 2);
    assert!(script.command_writes().is_empty());

    // The session is healthy again for the next command.
    let _ = session.send_command("preset_flat").await.unwrap();
    assert_eq!(script.command_writes().len(), 1);
    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn double_probe_failure_reconnects_once() {
    let script = Script::new(status_payload(false, 0, 0));
    let session = start_session(&script, BedConfig::default()).await;

    script.set_fail_writes(2);

    // Just past the next tick: first probe has failed, the retry is
    // still pending.
    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(script.connects(), 1);

    // Past the retry delay: second probe failed, link re-established.
    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(script.connects(), 2);

    // Two failed probe attempts, no more.
    let failed = script.write_attempts() - script.writes.lock().unwrap().len() as u32;
    assert_eq!(failed, 2);
    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn missed_ticks_do_not_burst_after_reconnect() {
    let script = Script::new(status_payload(false, 0, 0));
    let session = start_session(&script, BedConfig::default()).await;

    // Both probes of the next tick fail, and the reconnect that follows
    // spans six further tick deadlines.
    script.set_fail_writes(2);
    script.set_connect_delay(Duration::from_secs(65));

    // Probes fail at 10 s and 10.5 s; the reconnect lands at 75.5 s.
    time::sleep(Duration::from_secs(76)).await;
    assert_eq!(script.connects(), 2);

    // One overdue probe on recovery, not one per missed deadline.
    assert_eq!(script.write_attempts(), 4);

    // Pacing resumes a full interval after the overdue probe, so the
    // next one lands at 85.5 s.
    time::sleep(Duration::from_secs(8)).await;
    assert_eq!(script.write_attempts(), 4);
    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(script.write_attempts(), 5);
    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn identical_status_payloads_notify_once() {
    let script = Script::new(status_payload(true, 15936, 6000));
    let session = start_session(&script, BedConfig::default()).await;

    let mut rx = session.subscribe();
    rx.borrow_and_update();

    // Next tick re-reads an identical payload: no wakeup.
    time::sleep(Duration::from_secs(10)).await;
    assert!(!rx.has_changed().unwrap());

    // A genuinely different payload wakes the subscriber.
    script.set_status(status_payload(false, 15936, 6000));
    time::sleep(Duration::from_secs(10)).await;
    assert!(rx.has_changed().unwrap());
    let state = *rx.borrow_and_update();
    assert!(!state.light_on);
    assert!((state.head_angle - 59.76).abs() < 1e-3);
    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn concurrent_commands_serialize_on_the_link() {
    let script = Script::new(status_payload(false, 0, 0));
    let session = start_session(&script, BedConfig::default()).await;

    let first = session.clone();
    let second = session.clone();
    let t1 = tokio::spawn(async move {
        for _ in 0..5 {
            first.send_command("head_up").await.unwrap();
        }
    });
    let t2 = tokio::spawn(async move {
        for _ in 0..5 {
            second.send_command("foot_up").await.unwrap();
        }
    });
    t1.await.unwrap();
    t2.await.unwrap();

    assert_eq!(script.command_writes().len(), 10);
    assert!(!script.overlapped(), "device I/O overlapped");
    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_inflight_reconnect() {
    let script = Script::new(status_payload(false, 0, 0));
    let session = start_session(&script, BedConfig::default()).await;

    script.set_fail_writes(1);
    script.set_fail_connects(u32::MAX);

    let worker = session.clone();
    let handle = tokio::spawn(async move { worker.send_command("preset_flat").await });

    // A few failed attempts at one-second spacing, then stop the session.
    time::sleep(Duration::from_secs(3)).await;
    session.shutdown();

    match handle.await.unwrap() {
        Err(BedError::Shutdown) => {}
        other => panic!("expected shutdown, got {other:?}"),
    }
    assert_eq!(script.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_monitor() {
    let script = Script::new(status_payload(false, 0, 0));
    let session = start_session(&script, BedConfig::default()).await;

    session.shutdown();
    let before = script.write_attempts();

    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(script.write_attempts(), before);
}

#[tokio::test(start_paused = true)]
async fn diagnostic_sweep_reads_every_characteristic() {
    let script = Script::new(status_payload(false, 0, 0));
    let config = BedConfig {
        diagnostic_scan: true,
        ..BedConfig::default()
    };
    let session = start_session(&script, config).await;

    // Handshake read the control register once; only the sweep reads it
    // again afterwards.
    assert!(script.reads_of(UUID_BED_CONTROL_CHAR) >= 2);
    session.shutdown();
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_skips_the_diagnostic_sweep() {
    let script = Script::new(status_payload(false, 0, 0));
    let config = BedConfig {
        diagnostic_scan: true,
        ..BedConfig::default()
    };
    let session = start_session(&script, config).await;

    let control_reads = script.reads_of(UUID_BED_CONTROL_CHAR);
    script.set_status(vec![0xe6, 0xfe, 0x17]);

    // Next tick: the probe goes out, the truncated payload fails to
    // decode, and no sweep traffic follows.
    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(script.write_attempts(), 2);
    assert_eq!(script.reads_of(UUID_BED_CONTROL_CHAR), control_reads);
    session.shutdown();
}
