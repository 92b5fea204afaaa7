//! Printer driver: connection supervision and the transmit loop.
//!
//! One driver owns at most one printer link. Caller-invoked operations and
//! unsolicited link-loss events both funnel through a single mutex, so a
//! loss notification arriving mid-print cannot race the write loop's own
//! failure handling. A read-only state snapshot is published separately so
//! UI callers can poll without contending on the driver lock.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, watch};

use crate::ble::BleLink;
use crate::encoding;
use crate::job::PrintJob;
use crate::label;
use crate::link::{DiscoveryFilter, LinkDevice, LinkEvent, PrinterLink};
use crate::profile::{self, PrinterProfile};
use crate::{PrinterError, Result};

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// How long discovery scans before giving up.
    pub scan_timeout: Duration,
    /// Override the active profile's chunk size; clamped to the profile's
    /// maximum so the link MTU cannot be exceeded.
    pub chunk_override: Option<usize>,
    /// Override the active profile's inter-chunk pacing delay.
    pub delay_override: Option<Duration>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(10),
            chunk_override: None,
            delay_override: None,
        }
    }
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the discovery scan timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Builder: override the chunk size (minimum 1 byte).
    pub fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.chunk_override = Some(bytes.max(1));
        self
    }

    /// Builder: override the inter-chunk pacing delay.
    pub fn with_inter_chunk_delay(mut self, delay: Duration) -> Self {
        self.delay_override = Some(delay);
        self
    }
}

/// Read-only connection snapshot exposed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub is_scanning: bool,
    pub device_name: Option<String>,
    pub profile_name: Option<&'static str>,
    pub status_message: String,
    pub last_error: Option<String>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            is_connected: false,
            is_scanning: false,
            device_name: None,
            profile_name: None,
            status_message: "Idle".to_string(),
            last_error: None,
        }
    }
}

enum LabelKind {
    Production,
    Defect,
}

/// Mutable driver state, guarded by one mutex.
struct Inner {
    link: Box<dyn PrinterLink>,
    device: Option<LinkDevice>,
    profile: Option<&'static PrinterProfile>,
    connected: bool,
    /// Generation counter; a new value retires the previous link-loss
    /// watcher and invalidates its pending events.
    session: u64,
    /// Label counter embedded into each label before increment. Incremented
    /// only after a fully transmitted job; survives reconnects, resets only
    /// with a new driver instance.
    counter: u32,
}

/// Drives exactly one TSPL label printer over one link.
pub struct PrinterDriver {
    config: DriverConfig,
    inner: Arc<Mutex<Inner>>,
    state: Arc<RwLock<ConnectionState>>,
    session_tx: Arc<watch::Sender<u64>>,
}

/// Tear down the session and publish the reason. Idempotent; also invoked
/// for unsolicited link loss.
async fn teardown(
    inner: &mut Inner,
    state: &RwLock<ConnectionState>,
    session_tx: &watch::Sender<u64>,
    reason: &str,
    failed: bool,
) {
    inner.link.close().await;
    inner.device = None;
    inner.profile = None;
    inner.connected = false;
    inner.session += 1;
    session_tx.send_replace(inner.session);

    let mut snapshot = state.write().await;
    snapshot.is_connected = false;
    snapshot.is_scanning = false;
    snapshot.device_name = None;
    snapshot.profile_name = None;
    snapshot.status_message = reason.to_string();
    if failed {
        snapshot.last_error = Some(reason.to_string());
    }
}

impl PrinterDriver {
    /// Create a driver over the platform BLE link.
    pub async fn new(config: DriverConfig) -> Result<Self> {
        let link = BleLink::new()
            .await
            .map_err(|e| PrinterError::ConnectFailed(e.to_string()))?;
        Ok(Self::with_link(Box::new(link), config))
    }

    /// Create a driver over a custom link. This is the transport seam used
    /// by tests and alternative platforms.
    pub fn with_link(link: Box<dyn PrinterLink>, config: DriverConfig) -> Self {
        let (session_tx, _) = watch::channel(0);
        Self {
            config,
            inner: Arc::new(Mutex::new(Inner {
                link,
                device: None,
                profile: None,
                connected: false,
                session: 0,
                counter: 1,
            })),
            state: Arc::new(RwLock::new(ConnectionState::default())),
            session_tx: Arc::new(session_tx),
        }
    }

    /// Current connection snapshot.
    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Current label counter value.
    pub async fn counter(&self) -> u32 {
        self.inner.lock().await.counter
    }

    /// Discover a printer, match it against the profile registry, open the
    /// session, and register the link-loss watcher.
    ///
    /// Idempotent: a no-op when already connected. Failures are recorded in
    /// the connection state *and* returned, so both poll-based and
    /// result-based callers observe them.
    pub async fn connect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.connected {
            tracing::debug!("connect called while already connected");
            return Ok(());
        }

        {
            let mut snapshot = self.state.write().await;
            snapshot.is_scanning = true;
            snapshot.status_message = "Scanning for printers".to_string();
        }

        let filter = DiscoveryFilter {
            name_prefixes: profile::known_prefixes(),
            services: profile::known_services(),
            timeout: self.config.scan_timeout,
        };

        let device = match inner.link.discover(&filter).await {
            Ok(device) => device,
            Err(e) => {
                let reason = format!("Scan failed: {e}");
                teardown(&mut inner, &self.state, &self.session_tx, &reason, true).await;
                return Err(PrinterError::ConnectFailed(e.to_string()));
            }
        };

        let Some(profile) = profile::match_profile(&device.name) else {
            let reason = format!("Unsupported device: {}", device.name);
            teardown(&mut inner, &self.state, &self.session_tx, &reason, true).await;
            return Err(PrinterError::UnsupportedDevice(device.name));
        };

        if let Err(e) = inner
            .link
            .open(&device, profile.service_uuid, profile.write_characteristic)
            .await
        {
            let reason = format!("Connect failed: {e}");
            teardown(&mut inner, &self.state, &self.session_tx, &reason, true).await;
            return Err(PrinterError::ConnectFailed(e.to_string()));
        }

        let events = match inner.link.events().await {
            Ok(events) => events,
            Err(e) => {
                let reason = format!("Connect failed: {e}");
                teardown(&mut inner, &self.state, &self.session_tx, &reason, true).await;
                return Err(PrinterError::ConnectFailed(e.to_string()));
            }
        };

        inner.session += 1;
        let session = inner.session;
        self.session_tx.send_replace(session);
        inner.device = Some(device.clone());
        inner.profile = Some(profile);
        inner.connected = true;

        {
            let mut snapshot = self.state.write().await;
            snapshot.is_connected = true;
            snapshot.is_scanning = false;
            snapshot.device_name = Some(device.name.clone());
            snapshot.profile_name = Some(profile.name);
            snapshot.status_message = format!("Connected to {}", device.name);
            snapshot.last_error = None;
        }

        tracing::info!(device = %device.name, profile = profile.name, "printer connected");
        self.spawn_watcher(events, session, device.id, device.name);
        Ok(())
    }

    /// Tear down the session, recording `reason` as the status message.
    /// Tolerates being called when already disconnected.
    pub async fn disconnect(&self, reason: &str) {
        let mut inner = self.inner.lock().await;
        if inner.connected {
            tracing::info!(reason = %reason, "disconnecting printer");
        }
        teardown(&mut inner, &self.state, &self.session_tx, reason, false).await;
    }

    /// Print a standard production label.
    pub async fn print(&self, job: &PrintJob) -> Result<()> {
        self.transmit(job, LabelKind::Production).await
    }

    /// Print a defect-tracking label.
    pub async fn print_defect(&self, job: &PrintJob) -> Result<()> {
        self.transmit(job, LabelKind::Defect).await
    }

    async fn transmit(&self, job: &PrintJob, kind: LabelKind) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.connected {
            return Err(PrinterError::PrinterNotReady);
        }
        let profile = inner.profile.ok_or(PrinterError::PrinterNotReady)?;

        let document = match kind {
            LabelKind::Production => label::production(job, inner.counter),
            LabelKind::Defect => label::defect(job, inner.counter),
        };

        let payload = match encoding::encode(&document, profile.encoding) {
            Ok(payload) => payload,
            Err(e) => {
                let reason = format!("Encode failed: {e}");
                teardown(&mut inner, &self.state, &self.session_tx, &reason, true).await;
                return Err(PrinterError::PrintFailed(e.to_string()));
            }
        };

        // Chunk boundaries are computed on the encoded byte length, not the
        // character count.
        let chunk_size = self
            .config
            .chunk_override
            .unwrap_or(profile.max_chunk_bytes)
            .clamp(1, profile.max_chunk_bytes);
        let delay = self.config.delay_override.unwrap_or(profile.inter_chunk_delay);
        let total = payload.len().div_ceil(chunk_size);

        tracing::debug!(
            bytes = payload.len(),
            chunks = total,
            chunk_size,
            "transmitting label"
        );

        for (i, chunk) in payload.chunks(chunk_size).enumerate() {
            if let Err(e) = inner.link.write(chunk).await {
                let reason = format!("Write failed on chunk {}/{}: {e}", i + 1, total);
                teardown(&mut inner, &self.state, &self.session_tx, &reason, true).await;
                return Err(PrinterError::PrintFailed(reason));
            }
            if i + 1 < total {
                tokio::time::sleep(delay).await;
            }
        }

        inner.counter += 1;
        tracing::info!(counter = inner.counter, "label transmitted");
        Ok(())
    }

    /// Watch the link's event stream for an unsolicited disconnect of the
    /// connected device. Retired via the session watch channel when the
    /// session it belongs to ends.
    fn spawn_watcher(
        &self,
        mut events: BoxStream<'static, LinkEvent>,
        session: u64,
        device_id: String,
        device_name: String,
    ) {
        let inner = Arc::clone(&self.inner);
        let state = Arc::clone(&self.state);
        let session_tx = Arc::clone(&self.session_tx);
        let mut session_rx = self.session_tx.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = session_rx.changed() => {
                        if changed.is_err() || *session_rx.borrow_and_update() != session {
                            break;
                        }
                    }
                    event = events.next() => {
                        match event {
                            Some(LinkEvent::Disconnected { device_id: id }) if id == device_id => {
                                let mut guard = inner.lock().await;
                                if guard.session == session && guard.connected {
                                    let reason =
                                        PrinterError::LinkLost(device_name.clone()).to_string();
                                    tracing::warn!(device = %device_name, "unsolicited link loss");
                                    teardown(&mut guard, &state, &session_tx, &reason, true).await;
                                }
                                break;
                            }
                            Some(_) => {}
                            None => break,
                        }
                    }
                }
            }
        });
    }
}
