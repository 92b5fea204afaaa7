//! Transport abstraction over the physical printer link.
//!
//! The driver talks to the printer through [`PrinterLink`], implemented by
//! [`crate::ble::BleLink`] in production. Tests substitute a scripted link
//! for fault injection.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

/// Discovered device, identified by platform handle and advertised name.
/// The underlying peripheral handle stays inside the link implementation.
#[derive(Debug, Clone)]
pub struct LinkDevice {
    pub name: String,
    pub id: String,
}

/// Unsolicited events surfaced by the link.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// The platform reported a dropped connection for the given device.
    Disconnected { device_id: String },
}

/// Discovery constraints: advertised-name prefixes recognized by the profile
/// registry, plus the registry's service identifiers. A device matching a
/// prefix is returned immediately; a device advertising a known service but
/// an unrecognized name is returned at the deadline for the driver to
/// classify (and reject) itself.
#[derive(Debug, Clone)]
pub struct DiscoveryFilter {
    pub name_prefixes: Vec<&'static str>,
    pub services: Vec<Uuid>,
    pub timeout: Duration,
}

/// Errors at the link layer, wrapped into the crate taxonomy by the driver.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("adapter unavailable: {0}")]
    Adapter(String),

    #[error("scan failed: {0}")]
    Scan(String),

    #[error("no matching device found within {0:?}")]
    NoDevice(Duration),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("service {0} has no write characteristic {1}")]
    MissingCharacteristic(Uuid, Uuid),

    #[error("write failed: {0}")]
    Write(String),

    #[error("link not open")]
    NotOpen,
}

/// One physical link to a printer.
///
/// `write` sends a single already-fragmented chunk; fragmentation and pacing
/// are the transport loop's responsibility, since the active profile owns the
/// chunk geometry.
#[async_trait]
pub trait PrinterLink: Send {
    /// Scan until a device satisfies the filter or the deadline passes.
    async fn discover(&mut self, filter: &DiscoveryFilter) -> Result<LinkDevice, LinkError>;

    /// Open a session to a discovered device and resolve the write
    /// characteristic under the given service.
    async fn open(
        &mut self,
        device: &LinkDevice,
        service: Uuid,
        write_characteristic: Uuid,
    ) -> Result<(), LinkError>;

    /// Write one chunk to the resolved characteristic, awaiting completion.
    async fn write(&mut self, chunk: &[u8]) -> Result<(), LinkError>;

    /// Tear down the session. Tolerates not being open.
    async fn close(&mut self);

    /// Stream of unsolicited link events.
    async fn events(&mut self) -> Result<BoxStream<'static, LinkEvent>, LinkError>;
}
