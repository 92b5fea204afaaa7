//! BLE link implementation using btleplug.
//!
//! Scanning is event-driven: discovery events are matched against the
//! profile registry's name prefixes as they arrive, with a deadline. Link
//! loss is surfaced through the adapter's event stream.

use std::collections::HashMap;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::link::{DiscoveryFilter, LinkDevice, LinkError, LinkEvent, PrinterLink};

/// BLE implementation of [`PrinterLink`].
pub struct BleLink {
    adapter: Adapter,
    /// Peripherals seen during the last discovery, keyed by platform id.
    discovered: HashMap<String, Peripheral>,
    peripheral: Option<Peripheral>,
    write_char: Option<Characteristic>,
}

impl BleLink {
    /// Initialize the platform BLE adapter (first available).
    pub async fn new() -> Result<Self, LinkError> {
        let manager = Manager::new()
            .await
            .map_err(|e| LinkError::Adapter(e.to_string()))?;

        let adapters = manager
            .adapters()
            .await
            .map_err(|e| LinkError::Adapter(e.to_string()))?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| LinkError::Adapter("no BLE adapter found".into()))?;

        Ok(Self {
            adapter,
            discovered: HashMap::new(),
            peripheral: None,
            write_char: None,
        })
    }

    async fn describe(&self, id: &btleplug::platform::PeripheralId) -> Option<(String, Vec<Uuid>, Peripheral)> {
        let peripheral = self.adapter.peripheral(id).await.ok()?;
        let props = peripheral.properties().await.ok()??;
        let name = props.local_name.unwrap_or_default();
        Some((name, props.services, peripheral))
    }
}

#[async_trait]
impl PrinterLink for BleLink {
    async fn discover(&mut self, filter: &DiscoveryFilter) -> Result<LinkDevice, LinkError> {
        tracing::info!(timeout = ?filter.timeout, prefixes = ?filter.name_prefixes, "starting BLE scan");
        self.discovered.clear();

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| LinkError::Scan(e.to_string()))?;

        let mut events = match self.adapter.events().await {
            Ok(events) => events,
            Err(e) => {
                let _ = self.adapter.stop_scan().await;
                return Err(LinkError::Scan(e.to_string()));
            }
        };

        let deadline = tokio::time::sleep(filter.timeout);
        tokio::pin!(deadline);

        // A named device advertising a known service but no known prefix;
        // returned at the deadline so the driver can classify it.
        let mut candidate: Option<LinkDevice> = None;

        let result = loop {
            tokio::select! {
                _ = &mut deadline => {
                    break candidate.take().ok_or(LinkError::NoDevice(filter.timeout));
                }
                event = events.next() => {
                    let Some(event) = event else {
                        break candidate.take().ok_or_else(|| LinkError::Scan("event stream ended".into()));
                    };
                    let CentralEvent::DeviceDiscovered(id) = event else {
                        continue;
                    };
                    let Some((name, services, peripheral)) = self.describe(&id).await else {
                        continue;
                    };
                    if name.is_empty() {
                        continue;
                    }

                    let id_str = id.to_string();
                    self.discovered.insert(id_str.clone(), peripheral);

                    if filter.name_prefixes.iter().any(|p| name.starts_with(p)) {
                        tracing::info!(name = %name, id = %id_str, "found printer");
                        break Ok(LinkDevice { name, id: id_str });
                    }
                    if candidate.is_none()
                        && filter.services.iter().any(|s| services.contains(s))
                    {
                        tracing::debug!(name = %name, id = %id_str, "service match without known prefix");
                        candidate = Some(LinkDevice { name, id: id_str });
                    }
                }
            }
        };

        if let Err(e) = self.adapter.stop_scan().await {
            tracing::warn!(error = %e, "failed to stop BLE scan");
        }
        result
    }

    async fn open(
        &mut self,
        device: &LinkDevice,
        service: Uuid,
        write_characteristic: Uuid,
    ) -> Result<(), LinkError> {
        let peripheral = self
            .discovered
            .get(&device.id)
            .cloned()
            .ok_or_else(|| LinkError::Connect(format!("unknown device id {}", device.id)))?;

        tracing::info!(id = %device.id, name = %device.name, "connecting to printer");

        peripheral
            .connect()
            .await
            .map_err(|e| LinkError::Connect(e.to_string()))?;

        peripheral
            .discover_services()
            .await
            .map_err(|e| LinkError::Connect(e.to_string()))?;

        let write_char = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == write_characteristic && c.service_uuid == service)
            .ok_or(LinkError::MissingCharacteristic(service, write_characteristic))?;

        self.write_char = Some(write_char);
        self.peripheral = Some(peripheral);

        tracing::info!("connected and resolved write characteristic");
        Ok(())
    }

    async fn write(&mut self, chunk: &[u8]) -> Result<(), LinkError> {
        let peripheral = self.peripheral.as_ref().ok_or(LinkError::NotOpen)?;
        let write_char = self.write_char.as_ref().ok_or(LinkError::NotOpen)?;

        peripheral
            .write(write_char, chunk, WriteType::WithResponse)
            .await
            .map_err(|e| LinkError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        if let Some(peripheral) = self.peripheral.take() {
            tracing::info!("disconnecting BLE printer");
            if let Err(e) = peripheral.disconnect().await {
                tracing::warn!(error = %e, "BLE disconnect failed");
            }
        }
        self.write_char = None;
    }

    async fn events(&mut self) -> Result<BoxStream<'static, LinkEvent>, LinkError> {
        let events = self
            .adapter
            .events()
            .await
            .map_err(|e| LinkError::Scan(e.to_string()))?;

        Ok(events
            .filter_map(|event| async move {
                match event {
                    CentralEvent::DeviceDisconnected(id) => Some(LinkEvent::Disconnected {
                        device_id: id.to_string(),
                    }),
                    _ => None,
                }
            })
            .boxed())
    }
}
