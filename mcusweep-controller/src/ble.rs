//! btleplug-backed [`PeripheralLink`]
//!
//! Scans through the adapter's event stream, connects by address and talks
//! to the Tuya MCU bridge through its write and read characteristics.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, Service,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::BoxStream;
use futures::StreamExt;
use uuid::Uuid;

use mcusweep_proto::ble::{READ_CHAR_UUID, WRITE_CHAR_UUID};

use crate::link::{Advertisement, Connection, DeviceIdentity, LinkError, PeripheralLink};

/// Bound on every GATT write and read
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct BleConfig {
    /// Index into the system's adapter list
    pub adapter_index: usize,
    pub write_uuid: Uuid,
    pub read_uuid: Uuid,
    pub io_timeout: Duration,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            write_uuid: WRITE_CHAR_UUID,
            read_uuid: READ_CHAR_UUID,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// A nearby device as reported by [`BleLink::survey`]
#[derive(Debug, Clone)]
pub struct NearbyDevice {
    pub identity: DeviceIdentity,
    pub rssi: Option<i16>,
}

pub struct BleLink {
    adapter: Adapter,
    config: BleConfig,
}

impl BleLink {
    /// Open the configured Bluetooth adapter
    pub async fn new(config: BleConfig) -> Result<Self, LinkError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .nth(config.adapter_index)
            .ok_or(LinkError::NoAdapter)?;
        Ok(Self { adapter, config })
    }

    /// Scan for `duration` and list every device seen
    pub async fn survey(&self, duration: Duration) -> Result<Vec<NearbyDevice>, LinkError> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(duration).await;

        let peripherals = self.adapter.peripherals().await?;
        let mut devices = Vec::new();
        for peripheral in peripherals {
            if let Some(props) = peripheral.properties().await? {
                devices.push(NearbyDevice {
                    identity: DeviceIdentity::new(
                        peripheral.address().to_string(),
                        props.local_name.as_deref(),
                    ),
                    rssi: props.rssi,
                });
            }
        }

        self.adapter.stop_scan().await?;
        Ok(devices)
    }

    async fn find_peripheral(&self, id: &str) -> Result<Peripheral, LinkError> {
        for peripheral in self.adapter.peripherals().await? {
            if peripheral.address().to_string() == id {
                return Ok(peripheral);
            }
        }
        Err(LinkError::DeviceNotFound(id.to_string()))
    }
}

impl PeripheralLink for BleLink {
    type Connection = BleConnection;

    async fn scan(&mut self) -> Result<BoxStream<'static, Advertisement>, LinkError> {
        let events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let adapter = self.adapter.clone();
        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => return None,
                };
                let peripheral = adapter.peripheral(&id).await.ok()?;
                let props = peripheral.properties().await.ok()??;
                Some(Advertisement {
                    identity: DeviceIdentity::new(
                        peripheral.address().to_string(),
                        props.local_name.as_deref(),
                    ),
                    rssi: props.rssi,
                })
            }
        });
        Ok(stream.boxed())
    }

    async fn stop_scan(&mut self) -> Result<(), LinkError> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn connect(&mut self, identity: &DeviceIdentity) -> Result<BleConnection, LinkError> {
        let peripheral = self.find_peripheral(&identity.id).await?;
        let timeout = self.config.io_timeout;

        // a timed-out connect can still complete in the background
        let connected = with_timeout(timeout, peripheral.connect()).await;
        disconnect_on_error(connected, || peripheral.disconnect()).await?;
        let discovered = with_timeout(timeout, peripheral.discover_services()).await;
        disconnect_on_error(discovered, || peripheral.disconnect()).await?;

        let services = peripheral.services();
        tracing::info!(device = %identity, services = services.len(), "discovered GATT table");
        for line in gatt_table(&services) {
            tracing::info!("  {line}");
        }

        let characteristics = peripheral.characteristics();

        let find = |uuid: Uuid| {
            characteristics
                .iter()
                .find(|c| c.uuid == uuid)
                .cloned()
                .ok_or(LinkError::CharacteristicNotFound(uuid))
        };
        let (write_char, read_char) = match (find(self.config.write_uuid), find(self.config.read_uuid)) {
            (Ok(w), Ok(r)) => (w, r),
            (Err(error), _) | (_, Err(error)) => {
                let _ = peripheral.disconnect().await;
                return Err(error);
            }
        };

        Ok(BleConnection { peripheral, write_char, read_char, timeout })
    }
}

pub struct BleConnection {
    peripheral: Peripheral,
    write_char: Characteristic,
    read_char: Characteristic,
    timeout: Duration,
}

impl Connection for BleConnection {
    async fn write(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        with_timeout(
            self.timeout,
            self.peripheral.write(&self.write_char, frame, WriteType::WithResponse),
        )
        .await
    }

    async fn read(&mut self) -> Result<Vec<u8>, LinkError> {
        with_timeout(self.timeout, self.peripheral.read(&self.read_char)).await
    }

    async fn close(&mut self) -> Result<(), LinkError> {
        with_timeout(self.timeout, self.peripheral.disconnect()).await
    }
}

/// Drop a half-open link before handing `result`'s error back
async fn disconnect_on_error<T, D>(
    result: Result<T, LinkError>,
    disconnect: impl FnOnce() -> D,
) -> Result<T, LinkError>
where
    D: Future<Output = Result<(), btleplug::Error>>,
{
    if result.is_err() {
        if let Err(error) = disconnect().await {
            tracing::debug!(%error, "disconnect after failed setup");
        }
    }
    result
}

/// One line per service and characteristic, in the order btleplug reports them
fn gatt_table(services: &BTreeSet<Service>) -> Vec<String> {
    let mut lines = Vec::new();
    for service in services {
        let kind = if service.primary { "primary" } else { "secondary" };
        lines.push(format!("service {} ({kind})", service.uuid));
        for c in &service.characteristics {
            lines.push(format!("  characteristic {} {:?}", c.uuid, c.properties));
        }
    }
    lines
}

async fn with_timeout<T, F>(timeout: Duration, op: F) -> Result<T, LinkError>
where
    F: Future<Output = Result<T, btleplug::Error>>,
{
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(LinkError::Timeout),
    }
}
