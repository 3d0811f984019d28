//! Transport capability consumed by the session
//!
//! The btleplug implementation lives in [`crate::ble`]; tests drive the
//! session through scripted in-memory implementations.

use std::fmt;

use futures::stream::BoxStream;

/// Transport-level identity of an advertising device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    /// Opaque identifier (BLE address); the exclusion set is keyed by this
    pub id: String,
    /// Advertised local name, if the advertisement carried one
    pub name: Option<String>,
}

impl DeviceIdentity {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self { id: id.into(), name: name.map(str::to_string) }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => write!(f, "<unnamed> ({})", self.id),
        }
    }
}

/// One advertisement seen during a scan
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub identity: DeviceIdentity,
    pub rssi: Option<i16>,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),
    #[error("no bluetooth adapter found")]
    NoAdapter,
    #[error("device {0} not found")]
    DeviceNotFound(String),
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(uuid::Uuid),
    #[error("operation timed out")]
    Timeout,
    #[error("connection closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

/// Scan and connect side of the transport
#[allow(async_fn_in_trait)]
pub trait PeripheralLink {
    type Connection: Connection;

    /// Start scanning; the stream yields advertisements until the scan stops
    async fn scan(&mut self) -> Result<BoxStream<'static, Advertisement>, LinkError>;

    async fn stop_scan(&mut self) -> Result<(), LinkError>;

    async fn connect(&mut self, identity: &DeviceIdentity) -> Result<Self::Connection, LinkError>;
}

/// An open connection to the target; one write/read round-trip at a time
#[allow(async_fn_in_trait)]
pub trait Connection {
    /// Write one frame, resolving once the peripheral acknowledged it
    async fn write(&mut self, frame: &[u8]) -> Result<(), LinkError>;

    /// Read the peripheral's current response value
    async fn read(&mut self) -> Result<Vec<u8>, LinkError>;

    async fn close(&mut self) -> Result<(), LinkError>;
}

/// Write `frame` then read the response: the one round-trip shape used by
/// both the handshake and the sweep
pub(crate) async fn round_trip<C: Connection>(
    conn: &mut C,
    frame: &[u8],
) -> Result<Vec<u8>, crate::SweepError> {
    conn.write(frame).await.map_err(|source| crate::SweepError::TransportWrite {
        frame: crate::error::hex(frame),
        source,
    })?;
    conn.read().await.map_err(|source| crate::SweepError::TransportRead {
        frame: crate::error::hex(frame),
        source,
    })
}
