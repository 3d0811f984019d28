//! mcusweep controller
//!
//! Finds a single Tuya MCU peripheral over BLE, captures its baseline
//! response and sweeps the 24-bit send-command space until the device
//! answers differently.
//!
//! # Example
//!
//! ```ignore
//! use mcusweep_controller::{ble, JsonFileStore, Session, SweepConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let link = ble::BleLink::new(ble::BleConfig::default()).await?;
//!     let store = JsonFileStore::open("/tmp/mcusweep")?;
//!
//!     let report = Session::new(SweepConfig::default(), link, store).run().await?;
//!     println!("{:?}", report.outcome);
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod config;
mod discovery;
mod error;
mod handshake;
pub mod link;
mod search;
mod session;
pub mod store;

pub use config::SweepConfig;
pub use discovery::DiscoveryFilter;
pub use error::{hex, SweepError};
pub use handshake::{Baseline, HandshakeSequencer, HandshakeState};
pub use link::{Advertisement, Connection, DeviceIdentity, LinkError, PeripheralLink};
pub use search::{SearchController, SearchOutcome, SearchState};
pub use session::{RunReport, Session};
pub use store::{JsonFileStore, ProgressStore, StoreError};
