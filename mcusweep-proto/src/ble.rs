//! BLE GATT constants for the Tuya MCU serial bridge
//!
//! The module exposes the MCU UART as a pair of characteristics: frames are
//! written to one and responses are read back from the other.

use uuid::Uuid;

/// Write characteristic: 00000001-0000-1001-8001-00805f9b07d0
pub const WRITE_CHAR_UUID: Uuid = Uuid::from_u128(0x00000001_0000_1001_8001_00805f9b07d0);

/// Read/notify characteristic: 00000003-0000-1001-8001-00805f9b07d0
pub const READ_CHAR_UUID: Uuid = Uuid::from_u128(0x00000003_0000_1001_8001_00805f9b07d0);

/// Largest frame the link layer accepts in a single write
pub const DEFAULT_MTU: usize = 247;
