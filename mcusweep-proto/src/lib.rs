//! mcusweep wire protocol - Tuya MCU serial frames and command ids

pub mod ble;
mod command;
mod frame;

pub use command::CommandId;
pub use frame::{
    checksum, decode, encode, value_payload, Frame, FrameError, HEADER, MAX_PAYLOAD_LEN,
    MIN_FRAME_LEN,
};

/// Largest value the 3-byte send-command payload can carry
pub const MAX_SEARCH_VALUE: u32 = 0x00FF_FFFF;
