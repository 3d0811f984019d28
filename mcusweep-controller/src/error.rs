use mcusweep_proto::FrameError;

use crate::link::{DeviceIdentity, LinkError};
use crate::store::StoreError;

/// Errors that end a sweep run
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("malformed frame ({bytes}): {source}")]
    MalformedFrame {
        bytes: String,
        #[source]
        source: FrameError,
    },
    #[error("search range {start}..={upper_bound} is outside 1..=16777215")]
    InvalidRange { start: u32, upper_bound: u32 },
    #[error("encoded frame is {len} bytes, over the {mtu} byte MTU")]
    FrameTooLarge { len: usize, mtu: usize },
    #[error("failed to encode frame: {0}")]
    Encode(FrameError),
    #[error("write of frame {frame} failed: {source}")]
    TransportWrite {
        frame: String,
        #[source]
        source: LinkError,
    },
    #[error("read after frame {frame} failed: {source}")]
    TransportRead {
        frame: String,
        #[source]
        source: LinkError,
    },
    #[error("failed to connect to {identity}: {source}")]
    Connect {
        identity: DeviceIdentity,
        #[source]
        source: LinkError,
    },
    #[error("scan failed: {0}")]
    Scan(#[source] LinkError),
    #[error("scan ended before the target device was seen")]
    ScanEnded,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Lowercase hex dump used in error messages and logs
pub fn hex(bytes: &[u8]) -> String {
    data_encoding::HEXLOWER.encode(bytes)
}
