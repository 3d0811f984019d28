//! Run parameters and their compiled-in defaults

use std::time::Duration;

use mcusweep_proto::MAX_SEARCH_VALUE;
use mcusweep_proto::ble::DEFAULT_MTU;

use crate::error::SweepError;

/// Advertised name of the peripheral to engage
pub const DEFAULT_TARGET_NAME: &str = "GWL";

/// First value of a fresh sweep
pub const DEFAULT_START_VALUE: u32 = 1;

/// Pause between sweep attempts
pub const DEFAULT_ATTEMPT_DELAY: Duration = Duration::from_millis(100);

/// Attempts between progress log lines
pub const DEFAULT_PROGRESS_EVERY: u32 = 100;

#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Only a device advertising exactly this name is engaged
    pub target_name: String,
    /// Ceiling on the encoded size of any frame written
    pub mtu_limit: usize,
    /// First value tried when no progress has been persisted
    pub start_value: u32,
    /// Last value tried, inclusive
    pub search_upper_bound: u32,
    pub attempt_delay: Duration,
    pub progress_every: u32,
    /// Fail the handshake when a response does not parse as a frame
    pub strict_handshake: bool,
}

impl SweepConfig {
    /// Both ends of the search range must be valid 24-bit send-command values
    pub fn validate(&self) -> Result<(), SweepError> {
        let valid = 1..=MAX_SEARCH_VALUE;
        if valid.contains(&self.start_value) && valid.contains(&self.search_upper_bound) {
            Ok(())
        } else {
            Err(SweepError::InvalidRange {
                start: self.start_value,
                upper_bound: self.search_upper_bound,
            })
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            target_name: DEFAULT_TARGET_NAME.to_string(),
            mtu_limit: DEFAULT_MTU,
            start_value: DEFAULT_START_VALUE,
            search_upper_bound: MAX_SEARCH_VALUE,
            attempt_delay: DEFAULT_ATTEMPT_DELAY,
            progress_every: DEFAULT_PROGRESS_EVERY,
            strict_handshake: false,
        }
    }
}
