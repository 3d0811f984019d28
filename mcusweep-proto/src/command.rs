//! Tuya MCU command registry
//!
//! Only heartbeat, MCU info, working mode and send command are ever sent by
//! mcusweep. The rest are listed so received frames can be labelled in logs.

use std::fmt;

/// Command byte of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub u8);

impl CommandId {
    pub const HEARTBEAT: Self = Self(0x00);
    pub const MCU_INFO: Self = Self(0x01);
    pub const WORKING_MODE: Self = Self(0x02);
    pub const NETWORK_STATUS: Self = Self(0x03);
    pub const RESET_MODULE: Self = Self(0x04);
    pub const RESET_MODULE_NEW: Self = Self(0x05);
    pub const SEND_COMMAND: Self = Self(0x06);
    pub const REPORT_STATUS: Self = Self(0x07);
    pub const QUERY_STATUS: Self = Self(0x08);
    pub const UNBIND: Self = Self(0x09);
    pub const CONNECTION_STATUS: Self = Self(0x0A);
    pub const RADIO_FREQUENCY: Self = Self(0x0E);

    /// Registry name, if the byte is a known command
    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0x00 => "heartbeat",
            0x01 => "mcu-info",
            0x02 => "working-mode",
            0x03 => "network-status",
            0x04 => "reset-module",
            0x05 => "reset-module-new",
            0x06 => "send-command",
            0x07 => "report-status",
            0x08 => "query-status",
            0x09 => "unbind",
            0x0A => "connection-status",
            0x0E => "radio-frequency",
            0xA0 => "module-version",
            0xA1 => "factory-reset-notice",
            0xA2 => "offline-password",
            0xA3 => "advertising-enable",
            0xA4 => "flag-status-report",
            0xA5 => "request-online",
            0xA6 => "smart-lock",
            0xA7 => "dynamic-password-new",
            0xA8 => "ibeacon-config",
            0xB0 => "mcu-wakeup-time",
            0xB1 => "connection-interval",
            0xB5 => "bulk-storage",
            0xB6 => "weather-data",
            0xBA => "hid",
            0xBB => "advertising-name",
            0xBC => "pairing-mode",
            0xBD => "tx-power",
            0xBE => "module-mac",
            0xE0 => "record-report",
            0xE1 => "current-time",
            0xE2 => "low-power-adv-interval",
            0xE3 => "wakeup-pin",
            0xE4 => "system-timer",
            0xE5 => "low-power",
            0xE6 => "dynamic-password",
            0xE7 => "ble-disconnect",
            0xE8 => "mcu-version",
            0xE9 => "mcu-version-report",
            0xEA => "update-request",
            0xEB => "update-info",
            0xEC => "update-offset",
            0xED => "update-data",
            0xEE => "update-result",
            _ => return None,
        };
        Some(name)
    }
}

impl From<u8> for CommandId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({:#04x})", self.0),
            None => write!(f, "unknown ({:#04x})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CommandId;

    #[test]
    fn display() {
        assert_eq!(CommandId::HEARTBEAT.to_string(), "heartbeat (0x00)");
        assert_eq!(CommandId::SEND_COMMAND.to_string(), "send-command (0x06)");
        assert_eq!(CommandId(0x42).to_string(), "unknown (0x42)");
    }
}
