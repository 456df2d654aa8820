//! Session configuration.
//!
//! Every field has a default from [`crate::constants`], so a TOML file only
//! needs the settings that differ:
//!
//! ```
//! use acboard_protocol::{Config, OnOffEncoding};
//!
//! let config = Config::from_toml_str(r#"
//!     port = "/dev/ttyUSB0"
//!     on_off_encoding = "on_is_one"
//!     max_ir_retries = 3
//! "#).unwrap();
//!
//! assert_eq!(config.on_off_encoding, OnOffEncoding::OnIsOne);
//! assert_eq!(config.baud_rate, 115_200);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::*;
use crate::error::Result;
use crate::types::{Key, OnOffEncoding};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device of the control board
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Minimum time between two full status cycles
    pub poll_interval_ms: u64,
    /// Time after which an unanswered request is superseded
    pub stall_timeout_ms: u64,
    pub max_ir_retries: u8,
    /// On/off numbering used by the board's firmware revision
    pub on_off_encoding: OnOffEncoding,
    /// Keys queried on every status cycle, in order
    pub poll_keys: Vec<Key>,
    pub anomaly_log_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            baud_rate: BAUD_RATE,
            poll_interval_ms: POLL_INTERVAL_MS,
            stall_timeout_ms: STALL_TIMEOUT_MS,
            max_ir_retries: MAX_IR_RETRIES,
            on_off_encoding: OnOffEncoding::default(),
            poll_keys: POLL_KEYS.to_vec(),
            anomaly_log_capacity: ANOMALY_LOG_CAPACITY,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn poll_keys_by_id() {
        let config = Config::from_toml_str(r#"poll_keys = ["power", "fan", "voltage"]"#).unwrap();
        assert_eq!(config.poll_keys, vec![Key::Power, Key::FanSpeed, Key::Voltage]);
    }

    #[test]
    fn rejects_unknown_key_id() {
        assert!(Config::from_toml_str(r#"poll_keys = ["humidity"]"#).is_err());
    }
}
