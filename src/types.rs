use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::MAX_FAN_SPEED;

/// Device attribute addressed by a frame
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Power = 0x01,
    Mode = 0x02,
    #[serde(rename = "temperature")]
    SetTemperature = 0x03,
    #[serde(rename = "fan")]
    FanSpeed = 0x04,
    #[serde(rename = "undervolt")]
    UndervoltProtect = 0x05,
    #[serde(rename = "overvolt")]
    OvervoltProtect = 0x06,
    #[serde(rename = "intake")]
    IntakeAirTemp = 0x07,
    #[serde(rename = "outlet")]
    OutletAirTemp = 0x08,
    Lcd = 0x0A,
    Swing = 0x10,
    Voltage = 0x12,
    Amperage = 0x13,
    Light = 0x1C,
    Active = 0x42,
}

/// How the value of a key is checked on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRule {
    /// Query, on or off
    OnOff,
    /// One of the eight mode values
    Mode,
    /// Anything up to the given maximum
    AtMost(u16),
    /// No restriction
    Any,
}

impl ValueRule {
    pub fn accepts(self, value: u16) -> bool {
        match self {
            ValueRule::OnOff => value <= 2,
            ValueRule::Mode => ModeValue::from_raw(value).is_some(),
            ValueRule::AtMost(max) => value <= max,
            ValueRule::Any => true,
        }
    }
}

/// How the raw value of a key is turned into a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpretation {
    OnOff,
    Mode,
    /// Tenths of a unit
    Deci,
    Raw,
}

impl Key {
    pub const ALL: [Key; 14] = [
        Key::Power,
        Key::Mode,
        Key::SetTemperature,
        Key::FanSpeed,
        Key::UndervoltProtect,
        Key::OvervoltProtect,
        Key::IntakeAirTemp,
        Key::OutletAirTemp,
        Key::Lcd,
        Key::Swing,
        Key::Voltage,
        Key::Amperage,
        Key::Light,
        Key::Active,
    ];

    /// Look up a key by its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| *k as u8 == byte)
    }

    /// Look up a key by display name or short id
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == name || k.id() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Key::Power => "Power",
            Key::Mode => "Mode",
            Key::SetTemperature => "Set Temperature",
            Key::FanSpeed => "Fan Speed",
            Key::UndervoltProtect => "Undervolt Protection",
            Key::OvervoltProtect => "Overvolt Protection",
            Key::IntakeAirTemp => "Intake Air Temperature",
            Key::OutletAirTemp => "Outlet Air Temperature",
            Key::Lcd => "LCD",
            Key::Swing => "Swing",
            Key::Voltage => "Voltage",
            Key::Amperage => "Amperage",
            Key::Light => "Light",
            Key::Active => "Active",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Key::Power => "power",
            Key::Mode => "mode",
            Key::SetTemperature => "temperature",
            Key::FanSpeed => "fan",
            Key::UndervoltProtect => "undervolt",
            Key::OvervoltProtect => "overvolt",
            Key::IntakeAirTemp => "intake",
            Key::OutletAirTemp => "outlet",
            Key::Lcd => "lcd",
            Key::Swing => "swing",
            Key::Voltage => "voltage",
            Key::Amperage => "amperage",
            Key::Light => "light",
            Key::Active => "active",
        }
    }

    /// Allowed values for this key. Shared by encoder and decoder.
    pub fn value_rule(self) -> ValueRule {
        match self {
            Key::Power | Key::Lcd | Key::Swing | Key::Light => ValueRule::OnOff,
            Key::Mode => ValueRule::Mode,
            Key::FanSpeed => ValueRule::AtMost(MAX_FAN_SPEED),
            Key::SetTemperature
            | Key::UndervoltProtect
            | Key::OvervoltProtect
            | Key::IntakeAirTemp
            | Key::OutletAirTemp
            | Key::Voltage
            | Key::Amperage
            | Key::Active => ValueRule::Any,
        }
    }

    pub fn interpretation(self) -> Interpretation {
        match self {
            Key::Power | Key::Lcd | Key::Swing | Key::Light => Interpretation::OnOff,
            Key::Mode => Interpretation::Mode,
            Key::UndervoltProtect | Key::Voltage | Key::Amperage => Interpretation::Deci,
            Key::SetTemperature
            | Key::FanSpeed
            | Key::OvervoltProtect
            | Key::IntakeAirTemp
            | Key::OutletAirTemp
            | Key::Active => Interpretation::Raw,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tri-state value of the switch-like keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnOffValue {
    Query,
    On,
    Off,
}

/// Numeric encoding of on/off, which differs between board revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnOffEncoding {
    /// On = 1, Off = 2
    OnIsOne,
    /// On = 2, Off = 1
    #[default]
    OnIsTwo,
}

impl OnOffEncoding {
    pub fn decode(self, raw: u16) -> Option<OnOffValue> {
        match (self, raw) {
            (_, 0) => Some(OnOffValue::Query),
            (OnOffEncoding::OnIsOne, 1) | (OnOffEncoding::OnIsTwo, 2) => Some(OnOffValue::On),
            (OnOffEncoding::OnIsOne, 2) | (OnOffEncoding::OnIsTwo, 1) => Some(OnOffValue::Off),
            _ => None,
        }
    }

    pub fn encode(self, value: OnOffValue) -> u16 {
        match (self, value) {
            (_, OnOffValue::Query) => 0,
            (OnOffEncoding::OnIsOne, OnOffValue::On) => 1,
            (OnOffEncoding::OnIsOne, OnOffValue::Off) => 2,
            (OnOffEncoding::OnIsTwo, OnOffValue::On) => 2,
            (OnOffEncoding::OnIsTwo, OnOffValue::Off) => 1,
        }
    }
}

/// Operating mode reported by the board
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeValue {
    Query = 0,
    Cool = 1,
    Heat = 2,
    Fan = 3,
    Eco = 4,
    Sleep = 5,
    Turbo = 6,
    Wet = 7,
}

impl ModeValue {
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(ModeValue::Query),
            1 => Some(ModeValue::Cool),
            2 => Some(ModeValue::Heat),
            3 => Some(ModeValue::Fan),
            4 => Some(ModeValue::Eco),
            5 => Some(ModeValue::Sleep),
            6 => Some(ModeValue::Turbo),
            7 => Some(ModeValue::Wet),
            _ => None,
        }
    }
}

/// Last observed value of a key, in display units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Switch(OnOffValue),
    Mode(ModeValue),
    Scaled(f64),
    Raw(u16),
}

impl Reading {
    /// Interpret a raw wire value for `key`
    pub fn interpret(key: Key, raw: u16, encoding: OnOffEncoding) -> Self {
        match key.interpretation() {
            Interpretation::OnOff => encoding
                .decode(raw)
                .map(Reading::Switch)
                .unwrap_or(Reading::Raw(raw)),
            Interpretation::Mode => ModeValue::from_raw(raw)
                .map(Reading::Mode)
                .unwrap_or(Reading::Raw(raw)),
            Interpretation::Deci => Reading::Scaled(raw as f64 / 10.0),
            Interpretation::Raw => Reading::Raw(raw),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Switch(v) => write!(f, "{:?}", v),
            Reading::Mode(m) => write!(f, "{:?}", m),
            Reading::Scaled(v) => write!(f, "{:.1}", v),
            Reading::Raw(v) => write!(f, "{}", v),
        }
    }
}

/// Traffic counters for the board link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    pub frames_tx: u64,
    pub frames_rx: u64,
    pub frames_failed: u64,
    pub spurious_bytes_rx: u64,
}

/// Phase of the infrared temperature sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuationPhaseKind {
    Idle,
    AwaitingBaseline,
    ConfirmingBlast,
}

/// Result of a finished infrared temperature sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActuationOutcome {
    Confirmed { target: u16, attempts: u8 },
    Exhausted { target: u16, restored_fan_speed: u16 },
    /// A fan speed request went unanswered mid-sequence
    Abandoned {
        target: u16,
        restored_fan_speed: Option<u16>,
    },
}

/// Point-in-time copy of everything known about the board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub captured_at: DateTime<Utc>,
    pub last_full_status: Option<DateTime<Utc>>,
    pub readings: BTreeMap<Key, Reading>,
    pub set_temperature_f: Option<u16>,
    pub actuation: ActuationPhaseKind,
    pub last_actuation: Option<ActuationOutcome>,
    pub stats: LinkStats,
}

impl StatusSnapshot {
    pub fn reading(&self, key: Key) -> Option<Reading> {
        self.readings.get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_lookup_by_byte_and_name() {
        assert_eq!(Key::from_byte(0x1C), Some(Key::Light));
        assert_eq!(Key::from_byte(0x00), None);
        assert_eq!(Key::from_name("Set Temperature"), Some(Key::SetTemperature));
        assert_eq!(Key::from_name("fan"), Some(Key::FanSpeed));
        assert_eq!(Key::from_name("Fan"), None);
    }

    #[test]
    fn on_off_encoding_is_configurable() {
        assert_eq!(OnOffEncoding::OnIsTwo.decode(2), Some(OnOffValue::On));
        assert_eq!(OnOffEncoding::OnIsOne.decode(2), Some(OnOffValue::Off));
        assert_eq!(OnOffEncoding::OnIsOne.decode(0), Some(OnOffValue::Query));
        assert_eq!(OnOffEncoding::OnIsTwo.decode(3), None);
        assert_eq!(OnOffEncoding::OnIsOne.encode(OnOffValue::On), 1);
        assert_eq!(OnOffEncoding::OnIsTwo.encode(OnOffValue::Off), 1);
    }

    #[test]
    fn value_rules() {
        assert!(Key::FanSpeed.value_rule().accepts(5));
        assert!(!Key::FanSpeed.value_rule().accepts(6));
        assert!(Key::Mode.value_rule().accepts(7));
        assert!(!Key::Mode.value_rule().accepts(8));
        assert!(!Key::Swing.value_rule().accepts(3));
        assert!(Key::Voltage.value_rule().accepts(u16::MAX));
    }

    #[test]
    fn readings_use_display_units() {
        let enc = OnOffEncoding::default();
        assert_eq!(Reading::interpret(Key::Voltage, 2301, enc), Reading::Scaled(230.1));
        assert_eq!(Reading::interpret(Key::Mode, 2, enc), Reading::Mode(ModeValue::Heat));
        assert_eq!(Reading::interpret(Key::Lcd, 1, enc), Reading::Switch(OnOffValue::Off));
        assert_eq!(Reading::interpret(Key::IntakeAirTemp, 24, enc), Reading::Raw(24));
        assert_eq!(Reading::Scaled(230.1).to_string(), "230.1");
    }
}
