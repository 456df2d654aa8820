//! Protocol constants for control board communication.
//!
//! This module defines the fixed parts of the wire format, the default
//! polling policy, and the limits used by the infrared actuation sequence.

use crate::types::Key;

/// Marker at the start of every frame
pub const PREAMBLE: [u8; 2] = [0x5A, 0x5A];

/// Marker at the end of every frame
pub const POSTAMBLE: [u8; 2] = [0x0D, 0x0A];

/// Expected device type byte
pub const DEVICE_TYPE: u8 = 0x01;

/// Largest frame the codec handles (two-byte values)
pub const MAX_FRAME_SIZE: usize = 10;

/// Device type, key and checksum bytes counted by the length field
pub const LENGTH_OVERHEAD: u8 = 3;

/// Byte offsets inside a frame
pub const LENGTH_POS: usize = 2;
pub const DEVICE_TYPE_POS: usize = 3;
pub const KEY_POS: usize = 4;
pub const VALUE_POS: usize = 5;

/// Value written to ask the board for the current state of a key
pub const QUERY_VALUE: u16 = 0;

/// Handshake value sent by the board on `Active` to ask if we are ready
pub const ACTIVE_READY_QUERY: u16 = 2;

/// Handshake reply meaning "yes"
pub const ACTIVE_READY_REPLY: u16 = 1;

/// Highest fan speed the board accepts
pub const MAX_FAN_SPEED: u16 = 5;

/// Baud rate of the control board link (8N1)
pub const BAUD_RATE: u32 = 115_200;

/// Serial read timeout; reads are only issued when bytes are waiting
pub const READ_TIMEOUT_MS: u64 = 10;

/// Size of the buffer drained from the link on each read
pub const READ_CHUNK_SIZE: usize = 64;

/// Minimum time between two full status poll cycles
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Time after which an unanswered request is superseded
pub const STALL_TIMEOUT_MS: u64 = 1000;

/// Infrared retransmissions before giving up on a temperature change
pub const MAX_IR_RETRIES: u8 = 5;

/// Number of anomaly records kept in memory
pub const ANOMALY_LOG_CAPACITY: usize = 64;

/// Accepted set temperatures in the Celsius band
pub const CELSIUS_RANGE: std::ops::RangeInclusive<u16> = 16..=30;

/// Accepted set temperatures in the Fahrenheit band
pub const FAHRENHEIT_RANGE: std::ops::RangeInclusive<u16> = 63..=86;

/// Keys queried, in order, on every status cycle
pub const POLL_KEYS: [Key; 9] = [
    Key::Power,
    Key::Mode,
    Key::SetTemperature,
    Key::FanSpeed,
    Key::UndervoltProtect,
    Key::IntakeAirTemp,
    Key::OutletAirTemp,
    Key::Lcd,
    Key::Voltage,
];

/// Keys that may be written through the named set command
pub const SET_KEYS: [Key; 8] = [
    Key::Power,
    Key::Mode,
    Key::SetTemperature,
    Key::FanSpeed,
    Key::UndervoltProtect,
    Key::Lcd,
    Key::Light,
    Key::Active,
];
