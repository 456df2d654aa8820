//! Frame codec for the control board wire format.
//!
//! ```text
//! [5A 5A] [len] [01] [key] [value: 1-2 bytes, BE] [checksum] [0D 0A]
//! ```
//!
//! `len` counts the device type, key, value, checksum and postamble bytes.
//! The checksum is the 8-bit wrapping sum of every byte before it.
//!
//! [`Framer`] decodes one byte at a time so that a noisy line can be
//! resynchronised by discarding bytes until the next preamble.

use std::fmt;
use thiserror::Error;

use crate::constants::*;
use crate::types::Key;

/// Reasons a byte or a completed frame is rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame buffer full")]
    Overflow,

    #[error("complete frame already buffered")]
    AlreadyComplete,

    #[error("expected preamble byte, got {0:#04x}")]
    BadPreamble(u8),

    #[error("impossible frame length {0}")]
    BadLength(u8),

    #[error("unknown key {0:#04x}")]
    InvalidKey(u8),

    #[error("value {value} out of range for {key}")]
    InvalidValue { key: Key, value: u16 },

    #[error("checksum mismatch: expected {expected:#04x}, got {received:#04x}")]
    ChecksumMismatch { expected: u8, received: u8 },

    #[error("bad postamble")]
    BadPostamble,
}

/// Outcome of a byte accepted by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Incomplete,
    Complete,
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

fn frame_len(length_byte: u8) -> usize {
    length_byte as usize + PREAMBLE.len() + 1
}

fn valid_length(length_byte: u8) -> bool {
    let base = LENGTH_OVERHEAD + POSTAMBLE.len() as u8;
    length_byte == base + 1 || length_byte == base + 2
}

/// Validate a buffer holding exactly one complete frame.
fn validate(bytes: &[u8]) -> Result<(), FrameError> {
    if bytes[..PREAMBLE.len()] != PREAMBLE {
        return Err(FrameError::BadPreamble(bytes[0]));
    }
    let key = Key::from_byte(bytes[KEY_POS]).ok_or(FrameError::InvalidKey(bytes[KEY_POS]))?;
    let value = read_value(bytes);
    if !key.value_rule().accepts(value) {
        return Err(FrameError::InvalidValue { key, value });
    }

    let checksum_pos = bytes.len() - POSTAMBLE.len() - 1;
    let expected = checksum(&bytes[..checksum_pos]);
    if expected != bytes[checksum_pos] {
        return Err(FrameError::ChecksumMismatch {
            expected,
            received: bytes[checksum_pos],
        });
    }

    if bytes[checksum_pos + 1..] != POSTAMBLE {
        return Err(FrameError::BadPostamble);
    }
    Ok(())
}

fn value_width(bytes: &[u8]) -> usize {
    bytes.len() - VALUE_POS - 1 - POSTAMBLE.len()
}

fn read_value(bytes: &[u8]) -> u16 {
    match value_width(bytes) {
        1 => bytes[VALUE_POS] as u16,
        2 => u16::from_be_bytes([bytes[VALUE_POS], bytes[VALUE_POS + 1]]),
        _ => 0,
    }
}

/// A complete frame, either built for transmission or taken from the decoder
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    buf: [u8; MAX_FRAME_SIZE],
    len: usize,
}

impl Frame {
    /// Build a frame, checking the value against the key's rule
    pub fn encode(key: Key, value: u16) -> Result<Self, FrameError> {
        if !key.value_rule().accepts(value) {
            return Err(FrameError::InvalidValue { key, value });
        }
        Ok(Self::encode_unchecked(key as u8, value))
    }

    /// Build a frame for any key byte and value.
    ///
    /// Length, checksum and postamble are still correct, so the board sees a
    /// well-formed frame. Used for protocol experiments from the debug console.
    pub fn encode_unchecked(raw_key: u8, value: u16) -> Self {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let width: u8 = if value > u8::MAX as u16 { 2 } else { 1 };

        buf[..PREAMBLE.len()].copy_from_slice(&PREAMBLE);
        buf[LENGTH_POS] = LENGTH_OVERHEAD + width + POSTAMBLE.len() as u8;
        buf[DEVICE_TYPE_POS] = DEVICE_TYPE;
        buf[KEY_POS] = raw_key;

        let mut pos = VALUE_POS;
        if width == 2 {
            buf[pos..pos + 2].copy_from_slice(&value.to_be_bytes());
            pos += 2;
        } else {
            buf[pos] = value as u8;
            pos += 1;
        }

        buf[pos] = checksum(&buf[..pos]);
        pos += 1;
        buf[pos..pos + POSTAMBLE.len()].copy_from_slice(&POSTAMBLE);
        pos += POSTAMBLE.len();

        Frame { buf, len: pos }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn raw_key(&self) -> u8 {
        self.buf[KEY_POS]
    }

    pub fn key(&self) -> Option<Key> {
        Key::from_byte(self.raw_key())
    }

    pub fn value(&self) -> u16 {
        read_value(self.as_bytes())
    }

    pub fn device_type(&self) -> u8 {
        self.buf[DEVICE_TYPE_POS]
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        validate(self.as_bytes())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({:02X?})", self.as_bytes())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "{}={}", key, self.value()),
            None => write!(f, "{:#04x}={}", self.raw_key(), self.value()),
        }
    }
}

/// Incremental frame decoder
#[derive(Debug, Clone)]
pub struct Framer {
    buf: [u8; MAX_FRAME_SIZE],
    pos: usize,
}

impl Framer {
    pub fn new() -> Self {
        Framer {
            buf: [0u8; MAX_FRAME_SIZE],
            pos: 0,
        }
    }

    /// Feed one byte into the decoder.
    ///
    /// A rejected byte is not stored. The caller should dump [`buffered`]
    /// and [`reset`] before feeding more. When the byte completes a frame the
    /// whole frame is validated, and a validation failure is also reported as
    /// an error with the frame still buffered.
    ///
    /// [`buffered`]: Framer::buffered
    /// [`reset`]: Framer::reset
    pub fn push(&mut self, byte: u8) -> Result<Progress, FrameError> {
        if self.pos >= self.buf.len() {
            return Err(FrameError::Overflow);
        }
        if self.has_full_frame() {
            return Err(FrameError::AlreadyComplete);
        }
        if self.pos < PREAMBLE.len() && byte != PREAMBLE[self.pos] {
            return Err(FrameError::BadPreamble(byte));
        }
        if self.pos == LENGTH_POS && !valid_length(byte) {
            return Err(FrameError::BadLength(byte));
        }

        self.buf[self.pos] = byte;
        self.pos += 1;

        if self.has_full_frame() {
            validate(self.buffered())?;
            Ok(Progress::Complete)
        } else {
            Ok(Progress::Incomplete)
        }
    }

    /// True once the declared number of bytes has been read
    pub fn has_full_frame(&self) -> bool {
        self.pos > LENGTH_POS && self.pos == frame_len(self.buf[LENGTH_POS])
    }

    /// The buffered frame, if it is complete and valid
    pub fn frame(&self) -> Option<Frame> {
        if !self.has_full_frame() || validate(self.buffered()).is_err() {
            return None;
        }
        Some(Frame {
            buf: self.buf,
            len: self.pos,
        })
    }

    pub fn buffered(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    pub fn reset(&mut self) {
        self.buf = [0u8; MAX_FRAME_SIZE];
        self.pos = 0;
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}
