//! # AC Board Protocol Library
//!
//! A Rust library for driving air-conditioner control boards that speak a
//! small key/value serial protocol, with an infrared fallback for the set
//! temperature, which the board only accepts from its remote.
//!
//! ## Features
//!
//! - Byte-at-a-time frame decoding with resynchronisation on noise
//! - Sequential status polling with priority for explicit commands
//! - Cached device state snapshots for status pages and telemetry
//! - Infrared set-temperature changes confirmed through a fan speed round trip
//! - Debug console command parsing
//!
//! ## Example
//!
//! ```no_run
//! use acboard_protocol::{AcBoard, Config, IrCommand, IrTransmitter};
//! use std::time::Instant;
//!
//! struct NoIr;
//!
//! impl IrTransmitter for NoIr {
//!     fn transmit(&mut self, _: &IrCommand) -> acboard_protocol::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         port: Some("/dev/ttyUSB0".into()),
//!         ..Config::default()
//!     };
//!     let mut board = AcBoard::open(config, NoIr)?;
//!     loop {
//!         board.tick(Instant::now())?;
//!         std::thread::sleep(std::time::Duration::from_millis(10));
//!     }
//! }
//! ```

pub mod actuation;
pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod framer;
pub mod protocol;
pub mod session;
pub mod types;

pub use actuation::{IrCommand, IrFan, IrMode, IrTransmitter};
pub use command::{parse_command, Command};
pub use config::Config;
pub use error::{AcError, Result};
pub use framer::{Frame, FrameError, Framer, Progress};
pub use protocol::{AcBoard, Lifecycle, Link, SerialLink};
pub use session::{Anomaly, AnomalyKind, Session};
pub use types::*;
