//! Status Dump Example
//!
//! Polls a control board for a few seconds and prints the cached state,
//! link statistics and any protocol anomalies.
//!
//! Usage:
//!   cargo run --example status_dump -- /dev/ttyUSB0 [seconds]

use acboard_protocol::{AcBoard, AcError, Config, IrCommand, IrTransmitter, Result};
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};

/// This example never changes the set temperature
struct NoIr;

impl IrTransmitter for NoIr {
    fn transmit(&mut self, _command: &IrCommand) -> Result<()> {
        Err(AcError::Infrared("no transmitter attached".to_string()))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let port = args
        .next()
        .ok_or_else(|| AcError::Parse("usage: status_dump <port> [seconds]".to_string()))?;
    let seconds: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(5);

    let config = Config {
        port: Some(port),
        ..Config::default()
    };
    let mut board = AcBoard::open(config, NoIr)?;

    info!("Polling for {} seconds...", seconds);
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(seconds) {
        board.tick(Instant::now())?;
        thread::sleep(Duration::from_millis(10));
    }

    for anomaly in board.session().anomalies() {
        warn!("{}: {:?}", anomaly.at.format("%H:%M:%S%.3f"), anomaly.kind);
    }

    let snapshot = board.snapshot();
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).map_err(|e| AcError::Parse(e.to_string()))?
    );
    Ok(())
}
