//! Interactive Console Example
//!
//! This example drives a control board over a serial port and accepts debug
//! console commands on stdin:
//! - Port from the command line, the config file, or an interactive pick
//! - Cooperative polling loop with a stand-in infrared transmitter
//! - `set <key>=<value>`, `debugSet <key>=<value>`, `restart`, `resetConfig`
//! - `status` prints the cached state as JSON
//!
//! Usage:
//!   cargo run --example console                  # Interactive mode
//!   cargo run --example console -- /dev/ttyUSB0  # Specify port
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example console

use acboard_protocol::{
    parse_command, AcBoard, AcError, Config, IrCommand, IrTransmitter, Lifecycle, Result,
    SerialLink,
};
use inquire::Select;
use log::{error, info};
use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Logs infrared commands instead of sending them
struct LoggingIr;

impl IrTransmitter for LoggingIr {
    fn transmit(&mut self, command: &IrCommand) -> Result<()> {
        info!("IR blast: {:?}", command);
        Ok(())
    }
}

fn main() -> Result<()> {
    // Initialize logger with default info level if RUST_LOG is not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = match std::env::var("ACBOARD_CONFIG") {
        Ok(path) => Config::load(path)?,
        Err(_) => Config::default(),
    };

    // Command line beats config file; otherwise ask which port to use.
    if let Some(port) = std::env::args().nth(1) {
        config.port = Some(port);
    }
    if config.port.is_none() {
        let ports: Vec<String> = AcBoard::<SerialLink, LoggingIr>::list_ports()?
            .into_iter()
            .map(|p| p.port_name)
            .collect();
        if ports.is_empty() {
            return Err(AcError::NoPort);
        }
        let port = Select::new("Control board port:", ports)
            .prompt()
            .map_err(|e| AcError::Parse(e.to_string()))?;
        config.port = Some(port);
    }

    let mut board = AcBoard::open(config, LoggingIr)?;

    // Read console lines on a separate thread so the board loop never blocks.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines().map_while(std::io::Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        while let Ok(line) = rx.try_recv() {
            if line.trim() == "status" {
                match serde_json::to_string_pretty(&board.snapshot()) {
                    Ok(json) => println!("{}", json),
                    Err(e) => error!("Could not serialize snapshot: {}", e),
                }
                continue;
            }
            match board.execute(parse_command(&line)) {
                Ok(Some(Lifecycle::Restart)) => {
                    info!("Restarting session");
                    board.session_mut().reset();
                }
                Ok(Some(Lifecycle::ResetConfig)) => {
                    info!("Nothing to reset in the console, exiting");
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => error!("{}", e),
            }
        }

        board.tick(Instant::now())?;
        thread::sleep(Duration::from_millis(10));
    }
}
