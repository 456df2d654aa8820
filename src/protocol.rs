use log::info;
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::collections::BTreeMap;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use crate::actuation::IrTransmitter;
use crate::command::Command;
use crate::config::Config;
use crate::constants::*;
use crate::error::{AcError, Result};
use crate::session::{Ingest, Session};
use crate::types::{Key, Reading, StatusSnapshot};

/// Byte link to the control board
pub trait Link {
    /// Read bytes that are already waiting, without blocking.
    /// Returns 0 when nothing is available.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write one complete frame
    fn write_frame(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Serial port link (8N1)
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()?;
        Ok(SerialLink { port })
    }
}

impl Link for SerialLink {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let waiting = self.port.bytes_to_read()? as usize;
        if waiting == 0 {
            return Ok(0);
        }
        let len = waiting.min(buf.len());
        match self.port.read(&mut buf[..len]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        Ok(())
    }
}

/// Process-level requests from the console that the caller must carry out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Restart,
    ResetConfig,
}

/// Main control board interface
pub struct AcBoard<L: Link, I: IrTransmitter> {
    link: L,
    ir: I,
    session: Session,
}

impl<I: IrTransmitter> AcBoard<SerialLink, I> {
    /// Open the serial port named in the config
    pub fn open(config: Config, ir: I) -> Result<Self> {
        let port_name = config.port.clone().ok_or(AcError::NoPort)?;
        info!(
            "Starting AC serial communication on {} at {} baud",
            port_name, config.baud_rate
        );
        let link = SerialLink::open(&port_name, config.baud_rate)?;
        Ok(AcBoard::new(link, ir, config))
    }

    /// List available serial ports
    pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>> {
        Ok(serialport::available_ports()?)
    }
}

impl<L: Link, I: IrTransmitter> AcBoard<L, I> {
    pub fn new(link: L, ir: I, config: Config) -> Self {
        AcBoard {
            link,
            ir,
            session: Session::new(config),
        }
    }

    /// Run one cooperative step.
    ///
    /// Drains the bytes waiting on the link, handling each one fully before
    /// the next and sending the follow-up frame after every reply, then sends
    /// whatever is due. Never blocks waiting for the board.
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        loop {
            let n = self.link.read_available(&mut buf)?;
            if n == 0 {
                break;
            }
            for &byte in &buf[..n] {
                if let Ingest::Received(_) = self.session.ingest(byte, now, &mut self.ir) {
                    self.transmit_next(now)?;
                }
            }
        }
        self.transmit_next(now)
    }

    fn transmit_next(&mut self, now: Instant) -> Result<()> {
        if let Some(frame) = self.session.next_transmission(now) {
            self.link.write_frame(frame.as_bytes())?;
        }
        Ok(())
    }

    /// Run a console command.
    ///
    /// Restart and config reset are returned to the caller, which owns the
    /// process and the network setup.
    pub fn execute(&mut self, command: Command) -> Result<Option<Lifecycle>> {
        match command {
            Command::Set { key, value } => {
                self.session.try_set(&key, value)?;
                Ok(None)
            }
            Command::DebugSet { key, value } => {
                self.session.enqueue_raw(key, value);
                Ok(None)
            }
            Command::Restart => Ok(Some(Lifecycle::Restart)),
            Command::ResetConfig => Ok(Some(Lifecycle::ResetConfig)),
            Command::Invalid { usage } => {
                Err(AcError::Parse(format!("Invalid command. Syntax: {}", usage)))
            }
            Command::Unknown(text) => Err(AcError::Parse(format!(
                "Unknown command \"{}\". {}",
                text,
                Command::help(&SET_KEYS)
            ))),
        }
    }

    pub fn enqueue_command(&mut self, key: Key, value: u16) -> Result<()> {
        self.session.enqueue_command(key, value)
    }

    pub fn try_set_temperature(&mut self, value: u16) -> Result<()> {
        self.session.try_set_temperature(value)
    }

    pub fn cached_state(&self) -> &BTreeMap<Key, Reading> {
        self.session.cached_state()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.session.snapshot()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn ir(&self) -> &I {
        &self.ir
    }
}
