//! Poll/command sequencing for the control board link.
//!
//! The board answers one request at a time. [`Session`] keeps a single
//! outstanding request slot, a FIFO of explicit commands that take priority
//! over polling, and a fixed cyclic list of keys that are queried whenever
//! nothing else is pending. Every valid frame received updates the cached
//! device state, whether or not it was the reply we were waiting for.
//!
//! The session does no I/O of its own. Bytes are fed in with
//! [`Session::ingest`] and frames to send are taken out with
//! [`Session::next_transmission`]; [`crate::AcBoard`] wires both to a link.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use crate::actuation::{Actuator, IrTransmitter, Reaction};
use crate::config::Config;
use crate::constants::*;
use crate::error::{AcError, Result};
use crate::framer::{Frame, FrameError, Framer, Progress};
use crate::types::*;

/// Where an outstanding request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Poll,
    Command,
}

/// The request currently awaiting a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outstanding {
    pub raw_key: u8,
    pub origin: Origin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnomalyKind {
    /// Bytes discarded while framing
    RejectedBytes { bytes: Vec<u8>, error: FrameError },
    /// A valid frame for another key arrived while awaiting a reply
    UnexpectedResponse { awaiting: u8, key: Key, value: u16 },
    /// A valid frame arrived with no request outstanding
    Unsolicited { key: Key, value: u16 },
    /// A request went unanswered and was replaced by the next one
    StalledRequest { raw_key: u8 },
    UnexpectedDeviceType { device_type: u8, key: Key },
    InfraredFailed { error: String },
    ActuationExhausted { target: u16, restored_fan_speed: u16 },
    ActuationAbandoned { target: u16, restored_fan_speed: Option<u16> },
}

/// A protocol problem that was absorbed locally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub at: DateTime<Utc>,
    pub kind: AnomalyKind,
}

/// Result of feeding one byte to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingest {
    Pending,
    Rejected(FrameError),
    Received(Frame),
}

pub struct Session {
    config: Config,
    framer: Framer,
    actuator: Actuator,
    poll_index: usize,
    last_cycle_complete: Option<Instant>,
    last_full_status: Option<DateTime<Utc>>,
    last_tx: Option<Instant>,
    outstanding: Option<Outstanding>,
    queue: VecDeque<Frame>,
    cache: BTreeMap<Key, Reading>,
    set_temperature_f: Option<u16>,
    last_actuation: Option<ActuationOutcome>,
    stats: LinkStats,
    anomalies: VecDeque<Anomaly>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let mut session = Session {
            actuator: Actuator::new(config.max_ir_retries),
            config,
            framer: Framer::new(),
            poll_index: 0,
            last_cycle_complete: None,
            last_full_status: None,
            last_tx: None,
            outstanding: None,
            queue: VecDeque::new(),
            cache: BTreeMap::new(),
            set_temperature_f: None,
            last_actuation: None,
            stats: LinkStats::default(),
            anomalies: VecDeque::new(),
        };
        session.queue_handshake();
        session
    }

    /// Return to the initial state, keeping the configuration
    pub fn reset(&mut self) {
        *self = Session::new(self.config.clone());
    }

    // Ask the board whether it is ready before polling starts.
    fn queue_handshake(&mut self) {
        if let Ok(frame) = Frame::encode(Key::Active, QUERY_VALUE) {
            self.queue.push_back(frame);
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Queue a validated command behind any already pending
    pub fn enqueue_command(&mut self, key: Key, value: u16) -> Result<()> {
        let frame = Frame::encode(key, value).map_err(|_| AcError::InvalidValue { key, value })?;
        info!(
            "Enqueued: {}={}",
            key,
            Reading::interpret(key, value, self.config.on_off_encoding)
        );
        self.queue.push_back(frame);
        Ok(())
    }

    /// Queue a frame without checking key or value
    pub fn enqueue_raw(&mut self, raw_key: u8, value: u16) {
        info!("Enqueued: {}={}", raw_key, value);
        self.queue.push_back(Frame::encode_unchecked(raw_key, value));
    }

    /// Set a key by display name or id.
    ///
    /// The set temperature goes through the infrared sequence; other keys
    /// get a query followed by the write.
    pub fn try_set(&mut self, name: &str, value: u16) -> Result<()> {
        let key = Key::from_name(name).ok_or_else(|| AcError::UnknownKey(name.to_string()))?;
        if !SET_KEYS.contains(&key) {
            return Err(AcError::NotSettable(key));
        }
        if key == Key::SetTemperature {
            return self.try_set_temperature(value);
        }
        let frame = Frame::encode(key, value).map_err(|_| AcError::InvalidValue { key, value })?;
        self.enqueue_command(key, QUERY_VALUE)?;
        info!("Enqueued: {}={}", key, value);
        self.queue.push_back(frame);
        Ok(())
    }

    /// Start an infrared set-temperature sequence. The result shows up later
    /// in [`Session::last_actuation`] and the cached state.
    pub fn try_set_temperature(&mut self, value: u16) -> Result<()> {
        let (key, query) = self.actuator.begin(value)?;
        self.enqueue_command(key, query)
    }

    /// Feed one received byte.
    pub fn ingest(&mut self, byte: u8, now: Instant, ir: &mut dyn IrTransmitter) -> Ingest {
        match self.framer.push(byte) {
            Ok(Progress::Incomplete) => Ingest::Pending,
            Ok(Progress::Complete) => {
                let frame = self.framer.frame();
                self.framer.reset();
                match frame {
                    Some(frame) => {
                        self.handle_frame(&frame, now, ir);
                        Ingest::Received(frame)
                    }
                    None => Ingest::Pending,
                }
            }
            Err(error) => {
                let bytes = if self.framer.is_empty() {
                    self.stats.spurious_bytes_rx += 1;
                    debug!("Rx: spurious byte {:#04x} ({})", byte, error);
                    vec![byte]
                } else {
                    self.stats.frames_failed += 1;
                    warn!("Rx: failed frame {:02X?}: {}", self.framer.buffered(), error);
                    self.framer.buffered().to_vec()
                };
                self.record(AnomalyKind::RejectedBytes { bytes, error });
                self.framer.reset();
                Ingest::Rejected(error)
            }
        }
    }

    /// Apply a decoded frame: cache, handshake, reply matching, actuation.
    pub fn handle_frame(&mut self, frame: &Frame, now: Instant, ir: &mut dyn IrTransmitter) {
        let Some(key) = frame.key() else {
            return;
        };
        let value = frame.value();
        self.stats.frames_rx += 1;
        debug!("Rx: {}", frame);

        if frame.device_type() != DEVICE_TYPE {
            self.record(AnomalyKind::UnexpectedDeviceType {
                device_type: frame.device_type(),
                key,
            });
        }

        self.apply(key, value);

        if key == Key::Active && value == ACTIVE_READY_QUERY {
            if let Ok(reply) = Frame::encode(Key::Active, ACTIVE_READY_REPLY) {
                debug!("Board asked if we are ready, answering yes");
                self.queue.push_front(reply);
            }
        }

        match self.outstanding {
            Some(outstanding) if outstanding.raw_key == key as u8 => {
                self.outstanding = None;
                match outstanding.origin {
                    Origin::Poll => self.advance_poll(now),
                    Origin::Command => {
                        info!(
                            "Rx: {}={}",
                            key,
                            Reading::interpret(key, value, self.config.on_off_encoding)
                        );
                        if key == Key::FanSpeed {
                            let mode = self.mode();
                            let reaction = self.actuator.on_fan_speed(value, mode);
                            self.carry_out(reaction, ir);
                        }
                    }
                }
            }
            Some(outstanding) => {
                warn!("Unexpected response to {:#04x}: {}", outstanding.raw_key, frame);
                self.record(AnomalyKind::UnexpectedResponse {
                    awaiting: outstanding.raw_key,
                    key,
                    value,
                });
            }
            None => {
                warn!("Unexpected frame: {}", frame);
                self.record(AnomalyKind::Unsolicited { key, value });
            }
        }
    }

    /// Next frame to put on the wire, if any.
    ///
    /// Nothing is sent while a request is outstanding, unless it has gone
    /// unanswered for the stall timeout. Queued commands come before polls,
    /// and a new poll cycle only starts once the poll interval has passed
    /// since the previous one completed.
    pub fn next_transmission(&mut self, now: Instant) -> Option<Frame> {
        if self.outstanding.is_some() {
            let stalled = self.last_tx.map_or(true, |t| {
                now.saturating_duration_since(t) >= self.config.stall_timeout()
            });
            if !stalled {
                return None;
            }
        }

        let (frame, origin) = if let Some(frame) = self.queue.pop_front() {
            (frame, Origin::Command)
        } else if self.poll_due(now) {
            let key = *self.config.poll_keys.get(self.poll_index)?;
            (Frame::encode(key, QUERY_VALUE).ok()?, Origin::Poll)
        } else {
            return None;
        };

        if let Some(stale) = self.outstanding.take() {
            warn!("No reply for {:#04x}, moving on", stale.raw_key);
            self.record(AnomalyKind::StalledRequest {
                raw_key: stale.raw_key,
            });
            if stale.origin == Origin::Command
                && stale.raw_key == Key::FanSpeed as u8
                && !self.actuator.is_idle()
            {
                let reaction = self.actuator.abandon();
                self.settle(reaction);
            }
        }

        if origin == Origin::Command {
            info!("Tx: {}", frame);
        } else {
            debug!("Tx: {}", frame);
        }
        self.outstanding = Some(Outstanding {
            raw_key: frame.raw_key(),
            origin,
        });
        self.last_tx = Some(now);
        self.stats.frames_tx += 1;
        Some(frame)
    }

    fn poll_due(&self, now: Instant) -> bool {
        if self.poll_index > 0 {
            return true;
        }
        self.last_cycle_complete.map_or(true, |t| {
            now.saturating_duration_since(t) >= self.config.poll_interval()
        })
    }

    fn advance_poll(&mut self, now: Instant) {
        self.poll_index += 1;
        if self.poll_index >= self.config.poll_keys.len() {
            self.poll_index = 0;
            self.last_cycle_complete = Some(now);
            self.last_full_status = Some(Utc::now());
        }
    }

    fn apply(&mut self, key: Key, value: u16) {
        if key == Key::SetTemperature {
            self.reconcile_fahrenheit(value);
        }
        let reading = Reading::interpret(key, value, self.config.on_off_encoding);
        self.cache.insert(key, reading);
    }

    // The board reports Celsius. Keep the Fahrenheit display value unless it
    // no longer truncates to the reported value.
    fn reconcile_fahrenheit(&mut self, celsius: u16) {
        let expected = self
            .set_temperature_f
            .filter(|f| *f >= 32)
            .map(|f| (f as u32 - 32) * 5 / 9);
        if expected != Some(celsius as u32) {
            let fahrenheit = u16::try_from((celsius as u32 * 9 + 4) / 5 + 32).unwrap_or(u16::MAX);
            debug!(
                "Set temp {}C doesn't match {:?}F, updating to {}F",
                celsius, self.set_temperature_f, fahrenheit
            );
            self.set_temperature_f = Some(fahrenheit);
        }
    }

    fn mode(&self) -> Option<ModeValue> {
        match self.cache.get(&Key::Mode) {
            Some(Reading::Mode(mode)) => Some(*mode),
            _ => None,
        }
    }

    fn carry_out(&mut self, reaction: Reaction, ir: &mut dyn IrTransmitter) {
        if let Some(command) = reaction.blast {
            if let Err(e) = ir.transmit(&command) {
                warn!("Infrared transmit failed: {}", e);
                self.record(AnomalyKind::InfraredFailed {
                    error: e.to_string(),
                });
            }
        }
        self.settle(reaction);
    }

    // Queue follow-up commands and record how a finished run ended.
    fn settle(&mut self, reaction: Reaction) {
        for (key, value) in reaction.enqueue {
            if let Err(e) = self.enqueue_command(key, value) {
                warn!("Could not queue {}={}: {}", key, value, e);
            }
        }
        match reaction.outcome {
            Some(ActuationOutcome::Confirmed { target, .. }) => {
                if target > *CELSIUS_RANGE.end() {
                    self.set_temperature_f = Some(target);
                }
            }
            Some(ActuationOutcome::Exhausted {
                target,
                restored_fan_speed,
            }) => {
                self.record(AnomalyKind::ActuationExhausted {
                    target,
                    restored_fan_speed,
                });
            }
            Some(ActuationOutcome::Abandoned {
                target,
                restored_fan_speed,
            }) => {
                self.record(AnomalyKind::ActuationAbandoned {
                    target,
                    restored_fan_speed,
                });
            }
            None => {}
        }
        if reaction.outcome.is_some() {
            self.last_actuation = reaction.outcome;
        }
    }

    fn record(&mut self, kind: AnomalyKind) {
        if self.config.anomaly_log_capacity == 0 {
            return;
        }
        while self.anomalies.len() >= self.config.anomaly_log_capacity {
            self.anomalies.pop_front();
        }
        self.anomalies.push_back(Anomaly {
            at: Utc::now(),
            kind,
        });
    }

    pub fn cached_state(&self) -> &BTreeMap<Key, Reading> {
        &self.cache
    }

    pub fn reading(&self, key: Key) -> Option<Reading> {
        self.cache.get(&key).copied()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            captured_at: Utc::now(),
            last_full_status: self.last_full_status,
            readings: self.cache.clone(),
            set_temperature_f: self.set_temperature_f,
            actuation: self.actuator.phase(),
            last_actuation: self.last_actuation,
            stats: self.stats,
        }
    }

    pub fn set_temperature_f(&self) -> Option<u16> {
        self.set_temperature_f
    }

    pub fn outstanding(&self) -> Option<Outstanding> {
        self.outstanding
    }

    pub fn poll_index(&self) -> usize {
        self.poll_index
    }

    pub fn last_cycle_complete(&self) -> Option<Instant> {
        self.last_cycle_complete
    }

    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    pub fn actuation_phase(&self) -> ActuationPhaseKind {
        self.actuator.phase()
    }

    pub fn last_actuation(&self) -> Option<ActuationOutcome> {
        self.last_actuation
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &Anomaly> {
        self.anomalies.iter()
    }
}
