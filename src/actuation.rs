//! Infrared set-temperature sequence.
//!
//! The board has no serial write for the set temperature. The value is sent
//! over infrared instead, and receipt is confirmed through the fan speed: the
//! fan is first moved away from its current speed over serial, then an
//! infrared command carrying the previous speed is transmitted. When the
//! board reports that speed again the blast was received.
//!
//! [`Actuator`] only decides. It returns a [`Reaction`] describing what to
//! transmit and what to queue, which the session carries out.

use log::{info, warn};

use crate::constants::{CELSIUS_RANGE, FAHRENHEIT_RANGE, QUERY_VALUE};
use crate::error::{AcError, Result};
use crate::types::{ActuationOutcome, ActuationPhaseKind, Key, ModeValue};

/// Mode carried in an infrared command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrMode {
    Cool,
    Heat,
}

/// Fan setting carried in an infrared command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrFan {
    Min,
    Medium,
    Max,
    Auto,
    Fixed,
}

impl IrFan {
    /// Infrared fan setting that makes the board report `speed`
    pub fn for_board_speed(speed: u16) -> Self {
        match speed {
            1 => IrFan::Min,
            2 => IrFan::Medium,
            3 => IrFan::Max,
            4 => IrFan::Auto,
            _ => IrFan::Fixed,
        }
    }
}

/// Logical settings for one infrared transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrCommand {
    pub power_on: bool,
    pub temperature: u16,
    pub mode: IrMode,
    pub fan: IrFan,
}

/// Something that can send an [`IrCommand`] as infrared pulses
pub trait IrTransmitter {
    fn transmit(&mut self, command: &IrCommand) -> Result<()>;
}

impl<T: IrTransmitter + ?Sized> IrTransmitter for &mut T {
    fn transmit(&mut self, command: &IrCommand) -> Result<()> {
        (**self).transmit(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingBaseline {
        target: u16,
    },
    ConfirmingBlast {
        target: u16,
        baseline: u16,
        command: IrCommand,
        retries: u8,
    },
}

/// What the session should do in response to a fan speed reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub blast: Option<IrCommand>,
    pub enqueue: Vec<(Key, u16)>,
    pub outcome: Option<ActuationOutcome>,
}

/// Bounded-retry state machine for infrared temperature changes
#[derive(Debug, Clone)]
pub struct Actuator {
    phase: Phase,
    max_retries: u8,
}

impl Actuator {
    pub fn new(max_retries: u8) -> Self {
        Actuator {
            phase: Phase::Idle,
            max_retries,
        }
    }

    pub fn phase(&self) -> ActuationPhaseKind {
        match self.phase {
            Phase::Idle => ActuationPhaseKind::Idle,
            Phase::AwaitingBaseline { .. } => ActuationPhaseKind::AwaitingBaseline,
            Phase::ConfirmingBlast { .. } => ActuationPhaseKind::ConfirmingBlast,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn target(&self) -> Option<u16> {
        match self.phase {
            Phase::Idle => None,
            Phase::AwaitingBaseline { target } | Phase::ConfirmingBlast { target, .. } => {
                Some(target)
            }
        }
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
    }

    /// End the run after one of its fan speed requests went unanswered.
    ///
    /// Once the fan has been nudged the baseline is written back.
    pub fn abandon(&mut self) -> Reaction {
        let reaction = match self.phase {
            Phase::Idle => return Reaction::default(),
            Phase::AwaitingBaseline { target } => Reaction {
                outcome: Some(ActuationOutcome::Abandoned {
                    target,
                    restored_fan_speed: None,
                }),
                ..Reaction::default()
            },
            Phase::ConfirmingBlast {
                target, baseline, ..
            } => Reaction {
                enqueue: vec![(Key::FanSpeed, baseline)],
                outcome: Some(ActuationOutcome::Abandoned {
                    target,
                    restored_fan_speed: Some(baseline),
                }),
                ..Reaction::default()
            },
        };
        warn!("Fan speed reply lost, abandoning temperature change");
        self.reset();
        reaction
    }

    /// Start a temperature change.
    ///
    /// Returns the command that reads the current fan speed; its reply is the
    /// baseline for confirmation.
    pub fn begin(&mut self, target: u16) -> Result<(Key, u16)> {
        if !CELSIUS_RANGE.contains(&target) && !FAHRENHEIT_RANGE.contains(&target) {
            return Err(AcError::TemperatureOutOfRange(target));
        }
        if let Some(current) = self.target() {
            return Err(AcError::ActuationBusy { target: current });
        }
        info!("Setting temperature to {} over infrared", target);
        self.phase = Phase::AwaitingBaseline { target };
        Ok((Key::FanSpeed, QUERY_VALUE))
    }

    /// Feed the reply to one of our fan speed commands.
    pub fn on_fan_speed(&mut self, value: u16, mode: Option<ModeValue>) -> Reaction {
        match self.phase {
            Phase::Idle => Reaction::default(),
            Phase::AwaitingBaseline { target } => {
                let command = IrCommand {
                    power_on: true,
                    temperature: target,
                    mode: match mode {
                        Some(ModeValue::Heat) => IrMode::Heat,
                        _ => IrMode::Cool,
                    },
                    fan: IrFan::for_board_speed(value),
                };
                let nudged = if value <= 1 { value + 1 } else { value - 1 };
                self.phase = Phase::ConfirmingBlast {
                    target,
                    baseline: value,
                    command,
                    retries: 0,
                };
                Reaction {
                    enqueue: vec![(Key::FanSpeed, nudged)],
                    ..Reaction::default()
                }
            }
            Phase::ConfirmingBlast {
                target,
                baseline,
                command,
                retries,
            } => {
                if value == baseline {
                    info!("Confirmed set temperature {} after {} blast(s)", target, retries);
                    self.phase = Phase::Idle;
                    Reaction {
                        enqueue: vec![(Key::SetTemperature, QUERY_VALUE)],
                        outcome: Some(ActuationOutcome::Confirmed {
                            target,
                            attempts: retries,
                        }),
                        ..Reaction::default()
                    }
                } else if retries < self.max_retries {
                    info!(
                        "Sending IR, retry {}/{}: {:?}",
                        retries + 1,
                        self.max_retries,
                        command
                    );
                    self.phase = Phase::ConfirmingBlast {
                        target,
                        baseline,
                        command,
                        retries: retries + 1,
                    };
                    Reaction {
                        blast: Some(command),
                        enqueue: vec![(Key::FanSpeed, QUERY_VALUE)],
                        outcome: None,
                    }
                } else {
                    warn!(
                        "IR blast for {} failed after {} retries, restoring fan speed {}",
                        target, self.max_retries, baseline
                    );
                    self.phase = Phase::Idle;
                    Reaction {
                        enqueue: vec![(Key::FanSpeed, baseline)],
                        outcome: Some(ActuationOutcome::Exhausted {
                            target,
                            restored_fan_speed: baseline,
                        }),
                        ..Reaction::default()
                    }
                }
            }
        }
    }
}
