use acboard_protocol::*;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// In-memory link: bytes pushed by the test are read by the board.
#[derive(Default)]
struct MockLink {
    incoming: VecDeque<u8>,
    written: Vec<Vec<u8>>,
}

impl MockLink {
    fn reply(&mut self, key: Key, value: u16) {
        let frame = Frame::encode(key, value).unwrap();
        self.incoming.extend(frame.as_bytes());
    }

    fn take_written(&mut self) -> Vec<(Key, u16)> {
        self.written
            .drain(..)
            .map(|bytes| {
                let mut framer = Framer::new();
                for b in &bytes {
                    framer.push(*b).unwrap();
                }
                let frame = framer.frame().unwrap();
                (frame.key().unwrap(), frame.value())
            })
            .collect()
    }
}

impl Link for MockLink {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.incoming.len().min(buf.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.incoming.pop_front().unwrap();
        }
        Ok(n)
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        self.written.push(bytes.to_vec());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingIr {
    sent: Vec<IrCommand>,
}

impl IrTransmitter for RecordingIr {
    fn transmit(&mut self, command: &IrCommand) -> Result<()> {
        self.sent.push(*command);
        Ok(())
    }
}

fn board(poll_keys: Vec<Key>) -> AcBoard<MockLink, RecordingIr> {
    let config = Config {
        poll_keys,
        ..Config::default()
    };
    AcBoard::new(MockLink::default(), RecordingIr::default(), config)
}

#[test]
fn handshake_then_polls_each_key_in_order() {
    let mut board = board(vec![Key::Power, Key::Mode, Key::Voltage]);
    let t0 = Instant::now();

    board.tick(t0).unwrap();
    assert_eq!(board.link_mut().take_written(), vec![(Key::Active, 0)]);

    // Each reply immediately triggers the next request in the same tick.
    board.link_mut().reply(Key::Active, 1);
    board.tick(t0).unwrap();
    assert_eq!(board.link_mut().take_written(), vec![(Key::Power, 0)]);

    board.link_mut().reply(Key::Power, 2);
    board.tick(t0).unwrap();
    board.link_mut().reply(Key::Mode, 1);
    board.tick(t0).unwrap();
    board.link_mut().reply(Key::Voltage, 2301);
    board.tick(t0).unwrap();
    assert_eq!(
        board.link_mut().take_written(),
        vec![(Key::Mode, 0), (Key::Voltage, 0)]
    );

    // Cycle complete: nothing until the poll interval has passed.
    board.tick(t0 + Duration::from_millis(500)).unwrap();
    assert!(board.link_mut().take_written().is_empty());
    board.tick(t0 + Duration::from_secs(1)).unwrap();
    assert_eq!(board.link_mut().take_written(), vec![(Key::Power, 0)]);

    let state = board.cached_state();
    assert_eq!(state.get(&Key::Power), Some(&Reading::Switch(OnOffValue::On)));
    assert_eq!(state.get(&Key::Mode), Some(&Reading::Mode(ModeValue::Cool)));
    assert_eq!(state.get(&Key::Voltage), Some(&Reading::Scaled(230.1)));
    assert_eq!(board.session().stats().frames_rx, 4);
    assert_eq!(board.session().stats().frames_tx, 5);
}

#[test]
fn garbage_between_frames_is_skipped() {
    let mut board = board(vec![Key::Power]);
    let t0 = Instant::now();
    board.tick(t0).unwrap();
    board.link_mut().take_written();

    board.link_mut().incoming.extend([0x00, 0xFF, 0x0D, 0x0A]);
    board.link_mut().reply(Key::Active, 1);
    board.tick(t0).unwrap();

    assert_eq!(board.link_mut().take_written(), vec![(Key::Power, 0)]);
    assert_eq!(board.session().stats().spurious_bytes_rx, 4);
    assert_eq!(board.session().stats().frames_rx, 1);
}

#[test]
fn infrared_temperature_change_confirmed() {
    let mut board = board(vec![]);
    let t0 = Instant::now();
    board.tick(t0).unwrap();
    board.link_mut().reply(Key::Mode, 2);
    board.link_mut().reply(Key::Active, 1);
    board.tick(t0).unwrap();
    board.link_mut().take_written();

    board.try_set_temperature(72).unwrap();
    board.tick(t0).unwrap();
    assert_eq!(board.link_mut().take_written(), vec![(Key::FanSpeed, 0)]);

    // Baseline reply: fan is nudged down so the blast can be detected.
    board.link_mut().reply(Key::FanSpeed, 4);
    board.tick(t0).unwrap();
    assert_eq!(board.link_mut().take_written(), vec![(Key::FanSpeed, 3)]);

    // Nudge acknowledged: first blast, then a fan speed query.
    board.link_mut().reply(Key::FanSpeed, 3);
    board.tick(t0).unwrap();
    assert_eq!(board.link_mut().take_written(), vec![(Key::FanSpeed, 0)]);
    assert_eq!(
        board.ir().sent,
        vec![IrCommand {
            power_on: true,
            temperature: 72,
            mode: IrMode::Heat,
            fan: IrFan::Auto,
        }]
    );

    // Fan back at baseline: confirmed, set temperature re-read.
    board.link_mut().reply(Key::FanSpeed, 4);
    board.tick(t0).unwrap();
    assert_eq!(board.link_mut().take_written(), vec![(Key::SetTemperature, 0)]);
    assert_eq!(
        board.session().last_actuation(),
        Some(ActuationOutcome::Confirmed { target: 72, attempts: 1 })
    );
    assert_eq!(board.session().set_temperature_f(), Some(72));

    // 72F truncates to 22C, so the display value is kept.
    board.link_mut().reply(Key::SetTemperature, 22);
    board.tick(t0).unwrap();
    assert_eq!(board.session().set_temperature_f(), Some(72));
    assert_eq!(board.session().actuation_phase(), ActuationPhaseKind::Idle);
}

#[test]
fn console_commands() {
    let mut board = board(vec![]);
    let t0 = Instant::now();
    board.tick(t0).unwrap();
    board.link_mut().reply(Key::Active, 1);
    board.tick(t0).unwrap();
    board.link_mut().take_written();

    assert_eq!(board.execute(parse_command("set LCD=1")).unwrap(), None);
    board.tick(t0).unwrap();
    assert_eq!(board.link_mut().take_written(), vec![(Key::Lcd, 0)]);
    board.link_mut().reply(Key::Lcd, 0);
    board.tick(t0).unwrap();
    assert_eq!(board.link_mut().take_written(), vec![(Key::Lcd, 1)]);

    assert!(matches!(
        board.execute(parse_command("set Voltage=1")),
        Err(AcError::NotSettable(Key::Voltage))
    ));
    assert!(matches!(
        board.execute(parse_command("set Power")),
        Err(AcError::Parse(_))
    ));
    assert_eq!(
        board.execute(parse_command("restart")).unwrap(),
        Some(Lifecycle::Restart)
    );
    assert_eq!(
        board.execute(parse_command("resetConfig")).unwrap(),
        Some(Lifecycle::ResetConfig)
    );
}

#[test]
fn debug_set_sends_raw_frame() {
    let mut board = board(vec![]);
    let t0 = Instant::now();
    board.tick(t0).unwrap();
    board.link_mut().reply(Key::Active, 1);
    board.tick(t0).unwrap();
    board.link_mut().take_written();

    board.execute(parse_command("debugSet 33=5")).unwrap();
    board.tick(t0).unwrap();
    assert_eq!(
        board.link_mut().written,
        vec![Frame::encode_unchecked(33, 5).as_bytes().to_vec()]
    );
}

#[test]
fn snapshot_serializes_to_json() {
    let mut board = board(vec![]);
    let t0 = Instant::now();
    board.link_mut().reply(Key::Power, 2);
    board.link_mut().reply(Key::Voltage, 2301);
    board.link_mut().reply(Key::SetTemperature, 24);
    board.tick(t0).unwrap();

    let json = serde_json::to_value(board.snapshot()).unwrap();
    assert_eq!(json["readings"]["power"], "On");
    assert_eq!(json["readings"]["voltage"], 230.1);
    assert_eq!(json["readings"]["temperature"], 24);
    assert_eq!(json["set_temperature_f"], 76);
    assert_eq!(json["actuation"], "idle");
    assert_eq!(json["stats"]["frames_rx"], 3);
}

#[test]
fn open_requires_a_port() {
    let result = AcBoard::open(Config::default(), RecordingIr::default());
    assert!(matches!(result, Err(AcError::NoPort)));
}
