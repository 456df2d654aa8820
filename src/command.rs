//! Debug console commands.
//!
//! ```text
//! set <key>=<value>          set by key name, e.g. "set Power=2"
//! debugSet <key>=<value>     raw key number, no validation
//! restart
//! resetConfig
//! ```

use crate::types::Key;

pub const SET_USAGE: &str = "set <key>=<value>";
pub const DEBUG_SET_USAGE: &str = "debugSet <key>=<value>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set a key by name. The name is resolved when the command runs.
    Set { key: String, value: u16 },
    /// Send an arbitrary key byte and value
    DebugSet { key: u8, value: u16 },
    Restart,
    ResetConfig,
    /// Known verb with bad syntax
    Invalid { usage: &'static str },
    Unknown(String),
}

impl Command {
    /// Help text listing the console verbs and settable keys
    pub fn help(settable: &[Key]) -> String {
        let mut text = String::from("Valid commands:\n\tset\n\tdebugSet\n\trestart\n\tresetConfig\nValid keys:");
        for key in settable {
            text.push_str("\n\t");
            text.push_str(key.name());
        }
        text
    }
}

fn split_assignment(rest: &str) -> Option<(&str, u16)> {
    let (key, value) = rest.split_once('=')?;
    let value = value.trim().parse().ok()?;
    Some((key.trim(), value))
}

/// Parse one line of console input
pub fn parse_command(text: &str) -> Command {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix("set ") {
        return match split_assignment(rest) {
            Some((key, value)) if !key.is_empty() => Command::Set {
                key: key.to_string(),
                value,
            },
            _ => Command::Invalid { usage: SET_USAGE },
        };
    }

    if let Some(rest) = text.strip_prefix("debugSet ") {
        return match split_assignment(rest).and_then(|(k, v)| Some((k.parse::<u8>().ok()?, v))) {
            Some((key, value)) => Command::DebugSet { key, value },
            None => Command::Invalid {
                usage: DEBUG_SET_USAGE,
            },
        };
    }

    match text {
        "restart" => Command::Restart,
        "resetConfig" => Command::ResetConfig,
        _ => Command::Unknown(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set() {
        assert_eq!(
            parse_command("set Set Temperature=24"),
            Command::Set { key: "Set Temperature".into(), value: 24 }
        );
        assert_eq!(
            parse_command("set fan = 3\n"),
            Command::Set { key: "fan".into(), value: 3 }
        );
    }

    #[test]
    fn parses_debug_set() {
        assert_eq!(parse_command("debugSet 66=2"), Command::DebugSet { key: 0x42, value: 2 });
        assert_eq!(parse_command("debugSet 3=300"), Command::DebugSet { key: 3, value: 300 });
    }

    #[test]
    fn malformed_commands_report_usage() {
        assert_eq!(parse_command("set Power"), Command::Invalid { usage: SET_USAGE });
        assert_eq!(parse_command("set =1"), Command::Invalid { usage: SET_USAGE });
        assert_eq!(parse_command("set Power=on"), Command::Invalid { usage: SET_USAGE });
        assert_eq!(parse_command("debugSet Power=1"), Command::Invalid { usage: DEBUG_SET_USAGE });
        assert_eq!(parse_command("debugSet 300=1"), Command::Invalid { usage: DEBUG_SET_USAGE });
    }

    #[test]
    fn lifecycle_and_unknown() {
        assert_eq!(parse_command("restart"), Command::Restart);
        assert_eq!(parse_command(" resetConfig "), Command::ResetConfig);
        assert_eq!(parse_command("reboot"), Command::Unknown("reboot".into()));
    }

    #[test]
    fn help_lists_keys() {
        let help = Command::help(&[Key::Power, Key::SetTemperature]);
        assert!(help.contains("\tPower"));
        assert!(help.ends_with("\tSet Temperature"));
    }
}
