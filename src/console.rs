//! Commands accepted on the interactive console

use crate::app::Day;
use crate::error::{PlungeError, Result};

/// One console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Gated refresh
    Refresh,
    /// Fetch regardless of publication time
    Fetch,
    /// Overview of a day
    Show(Day),
    /// Negative-price banner
    Negative,
    /// Current slot
    Now,
    /// Enable or disable notifications
    Notify(bool),
    /// Update one setting
    Set { key: String, value: String },
    /// Restore default settings
    Reset,
    /// Print current settings
    Settings,
    /// Fetch status and armed alerts
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  refresh              refresh rates if new ones may be available
  fetch                fetch rates now
  today | tomorrow     show the day's rates
  neg                  show negative-price windows
  now                  show the current slot
  notify on|off        toggle negative-price notifications
  set <key> <value>    update a setting (apiKey, mpan, serial, agilePlanVersion, region, ofgemCapRate)
  reset                restore default settings
  settings             show settings
  status               show fetch status
  help                 show this help
  quit                 exit";

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "refresh" | "r" => Command::Refresh,
        "fetch" => Command::Fetch,
        "today" | "t" => Command::Show(Day::Today),
        "tomorrow" | "tm" => Command::Show(Day::Tomorrow),
        "neg" | "negative" => Command::Negative,
        "now" => Command::Now,
        "notify" => match words.next().map(str::to_ascii_lowercase).as_deref() {
            Some("on") => Command::Notify(true),
            Some("off") => Command::Notify(false),
            _ => return Err(PlungeError::validation("notify", "expected 'on' or 'off'")),
        },
        "set" => {
            let key = words
                .next()
                .ok_or_else(|| PlungeError::validation("set", "missing setting name"))?;
            // Values may contain spaces; keep the rest of the line
            let value = line.trim_start()[head.len()..].trim_start()[key.len()..]
                .trim()
                .to_string();
            Command::Set {
                key: key.to_string(),
                value,
            }
        }
        "reset" => Command::Reset,
        "settings" => Command::Settings,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => {
            return Err(PlungeError::validation(
                "command",
                format!("unknown command '{}', try 'help'", other),
            ));
        }
    };
    Ok(Some(command))
}
