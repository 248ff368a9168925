//! Caller-facing command vocabulary
//!
//! The command client sends any text; these helpers only exist so callers
//! validate operator input before any network I/O happens.

use std::fmt;

use super::constants::{MAX_EXTEND_MINUTES, MIN_EXTEND_MINUTES};
use crate::{Error, Result};

/// Commands understood by the child app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetTimeLeft,
    LockDevice,
    ExtendTime(u32),
    /// Free-form text, sent verbatim
    Custom(String),
}

impl Command {
    /// Build an `EXTEND_TIME` command, rejecting minutes outside 1..=1440
    pub fn extend_time(minutes: u32) -> Result<Self> {
        if !(MIN_EXTEND_MINUTES..=MAX_EXTEND_MINUTES).contains(&minutes) {
            return Err(Error::InvalidCommand(format!(
                "minutes must be between {} and {}",
                MIN_EXTEND_MINUTES, MAX_EXTEND_MINUTES
            )));
        }
        Ok(Command::ExtendTime(minutes))
    }

    /// Parse operator-entered minutes and build an `EXTEND_TIME` command
    pub fn parse_minutes(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidCommand("please enter minutes to extend".to_string()));
        }
        let minutes: i64 = input
            .parse()
            .map_err(|_| Error::InvalidCommand(format!("not a valid number: {}", input)))?;
        let minutes = u32::try_from(minutes).map_err(|_| {
            Error::InvalidCommand(format!(
                "minutes must be between {} and {}",
                MIN_EXTEND_MINUTES, MAX_EXTEND_MINUTES
            ))
        })?;
        Self::extend_time(minutes)
    }

    /// Wrap free-form text; empty input is rejected
    pub fn custom(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidCommand("please enter a command".to_string()));
        }
        Ok(Command::Custom(text.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::GetTimeLeft => f.write_str("GET_TIME_LEFT"),
            Command::LockDevice => f.write_str("LOCK_DEVICE"),
            Command::ExtendTime(minutes) => write!(f, "EXTEND_TIME:{}", minutes),
            Command::Custom(text) => f.write_str(text),
        }
    }
}
