//! Decrypted response parsing and human-readable rendering

use std::fmt;

const TIME_LEFT: &str = "TIME_LEFT|";
const TIME_EXTENDED: &str = "TIME_EXTENDED|";
const DEVICE_LOCKED: &str = "DEVICE_LOCKED|";
const ERROR: &str = "ERROR|";

/// A decrypted response from a child device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceResponse {
    /// `TIME_LEFT|<remaining>|<status>|<total>`
    TimeLeft {
        remaining_minutes: i64,
        status: String,
        total_minutes: i64,
    },
    /// `TIME_EXTENDED|<message>`
    TimeExtended(String),
    /// `DEVICE_LOCKED|<message>`; the child reports lock failures here too
    DeviceLocked(String),
    /// `ERROR|<message>`
    Error(String),
    /// Anything else, including a `TIME_LEFT` with unparseable fields
    Other(String),
}

impl DeviceResponse {
    pub fn parse(text: &str) -> Self {
        if text.starts_with(TIME_LEFT) {
            return parse_time_left(text).unwrap_or_else(|| DeviceResponse::Other(text.to_string()));
        }
        if let Some(message) = text.strip_prefix(TIME_EXTENDED) {
            return DeviceResponse::TimeExtended(message.to_string());
        }
        if let Some(message) = text.strip_prefix(DEVICE_LOCKED) {
            return DeviceResponse::DeviceLocked(message.to_string());
        }
        if let Some(message) = text.strip_prefix(ERROR) {
            return DeviceResponse::Error(message.to_string());
        }
        DeviceResponse::Other(text.to_string())
    }

    /// Whether the child reported a failure
    pub fn is_error(&self) -> bool {
        match self {
            DeviceResponse::Error(_) => true,
            DeviceResponse::DeviceLocked(message) => message.starts_with("ERROR"),
            _ => false,
        }
    }
}

fn parse_time_left(text: &str) -> Option<DeviceResponse> {
    let parts: Vec<&str> = text.split('|').collect();
    if parts.len() < 4 {
        return None;
    }
    let remaining_minutes = parts[1].parse().ok()?;
    let total_minutes = parts[3].parse().ok()?;
    Some(DeviceResponse::TimeLeft {
        remaining_minutes,
        status: parts[2].to_string(),
        total_minutes,
    })
}

impl fmt::Display for DeviceResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceResponse::TimeLeft {
                remaining_minutes,
                status,
                total_minutes,
            } => write!(
                f,
                "Time Left: {} min (Total: {} min) - Status: {}",
                remaining_minutes, total_minutes, status
            ),
            DeviceResponse::TimeExtended(message) => write!(f, "✓ {}", message),
            DeviceResponse::DeviceLocked(message) if self.is_error() => write!(f, "✗ {}", message),
            DeviceResponse::DeviceLocked(message) => write!(f, "✓ {}", message),
            DeviceResponse::Error(message) => write!(f, "✗ {}", message),
            DeviceResponse::Other(text) => f.write_str(text),
        }
    }
}

/// Render a decrypted response for display.
///
/// Unknown shapes, and known shapes with malformed fields, come back
/// unchanged. Applying it twice gives the same result as applying it once.
pub fn format_response(text: &str) -> String {
    DeviceResponse::parse(text).to_string()
}
