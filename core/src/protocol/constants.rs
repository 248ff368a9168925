//! Centralized protocol constants
//!
//! Wire literals and timing policy shared by the parent and the child
//! device. Changing any literal here breaks interoperability with
//! deployed child apps.

use std::net::Ipv4Addr;

/// UDP port used for both discovery and command traffic
pub const COMMAND_PORT: u16 = 8888;

/// Limited broadcast address the discovery probe is sent to
pub const BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Probe broadcast by the parent
pub const DISCOVERY_PROBE: &str = "CST_PARENT_DISCOVERY";

/// Exact payload a child answers a probe with
pub const DISCOVERY_REPLY: &str = "CST_CHILD_RESPONSE";

/// Prefix of an encrypted command datagram
pub const COMMAND_PREFIX: &str = "CST_CMD:";

/// Prefix of an encrypted response datagram
pub const RESPONSE_PREFIX: &str = "CST_RESP:";

/// Wall-clock length of a discovery scan in milliseconds
pub const DISCOVERY_WINDOW_MS: u64 = 5_000;

/// Upper bound on a single receive inside the discovery loop
pub const RECEIVE_POLL_INTERVAL_MS: u64 = 500;

/// How long a command waits for its single reply
pub const COMMAND_TIMEOUT_MS: u64 = 5_000;

/// Receive buffer size; replies longer than this are truncated by the OS
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// AES block size, also the length of the IV header of an envelope
pub const BLOCK_SIZE: usize = 16;

/// Allowed range for `EXTEND_TIME:<minutes>`
pub const MIN_EXTEND_MINUTES: u32 = 1;
pub const MAX_EXTEND_MINUTES: u32 = 1440;

/// Prefix of the display name given to discovered devices
pub const DEVICE_NAME_PREFIX: &str = "Child Device: ";

/// File name of the persisted device selection inside the data dir
pub const SELECTION_FILE: &str = "selected_device.json";
