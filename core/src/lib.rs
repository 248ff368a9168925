//! CST Core - parent-side control of child screen-time devices
//!
//! This library finds child devices on the local network with a UDP
//! broadcast handshake and sends them commands protected by a key derived
//! from the operator-entered device ID. There is no server and no key
//! exchange: both sides hash the same identifier.

pub mod command;
pub mod crypto;
pub mod discovery;
pub mod protocol;
pub mod responder;
pub mod service;
pub mod store;

mod error;
mod net;

pub use error::{Error, Result};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use protocol::constants;

/// Configuration shared by discovery, commands and the selection store
#[derive(Debug, Clone)]
pub struct Config {
    /// UDP port children listen on for probes and commands
    pub port: u16,
    /// Destination of the discovery probe
    pub broadcast_addr: Ipv4Addr,
    /// How long a scan collects replies
    pub discovery_window: Duration,
    /// Upper bound on a single receive inside a scan
    pub receive_poll_interval: Duration,
    /// How long a command waits for its reply
    pub command_timeout: Duration,
    /// Receive buffer size
    pub max_datagram_size: usize,
    /// Where the last selected device is stored
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: constants::COMMAND_PORT,
            broadcast_addr: constants::BROADCAST_ADDR,
            discovery_window: Duration::from_millis(constants::DISCOVERY_WINDOW_MS),
            receive_poll_interval: Duration::from_millis(constants::RECEIVE_POLL_INTERVAL_MS),
            command_timeout: Duration::from_millis(constants::COMMAND_TIMEOUT_MS),
            max_datagram_size: constants::MAX_DATAGRAM_SIZE,
            data_dir: dirs_home().join(".cst-parent"),
        }
    }
}

impl Config {
    /// Command endpoint for a device at `ip`
    pub fn command_target(&self, ip: IpAddr) -> SocketAddr {
        SocketAddr::new(ip, self.port)
    }
}

fn dirs_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

// Re-export key types for convenience
pub use command::CommandClient;
pub use crypto::{derive_key, SecureChannel, SymmetricKey};
pub use discovery::{DiscoveredDevice, DiscoveryClient, DiscoveryState, ScanReport};
pub use protocol::{format_response, Command, DeviceResponse, ProtocolMessage};
pub use responder::{ChildResponder, CommandHandler};
pub use service::{ParentService, ServiceEvent};
pub use store::{SelectedDevice, SelectionStore};
pub use tokio_util::sync::CancellationToken;
