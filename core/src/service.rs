//! High-level parent service that runs scans and commands off the caller's
//! thread and reports back through an event channel

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::command::CommandClient;
use crate::crypto::{self, SecureChannel};
use crate::discovery::{DiscoveredDevice, DiscoveryClient, DiscoveryState, ScanReport};
use crate::protocol::{format_response, Command};
use crate::store::{SelectedDevice, SelectionStore};
use crate::{Config, Error, Result};

/// Events emitted by the parent service
#[derive(Debug)]
pub enum ServiceEvent {
    /// A scan began; the previous selection was forgotten
    ScanStarted,
    /// A new device answered the current scan
    DeviceFound(DiscoveredDevice),
    /// The discovery window closed
    ScanCompleted(ScanReport),
    ScanFailed(Error),
    /// A command left for the device
    CommandSent { command: String, target: SocketAddr },
    /// The device answered
    CommandCompleted {
        command: String,
        response: String,
        formatted: String,
    },
    CommandFailed { command: String, error: Error },
}

/// Main parent service
///
/// Each operation spawns one task that owns its socket for the whole
/// operation. Results only ever reach the caller through the event
/// channel returned by [`ParentService::new`].
pub struct ParentService {
    config: Config,
    discovery: DiscoveryClient,
    commands: CommandClient,
    store: SelectionStore,
    events: mpsc::Sender<ServiceEvent>,
}

impl ParentService {
    /// Create the service and its event channel.
    ///
    /// Fails with [`Error::CryptoUnavailable`] if the crypto self test does
    /// not pass; the protocol cannot be offered at all in that case.
    pub fn new(config: Config) -> Result<(Self, mpsc::Receiver<ServiceEvent>)> {
        crypto::self_test()?;

        let (tx, rx) = mpsc::channel(64);
        let service = Self {
            discovery: DiscoveryClient::new(config.clone()),
            commands: CommandClient::new(&config),
            store: SelectionStore::new(&config.data_dir),
            config,
            events: tx,
        };
        Ok((service, rx))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn discovery_state(&self) -> DiscoveryState {
        self.discovery.state()
    }

    /// Start a discovery scan.
    ///
    /// Returns a token that abandons the scan when cancelled. A scan that
    /// is already running makes this fail with [`Error::ScanInProgress`].
    pub fn scan(&self) -> Result<CancellationToken> {
        let permit = self.discovery.try_begin()?;

        if let Err(e) = self.store.clear() {
            tracing::warn!("failed to clear saved selection: {}", e);
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let discovery = self.discovery.clone();
        let tx = self.events.clone();

        tokio::spawn(async move {
            notify(&tx, ServiceEvent::ScanStarted);

            // Forward devices as they are found
            let (progress_tx, mut progress_rx) = mpsc::channel(32);
            let tx_progress = tx.clone();
            let forwarder = tokio::spawn(async move {
                while let Some(device) = progress_rx.recv().await {
                    notify(&tx_progress, ServiceEvent::DeviceFound(device));
                }
            });

            let result = discovery.run(permit, &token, Some(&progress_tx)).await;
            drop(progress_tx);
            let _ = forwarder.await;

            let event = match result {
                Ok(report) => ServiceEvent::ScanCompleted(report),
                Err(e) => {
                    tracing::warn!("scan failed: {}", e);
                    ServiceEvent::ScanFailed(e)
                }
            };
            let _ = tx.send(event).await;
        });

        Ok(cancel)
    }

    /// Send `command` to `device` in the background.
    ///
    /// Returns a token that abandons the exchange when cancelled.
    pub fn send_command(&self, command: &Command, device: &SelectedDevice) -> CancellationToken {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let client = self.commands.clone();
        let tx = self.events.clone();
        let command = command.to_string();
        let target = self.config.command_target(device.address);
        let channel = SecureChannel::from_identifier(device.device_id.trim());

        tokio::spawn(async move {
            notify(
                &tx,
                ServiceEvent::CommandSent {
                    command: command.clone(),
                    target,
                },
            );

            let event = match client.send(&command, target, &channel, &token).await {
                Ok(response) => ServiceEvent::CommandCompleted {
                    formatted: format_response(&response),
                    command,
                    response,
                },
                Err(error) => {
                    tracing::warn!("command to {} failed: {}", target, error);
                    ServiceEvent::CommandFailed { command, error }
                }
            };
            let _ = tx.send(event).await;
        });

        cancel
    }

    /// Pair a discovered device with the operator-entered device ID and
    /// remember it across runs
    pub fn select(&self, device: &DiscoveredDevice, device_id: &str) -> Result<SelectedDevice> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(Error::MissingDeviceId);
        }

        let selected = SelectedDevice {
            display_name: device.display_name.clone(),
            address: device.address.ip(),
            device_id: device_id.to_string(),
        };
        self.store.save(&selected)?;
        tracing::info!("selected {}", selected.display_name);
        Ok(selected)
    }

    /// The remembered selection, if any
    pub fn selected(&self) -> Result<Option<SelectedDevice>> {
        self.store.load()
    }

    pub fn forget_selection(&self) -> Result<()> {
        self.store.clear()
    }
}

/// Deliver a progress event without waiting on the caller.
///
/// Only terminal events are awaited, and those are sent after the socket
/// and scan slot have been released.
fn notify(tx: &mpsc::Sender<ServiceEvent>, event: ServiceEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(event)) => {
            tracing::warn!("event queue full, dropping {:?}", event);
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!("event receiver dropped");
        }
    }
}
