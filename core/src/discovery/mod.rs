//! UDP broadcast discovery of child devices on the local network
//!
//! A scan sends one probe to the broadcast address and then listens for
//! the full discovery window. Every datagram that is exactly the reply
//! literal marks its sender as a child device. There is no early exit:
//! slow devices still get the whole window to answer.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::net::is_transient;
use crate::protocol::constants::DEVICE_NAME_PREFIX;
use crate::protocol::ProtocolMessage;
use crate::{Config, Error, Result};

/// A child device that answered a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub display_name: String,
    /// Sender IP with the command port
    pub address: SocketAddr,
}

impl DiscoveredDevice {
    fn from_sender(ip: IpAddr, port: u16) -> Self {
        Self {
            display_name: format!("{}{}", DEVICE_NAME_PREFIX, ip),
            address: SocketAddr::new(ip, port),
        }
    }
}

/// Outcome of one completed scan
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Unique devices in arrival order
    pub devices: Vec<DiscoveredDevice>,
    /// Reply datagrams seen, duplicates included
    pub valid_replies: usize,
    /// Every datagram received, noise included
    pub total_datagrams: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Idle,
    Scanning,
}

/// Proof that the holder owns the single scan slot of a [`DiscoveryClient`].
/// Dropping it returns the client to [`DiscoveryState::Idle`].
#[derive(Debug)]
pub struct ScanPermit {
    scanning: Arc<AtomicBool>,
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.scanning.store(false, Ordering::Release);
    }
}

/// Broadcast discovery client
///
/// Clones share the Idle/Scanning state, so at most one scan runs across
/// all of them.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    config: Config,
    scanning: Arc<AtomicBool>,
}

impl DiscoveryClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scanning: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> DiscoveryState {
        if self.scanning.load(Ordering::Acquire) {
            DiscoveryState::Scanning
        } else {
            DiscoveryState::Idle
        }
    }

    /// Move from Idle to Scanning, or fail with [`Error::ScanInProgress`]
    pub fn try_begin(&self) -> Result<ScanPermit> {
        self.scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ScanInProgress)?;
        Ok(ScanPermit {
            scanning: self.scanning.clone(),
        })
    }

    /// Run a full scan and return the devices found
    pub async fn scan(&self, cancel: &CancellationToken) -> Result<ScanReport> {
        let permit = self.try_begin()?;
        self.run(permit, cancel, None).await
    }

    /// Run a full scan, also sending each new device to `progress` as it
    /// is found. Devices that do not fit in `progress` are still part of
    /// the returned report.
    pub async fn scan_with_progress(
        &self,
        cancel: &CancellationToken,
        progress: &mpsc::Sender<DiscoveredDevice>,
    ) -> Result<ScanReport> {
        let permit = self.try_begin()?;
        self.run(permit, cancel, Some(progress)).await
    }

    /// Run a scan under a permit obtained from [`try_begin`](Self::try_begin).
    ///
    /// The socket lives only for this call and is closed on every exit
    /// path. Cancellation returns [`Error::Cancelled`] without partial
    /// results.
    pub async fn run(
        &self,
        _permit: ScanPermit,
        cancel: &CancellationToken,
        progress: Option<&mpsc::Sender<DiscoveredDevice>>,
    ) -> Result<ScanReport> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(|e| Error::DiscoveryFailed(format!("failed to bind: {}", e)))?;
        socket
            .set_broadcast(true)
            .map_err(|e| Error::DiscoveryFailed(format!("failed to enable broadcast: {}", e)))?;

        let target = SocketAddr::from((self.config.broadcast_addr, self.config.port));
        socket
            .send_to(&ProtocolMessage::DiscoveryProbe.to_bytes(), target)
            .await
            .map_err(|e| Error::DiscoveryFailed(format!("failed to send probe to {}: {}", target, e)))?;

        tracing::info!("discovery probe sent to {}, listening for {:?}", target, self.config.discovery_window);

        let deadline = Instant::now() + self.config.discovery_window;
        let mut buf = vec![0u8; self.config.max_datagram_size];
        let mut seen = HashSet::new();
        let mut report = ScanReport::default();

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let poll = self.config.receive_poll_interval.min(deadline - now);

            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("discovery cancelled");
                    return Err(Error::Cancelled);
                }
                r = timeout(poll, socket.recv_from(&mut buf)) => r,
            };

            let (len, src) = match received {
                // Poll expired, re-check the deadline
                Err(_) => continue,
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) if is_transient(&e) => {
                    tracing::debug!("ignoring transient receive error: {}", e);
                    continue;
                }
                Ok(Err(e)) => {
                    return Err(Error::DiscoveryFailed(format!("receive failed: {}", e)));
                }
            };

            report.total_datagrams += 1;

            if ProtocolMessage::from_bytes(&buf[..len]) != Some(ProtocolMessage::DiscoveryReply) {
                tracing::debug!("ignoring {} byte datagram from {}", len, src);
                continue;
            }

            report.valid_replies += 1;
            if !seen.insert(src.ip()) {
                tracing::debug!("duplicate reply from {}", src.ip());
                continue;
            }

            let device = DiscoveredDevice::from_sender(src.ip(), self.config.port);
            tracing::info!("found child device at {}", src.ip());
            if let Some(tx) = progress {
                // Never block the window on a slow consumer
                match tx.try_send(device.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!("progress queue full, not reporting {}", src.ip());
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        tracing::warn!("progress receiver dropped, not reporting {}", src.ip());
                    }
                }
            }
            report.devices.push(device);
        }

        tracing::info!(
            "discovery completed: {} device(s), {} valid replies, {} datagrams",
            report.devices.len(),
            report.valid_replies,
            report.total_datagrams
        );
        Ok(report)
    }
}

/// Get local IP addresses (non-loopback)
pub fn get_local_ips() -> Vec<IpAddr> {
    let mut ips = Vec::new();

    if let Ok(interfaces) = get_if_addrs::get_if_addrs() {
        for iface in interfaces {
            if !iface.is_loopback() {
                ips.push(iface.ip());
            }
        }
    }

    ips
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::protocol::constants::{DISCOVERY_PROBE, DISCOVERY_REPLY};

    fn loopback_config(port: u16, window_ms: u64) -> Config {
        Config {
            port,
            broadcast_addr: Ipv4Addr::LOCALHOST,
            discovery_window: Duration::from_millis(window_ms),
            receive_poll_interval: Duration::from_millis(50),
            ..Config::default()
        }
    }

    /// Fake child that answers the probe with the given payloads
    async fn spawn_fake_child(replies: Vec<&'static str>) -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (len, src) = socket.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], DISCOVERY_PROBE.as_bytes());
            for reply in replies {
                socket.send_to(reply.as_bytes(), src).await.unwrap();
            }
        });

        port
    }

    #[tokio::test]
    async fn test_empty_scan_waits_full_window() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = silent.local_addr().unwrap().port();
        let client = DiscoveryClient::new(loopback_config(port, 300));

        let started = std::time::Instant::now();
        let report = client.scan(&CancellationToken::new()).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(report.devices.is_empty());
        assert_eq!(report.valid_replies, 0);
        assert_eq!(client.state(), DiscoveryState::Idle);
    }

    #[tokio::test]
    async fn test_duplicate_replies_are_merged() {
        let port = spawn_fake_child(vec![
            DISCOVERY_REPLY,
            "HELLO",
            DISCOVERY_REPLY,
            "CST_CHILD_RESPONSE ",
            DISCOVERY_REPLY,
        ])
        .await;
        let client = DiscoveryClient::new(loopback_config(port, 300));

        let report = client.scan(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.devices.len(), 1);
        assert_eq!(report.valid_replies, 3);
        assert_eq!(report.total_datagrams, 5);

        let device = &report.devices[0];
        assert_eq!(device.display_name, "Child Device: 127.0.0.1");
        assert_eq!(device.address, SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
    }

    #[tokio::test]
    async fn test_progress_reports_each_device() {
        let port = spawn_fake_child(vec![DISCOVERY_REPLY, DISCOVERY_REPLY]).await;
        let client = DiscoveryClient::new(loopback_config(port, 200));
        let (tx, mut rx) = mpsc::channel(8);

        let report = client
            .scan_with_progress(&CancellationToken::new(), &tx)
            .await
            .unwrap();
        drop(tx);

        let mut found = Vec::new();
        while let Some(device) = rx.recv().await {
            found.push(device);
        }
        assert_eq!(found, report.devices);
    }

    #[tokio::test]
    async fn test_full_progress_queue_does_not_stall_scan() {
        // Two hosts answer: 127.0.0.1 directly and 127.0.0.2 on its behalf
        let first = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let second = UdpSocket::bind("127.0.0.2:0").await.unwrap();
        let port = first.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (_, src) = first.recv_from(&mut buf).await.unwrap();
            first.send_to(DISCOVERY_REPLY.as_bytes(), src).await.unwrap();
            second.send_to(DISCOVERY_REPLY.as_bytes(), src).await.unwrap();
        });

        let client = DiscoveryClient::new(loopback_config(port, 300));
        // Room for one device and never drained
        let (tx, _rx) = mpsc::channel(1);

        let report = tokio::time::timeout(
            Duration::from_secs(3),
            client.scan_with_progress(&CancellationToken::new(), &tx),
        )
        .await
        .expect("scan stalled on a full progress queue")
        .unwrap();

        assert_eq!(report.devices.len(), 2);
        assert_eq!(report.valid_replies, 2);
        assert_eq!(client.state(), DiscoveryState::Idle);
    }

    #[tokio::test]
    async fn test_overlapping_scan_rejected() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = silent.local_addr().unwrap().port();
        let client = DiscoveryClient::new(loopback_config(port, 300));

        let permit = client.try_begin().unwrap();
        assert_eq!(client.state(), DiscoveryState::Scanning);

        let second = client.clone();
        let result = second.scan(&CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::ScanInProgress)));

        drop(permit);
        assert_eq!(client.state(), DiscoveryState::Idle);
        assert!(client.try_begin().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_ends_scan_early() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = silent.local_addr().unwrap().port();
        let client = DiscoveryClient::new(loopback_config(port, 5_000));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = client.scan(&cancel).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(client.state(), DiscoveryState::Idle);
    }

    #[test]
    fn test_get_local_ips() {
        let ips = get_local_ips();
        assert!(ips.iter().all(|ip| !ip.is_loopback()));
    }
}
