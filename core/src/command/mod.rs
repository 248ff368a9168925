//! Encrypted request/response exchange with a single child device
//!
//! Each [`CommandClient::send`] call binds its own socket, sends exactly
//! one command datagram and waits for exactly one reply from the target.
//! Nothing is retried here; a retry is a new call.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

use crate::crypto::SecureChannel;
use crate::net::is_transient;
use crate::protocol::constants::RESPONSE_PREFIX;
use crate::protocol::ProtocolMessage;
use crate::{Config, Error, Result};

/// Sends commands and returns the decrypted replies
#[derive(Debug, Clone)]
pub struct CommandClient {
    timeout: Duration,
    max_datagram_size: usize,
}

impl CommandClient {
    pub fn new(config: &Config) -> Self {
        Self {
            timeout: config.command_timeout,
            max_datagram_size: config.max_datagram_size,
        }
    }

    /// Reply timeout in effect for each exchange
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Encrypt `command`, send it to `target` and decrypt the reply.
    ///
    /// Nothing leaves the host if `cancel` has already fired.
    ///
    /// # Errors
    ///
    /// - [`Error::NoResponse`] when nothing arrives from `target` in time
    /// - [`Error::MalformedResponse`] when the reply lacks the response prefix
    /// - [`Error::DecryptionFailed`] when the reply does not decrypt, which
    ///   usually means the device ID is wrong
    /// - [`Error::Network`] on socket failures
    /// - [`Error::Cancelled`] when `cancel` fires first
    pub async fn send(
        &self,
        command: &str,
        target: SocketAddr,
        channel: &SecureChannel,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            tracing::info!("command to {} cancelled before sending", target);
            return Err(Error::Cancelled);
        }

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("command to {} cancelled", target);
                return Err(Error::Cancelled);
            }
            reply = self.exchange(command, target, channel) => reply?,
        };

        let envelope = reply.strip_prefix(RESPONSE_PREFIX).ok_or_else(|| {
            tracing::warn!("unexpected reply format from {}", target);
            Error::MalformedResponse(format!("reply from {} lacks {}", target, RESPONSE_PREFIX))
        })?;

        let plaintext = channel.decrypt(envelope)?;
        tracing::debug!("response plaintext: {}", plaintext);
        Ok(plaintext)
    }

    /// Bind, send one command datagram and wait for the raw reply
    async fn exchange(&self, command: &str, target: SocketAddr, channel: &SecureChannel) -> Result<String> {
        let envelope = channel.encrypt(command)?;
        let datagram = ProtocolMessage::Command(envelope).to_bytes();

        let bind_addr: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| Error::Network(format!("failed to bind: {}", e)))?;

        socket
            .send_to(&datagram, target)
            .await
            .map_err(|e| Error::Network(format!("failed to send to {}: {}", target, e)))?;

        tracing::info!("command sent to {}", target);
        tracing::debug!("command plaintext: {}", command);

        self.receive_reply(&socket, target).await
    }

    /// Wait for the first datagram whose sender IP is the target's
    async fn receive_reply(&self, socket: &UdpSocket, target: SocketAddr) -> Result<String> {
        let deadline = Instant::now() + self.timeout;
        let mut buf = vec![0u8; self.max_datagram_size];

        loop {
            let received = timeout_at(deadline, socket.recv_from(&mut buf))
                .await
                .map_err(|_| Error::NoResponse { timeout: self.timeout })?;

            match received {
                Ok((len, src)) if src.ip() == target.ip() => {
                    return String::from_utf8(buf[..len].to_vec()).map_err(|_| {
                        Error::MalformedResponse(format!("non UTF-8 reply from {}", src))
                    });
                }
                Ok((len, src)) => {
                    tracing::warn!("ignoring {} byte datagram from unexpected sender {}", len, src);
                }
                // Some platforms surface ICMP port unreachable here; keep
                // waiting so a missing listener still ends in NoResponse
                Err(e) if is_transient(&e) => {
                    tracing::debug!("ignoring transient receive error: {}", e);
                }
                Err(e) => return Err(Error::Network(format!("receive failed: {}", e))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::COMMAND_PREFIX;

    fn client(timeout_ms: u64) -> CommandClient {
        CommandClient::new(&Config {
            command_timeout: Duration::from_millis(timeout_ms),
            ..Config::default()
        })
    }

    /// Fake child that answers one datagram with `reply(decrypted command)`
    async fn spawn_fake_child<F>(device_id: &str, reply: F) -> SocketAddr
    where
        F: FnOnce(&SecureChannel, String) -> String + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let channel = SecureChannel::from_identifier(device_id);

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (len, src) = socket.recv_from(&mut buf).await.unwrap();
            let text = std::str::from_utf8(&buf[..len]).unwrap();
            let envelope = text.strip_prefix(COMMAND_PREFIX).unwrap();
            let command = channel.decrypt(envelope).unwrap();
            let answer = reply(&channel, command);
            socket.send_to(answer.as_bytes(), src).await.unwrap();
        });

        addr
    }

    #[tokio::test]
    async fn test_round_trip() {
        let target = spawn_fake_child("device-42", |channel, command| {
            assert_eq!(command, "GET_TIME_LEFT");
            format!("CST_RESP:{}", channel.encrypt("TIME_LEFT|30|ACTIVE|60").unwrap())
        })
        .await;

        let channel = SecureChannel::from_identifier("device-42");
        let response = client(2_000)
            .send("GET_TIME_LEFT", target, &channel, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response, "TIME_LEFT|30|ACTIVE|60");
    }

    #[tokio::test]
    async fn test_missing_prefix_is_malformed() {
        let target = spawn_fake_child("device-42", |_, _| "HELLO".to_string()).await;

        let channel = SecureChannel::from_identifier("device-42");
        let result = client(2_000)
            .send("LOCK_DEVICE", target, &channel, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(Error::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_undecryptable_reply() {
        let target = spawn_fake_child("device-42", |_, _| {
            let other = SecureChannel::from_identifier("someone-else");
            format!("CST_RESP:{}", other.encrypt("TIME_LEFT|30|ACTIVE|60").unwrap())
        })
        .await;

        let channel = SecureChannel::from_identifier("device-42");
        let result = client(2_000)
            .send("GET_TIME_LEFT", target, &channel, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[tokio::test]
    async fn test_no_listener_times_out() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = silent.local_addr().unwrap();
        let channel = SecureChannel::from_identifier("device-42");

        let started = std::time::Instant::now();
        let result = client(300)
            .send("GET_TIME_LEFT", target, &channel, &CancellationToken::new())
            .await;

        assert!(started.elapsed() >= Duration::from_millis(300));
        match result {
            Err(Error::NoResponse { timeout }) => assert_eq!(timeout, Duration::from_millis(300)),
            other => panic!("expected NoResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_before_send() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = silent.local_addr().unwrap();
        let channel = SecureChannel::from_identifier("device-42");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client(5_000).send("LOCK_DEVICE", target, &channel, &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));

        // The device must never see the command
        let mut buf = [0u8; 1024];
        let received = tokio::time::timeout(Duration::from_millis(100), silent.recv_from(&mut buf)).await;
        assert!(received.is_err(), "command reached the device after cancellation");
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = silent.local_addr().unwrap();
        let channel = SecureChannel::from_identifier("device-42");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = client(5_000).send("GET_TIME_LEFT", target, &channel, &cancel).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_reply_from_other_host_is_ignored() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = socket.local_addr().unwrap();
        let stray = UdpSocket::bind("127.0.0.2:0").await.unwrap();
        let channel = SecureChannel::from_identifier("device-42");

        let child = channel.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (_, src) = socket.recv_from(&mut buf).await.unwrap();
            let forged = format!("CST_RESP:{}", child.encrypt("DEVICE_LOCKED|forged").unwrap());
            stray.send_to(forged.as_bytes(), src).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            let real = format!("CST_RESP:{}", child.encrypt("TIME_LEFT|30|ACTIVE|60").unwrap());
            socket.send_to(real.as_bytes(), src).await.unwrap();
        });

        let response = client(2_000)
            .send("GET_TIME_LEFT", target, &channel, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response, "TIME_LEFT|30|ACTIVE|60");
    }

    #[tokio::test]
    async fn test_only_other_host_replies_times_out() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = socket.local_addr().unwrap();
        let stray = UdpSocket::bind("127.0.0.2:0").await.unwrap();
        let channel = SecureChannel::from_identifier("device-42");

        let child = channel.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (_, src) = socket.recv_from(&mut buf).await.unwrap();
            let forged = format!("CST_RESP:{}", child.encrypt("TIME_LEFT|1|ACTIVE|1").unwrap());
            stray.send_to(forged.as_bytes(), src).await.unwrap();
            // Keep the target socket open so nothing is refused
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let started = std::time::Instant::now();
        let result = client(300)
            .send("GET_TIME_LEFT", target, &channel, &CancellationToken::new())
            .await;

        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(matches!(result, Err(Error::NoResponse { .. })));
    }

    #[tokio::test]
    async fn test_non_utf8_reply_is_malformed() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = socket.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (_, src) = socket.recv_from(&mut buf).await.unwrap();
            socket.send_to(&[0xff, 0xfe, 0x00, 0x80], src).await.unwrap();
        });

        let channel = SecureChannel::from_identifier("device-42");
        let result = client(2_000)
            .send("GET_TIME_LEFT", target, &channel, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(Error::MalformedResponse(_))));
    }
}
