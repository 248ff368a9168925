//! Child-side endpoint of the protocol
//!
//! Answers discovery probes and decrypts incoming commands with the
//! device's own key, handing the plaintext to a [`CommandHandler`]. The
//! CLI uses it to simulate a child device; tests use it as a real peer.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::crypto::SecureChannel;
use crate::net::is_transient;
use crate::protocol::ProtocolMessage;
use crate::{Error, Result};

/// Produces the plaintext response for a decrypted command
pub trait CommandHandler: Send + Sync {
    fn handle(&self, command: &str) -> String;
}

impl<F> CommandHandler for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn handle(&self, command: &str) -> String {
        self(command)
    }
}

/// UDP responder bound to the command port
pub struct ChildResponder {
    socket: UdpSocket,
    channel: SecureChannel,
    handler: Arc<dyn CommandHandler>,
    max_datagram_size: usize,
}

impl ChildResponder {
    /// Bind the responder socket
    pub async fn bind(
        addr: SocketAddr,
        channel: SecureChannel,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| Error::Network(format!("failed to bind {}: {}", addr, e)))?;

        tracing::info!("child responder listening on {}", addr);

        Ok(Self {
            socket,
            channel,
            handler,
            max_datagram_size: crate::protocol::constants::MAX_DATAGRAM_SIZE,
        })
    }

    /// Get the address we're listening on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| Error::Network(e.to_string()))
    }

    /// Serve datagrams until `cancel` fires or the socket breaks
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut buf = vec![0u8; self.max_datagram_size];

        loop {
            let (len, src) = tokio::select! {
                _ = cancel.cancelled() => break,
                r = self.socket.recv_from(&mut buf) => match r {
                    Ok(pair) => pair,
                    Err(e) => match receive_error(e) {
                        Some(fatal) => return Err(fatal),
                        None => continue,
                    },
                },
            };

            let Some(reply) = self.reply_to(&buf[..len], src) else {
                continue;
            };

            if let Err(e) = self.socket.send_to(reply.as_bytes(), src).await {
                tracing::warn!("failed to reply to {}: {}", src, e);
            }
        }

        tracing::info!("child responder stopped");
        Ok(())
    }

    /// Build the reply for one datagram, if it deserves one
    fn reply_to(&self, datagram: &[u8], src: SocketAddr) -> Option<String> {
        match ProtocolMessage::from_bytes(datagram)? {
            ProtocolMessage::DiscoveryProbe => {
                tracing::debug!("discovery probe from {}", src);
                Some(ProtocolMessage::DiscoveryReply.encode())
            }
            ProtocolMessage::Command(envelope) => {
                let command = match self.channel.decrypt(&envelope) {
                    Ok(command) => command,
                    Err(e) => {
                        tracing::warn!("dropping command from {}: {}", src, e);
                        return None;
                    }
                };
                tracing::debug!("command from {}: {}", src, command);

                let response = self.handler.handle(&command);
                match self.channel.encrypt(&response) {
                    Ok(envelope) => Some(ProtocolMessage::Response(envelope).encode()),
                    Err(e) => {
                        tracing::error!("failed to encrypt response: {}", e);
                        None
                    }
                }
            }
            _ => None,
        }
    }
}

/// `None` for errors the loop can ride out, else the error that stops it
fn receive_error(e: io::Error) -> Option<Error> {
    if is_transient(&e) {
        tracing::debug!("ignoring transient receive error: {}", e);
        return None;
    }
    tracing::error!("responder socket failed: {}", e);
    Some(Error::Network(format!("receive failed: {}", e)))
}
