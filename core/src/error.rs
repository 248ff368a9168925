use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the parent-side protocol
#[derive(Error, Debug)]
pub enum Error {
    /// A required cryptographic primitive (hash, cipher, secure RNG) is
    /// unusable. Nothing in the protocol can work without it.
    #[error("Cryptography unavailable: {0}")]
    CryptoUnavailable(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("A discovery scan is already running")]
    ScanInProgress,

    #[error("No response within {timeout:?}")]
    NoResponse { timeout: Duration },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Device ID cannot be empty")]
    MissingDeviceId,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Selection store error: {0}")]
    Store(String),

    #[error("Failed to serialize/deserialize: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the operator can reasonably retry after this error.
    ///
    /// Only a missing crypto primitive is fatal; everything else is a
    /// per-operation failure and leaves the channel and service usable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::CryptoUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
