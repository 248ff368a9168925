//! Key derivation from the operator-supplied device identifier

use sha2::{Digest, Sha256};

/// AES-128 key length in bytes
pub const KEY_LEN: usize = 16;

/// 128-bit symmetric key shared by a parent and one child device
///
/// Never serialized or sent over the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey").finish_non_exhaustive()
    }
}

impl SymmetricKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Borrow the raw key material
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

/// Derive the shared key for a device identifier.
///
/// The key is the first 128 bits of SHA-256 over the UTF-8 bytes of the
/// identifier, so both ends agree on it without any key exchange. The
/// identifier is used verbatim; callers trim user input before calling.
pub fn derive_key(identifier: &str) -> SymmetricKey {
    let digest = Sha256::digest(identifier.as_bytes());
    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(&digest[..KEY_LEN]);
    SymmetricKey { bytes }
}
