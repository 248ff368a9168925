//! Symmetric encryption using AES-128-CBC with a random IV per message

use aes::Aes128;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};

use super::keys::{derive_key, SymmetricKey};
use crate::protocol::constants::BLOCK_SIZE;
use crate::{Error, Result};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Encrypts and decrypts envelope strings under one fixed key
///
/// An envelope is `base64(IV || ciphertext)`. The channel holds no mutable
/// state, so it can be shared across tasks freely.
#[derive(Clone)]
pub struct SecureChannel {
    key: SymmetricKey,
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel").finish_non_exhaustive()
    }
}

impl SecureChannel {
    pub fn new(key: SymmetricKey) -> Self {
        Self { key }
    }

    /// Build a channel straight from a device identifier
    pub fn from_identifier(identifier: &str) -> Self {
        Self::new(derive_key(identifier))
    }

    /// Encrypt `plaintext` into a base64 envelope.
    ///
    /// Fails only when the OS random source cannot provide an IV.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut iv = [0u8; BLOCK_SIZE];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| Error::CryptoUnavailable(format!("secure random source: {}", e)))?;

        let ciphertext = Aes128CbcEnc::new_from_slices(self.key.as_bytes(), &iv)
            .map_err(|e| Error::CryptoUnavailable(format!("cipher init: {}", e)))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut envelope = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(envelope))
    }

    /// Decrypt a base64 envelope back into text.
    ///
    /// Every failure mode (bad base64, bad length, bad padding, non UTF-8
    /// output) is reported as [`Error::DecryptionFailed`]. A wrong key
    /// almost always shows up as bad padding.
    pub fn decrypt(&self, envelope: &str) -> Result<String> {
        // Android's Base64.DEFAULT wraps lines, so whitespace is skipped.
        let compact: String = envelope.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = BASE64
            .decode(compact.as_bytes())
            .map_err(|e| Error::DecryptionFailed(format!("invalid base64: {}", e)))?;

        if bytes.len() < BLOCK_SIZE * 2 || bytes.len() % BLOCK_SIZE != 0 {
            return Err(Error::DecryptionFailed(format!(
                "invalid envelope length: {} bytes",
                bytes.len()
            )));
        }

        let (iv, ciphertext) = bytes.split_at(BLOCK_SIZE);
        let plaintext = Aes128CbcDec::new_from_slices(self.key.as_bytes(), iv)
            .map_err(|e| Error::CryptoUnavailable(format!("cipher init: {}", e)))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| Error::DecryptionFailed("invalid padding (wrong device ID?)".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::DecryptionFailed("plaintext is not valid UTF-8".to_string()))
    }
}
