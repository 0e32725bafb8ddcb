//! Optional body encryption.
//!
//! The body of each message can be run through a length-preserving stream
//! cipher so the bit-exact size law survives encryption untouched. The key
//! is derived once per session by hashing a shared passphrase; the nonce is
//! derived per message by hashing the plaintext prefix (fixed header plus
//! head section) that travels in the clear ahead of the body. Both ends see
//! the same prefix, so no nonce is ever transmitted, and any tampering with
//! the prefix garbles the decrypted body.
//!
//! An empty passphrase disables encryption entirely and both directions
//! become pass-throughs.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::{ChaCha20, Key, Nonce};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Session encryption state: either a derived 256-bit key or disabled.
#[derive(Clone, Default)]
pub struct CryptoContext {
    key: Option<[u8; 32]>,
}

impl CryptoContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the session key from `passphrase`. Empty disables encryption.
    pub fn set_passphrase(&mut self, passphrase: &str) {
        if passphrase.is_empty() {
            self.key = None;
            debug!("encryption disabled");
        } else {
            self.key = Some(Sha256::digest(passphrase.as_bytes()).into());
            debug!("encryption enabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Encrypt `body` in place. `prefix` is the plaintext bytes that precede
    /// the body on the wire and seed the per-message nonce.
    pub fn encrypt(&self, body: &mut [u8], prefix: &[u8]) {
        self.apply_keystream(body, prefix);
    }

    /// Decrypt `body` in place using the same prefix-derived nonce.
    pub fn decrypt(&self, body: &mut [u8], prefix: &[u8]) {
        self.apply_keystream(body, prefix);
    }

    // Stream-cipher XOR is its own inverse, so both directions share this.
    fn apply_keystream(&self, body: &mut [u8], prefix: &[u8]) {
        let Some(key) = &self.key else {
            return;
        };
        let digest = Sha256::digest(prefix);
        let mut cipher = ChaCha20::new(
            Key::from_slice(key),
            Nonce::from_slice(&digest[..12]),
        );
        cipher.apply_keystream(body);
    }
}

impl std::fmt::Debug for CryptoContext {
    // Never print key material.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoContext")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
