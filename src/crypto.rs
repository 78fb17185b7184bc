//! Field-level authenticated encryption.
//!
//! Sensitive record fields are encrypted individually with ChaCha20-Poly1305.
//! Ciphertexts are self-contained: a random 96-bit nonce is prepended to the
//! AEAD output and the whole token is hex-encoded, so decryption needs only
//! the key. The engine holds a single key per instance; key rotation is a
//! known limitation and out of scope.

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, VaultError};

/// Nonce length in bytes for ChaCha20-Poly1305.
const NONCE_LEN: usize = 12;

/// A 256-bit symmetric key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a key from its 64-character hex representation.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key)
            .map_err(|e| VaultError::config(format!("encryption key is not valid hex: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VaultError::config("encryption key must be 32 bytes"))?;
        Ok(Self(bytes))
    }

    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Capability for encrypting and decrypting individual field values.
///
/// The serializer takes this as an injected dependency so tests can swap in
/// [`NoopCipher`].
pub trait FieldCipher: Send + Sync {
    /// Encrypt a plaintext field value into a self-contained token.
    fn encrypt_field(&self, plaintext: &str) -> Result<String>;

    /// Decrypt a token produced by `encrypt_field`. Fails on tampering,
    /// wrong key, or malformed input.
    fn decrypt_field(&self, ciphertext: &str) -> Result<String>;

    /// Encrypt an arbitrary byte payload (whole-artifact encryption at rest).
    fn encrypt_payload(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt a payload produced by `encrypt_payload`.
    fn decrypt_payload(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// ChaCha20-Poly1305 field cipher with a fixed per-instance key.
pub struct ChaChaFieldCipher {
    cipher: ChaCha20Poly1305,
}

impl ChaChaFieldCipher {
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
        }
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| VaultError::decryption("encryption failure"))?;

        let mut token = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        token.extend_from_slice(nonce.as_slice());
        token.extend_from_slice(&ciphertext);
        Ok(token)
    }

    fn open(&self, token: &[u8]) -> Result<Vec<u8>> {
        if token.len() <= NONCE_LEN {
            return Err(VaultError::decryption("ciphertext too short"));
        }
        let (nonce, ciphertext) = token.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| VaultError::decryption("authentication tag mismatch"))
    }
}

impl FieldCipher for ChaChaFieldCipher {
    fn encrypt_field(&self, plaintext: &str) -> Result<String> {
        Ok(hex::encode(self.seal(plaintext.as_bytes())?))
    }

    fn decrypt_field(&self, ciphertext: &str) -> Result<String> {
        let token = hex::decode(ciphertext)
            .map_err(|_| VaultError::decryption("ciphertext is not valid hex"))?;
        let plaintext = self.open(&token)?;
        String::from_utf8(plaintext)
            .map_err(|_| VaultError::decryption("decrypted field is not valid UTF-8"))
    }

    fn encrypt_payload(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.seal(plaintext)
    }

    fn decrypt_payload(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.open(ciphertext)
    }
}

/// Pass-through cipher for tests and plaintext runs.
#[derive(Debug, Default)]
pub struct NoopCipher;

impl FieldCipher for NoopCipher {
    fn encrypt_field(&self, plaintext: &str) -> Result<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt_field(&self, ciphertext: &str) -> Result<String> {
        Ok(ciphertext.to_string())
    }

    fn encrypt_payload(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn decrypt_payload(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key(fill: u8) -> EncryptionKey {
        EncryptionKey::new([fill; 32])
    }

    #[test]
    fn field_round_trip_recovers_plaintext() {
        let cipher = ChaChaFieldCipher::new(&test_key(7));
        let token = cipher.encrypt_field("holder@example.com").unwrap();
        assert_ne!(token, "holder@example.com");
        assert_eq!(cipher.decrypt_field(&token).unwrap(), "holder@example.com");
    }

    #[test]
    fn nonce_randomization_changes_ciphertext() {
        let cipher = ChaChaFieldCipher::new(&test_key(7));
        let a = cipher.encrypt_field("IFSC0001234").unwrap();
        let b = cipher.encrypt_field("IFSC0001234").unwrap();
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt_field(&a).unwrap(), "IFSC0001234");
        assert_eq!(cipher.decrypt_field(&b).unwrap(), "IFSC0001234");
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let token = ChaChaFieldCipher::new(&test_key(1))
            .encrypt_field("9876543210")
            .unwrap();
        let err = ChaChaFieldCipher::new(&test_key(2))
            .decrypt_field(&token)
            .unwrap_err();
        assert!(matches!(err, VaultError::Decryption { .. }));
    }

    #[test]
    fn tampered_token_fails_authentication() {
        let cipher = ChaChaFieldCipher::new(&test_key(3));
        let mut token = cipher.encrypt_field("secret").unwrap().into_bytes();
        let last = token.len() - 1;
        token[last] = if token[last] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(token).unwrap();
        assert!(cipher.decrypt_field(&tampered).is_err());
    }

    #[test]
    fn malformed_token_is_rejected() {
        let cipher = ChaChaFieldCipher::new(&test_key(3));
        assert!(cipher.decrypt_field("not-hex!").is_err());
        assert!(cipher.decrypt_field("abcd").is_err());
    }

    #[test]
    fn payload_round_trip() {
        let cipher = ChaChaFieldCipher::new(&test_key(9));
        let sealed = cipher.encrypt_payload(b"whole artifact payload").unwrap();
        assert_eq!(
            cipher.decrypt_payload(&sealed).unwrap(),
            b"whole artifact payload"
        );
    }

    #[test]
    fn key_parsing_validates_length_and_hex() {
        assert!(EncryptionKey::from_hex(&"ab".repeat(32)).is_ok());
        assert!(EncryptionKey::from_hex("zz").is_err());
        assert!(EncryptionKey::from_hex(&"ab".repeat(16)).is_err());
    }
}
