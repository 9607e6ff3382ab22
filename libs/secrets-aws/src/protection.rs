//! Protection of sensitive configuration values at rest
//!
//! Credentials are stored protected in configuration and unprotected right
//! before the remote client is built. [`AesGcmProtector`] is the default;
//! [`PlaintextProtector`] passes values through for local development.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::ProtectionError;

/// Environment variable holding the base64 data protection key
pub const DATA_PROTECTION_KEY: &str = "SECRETS_DATA_PROTECTION_KEY";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Protects and unprotects configuration values
pub trait DataProtector: Send + Sync {
    /// Turn `plaintext` into its protected, storable form
    fn protect(&self, plaintext: &str) -> Result<String, ProtectionError>;

    /// Recover the plaintext from a value produced by [`DataProtector::protect`]
    fn unprotect(&self, protected: &str) -> Result<SecretString, ProtectionError>;
}

/// AES-256-GCM protector.
///
/// Protected values are base64 of `nonce || ciphertext || tag`, with a fresh
/// random nonce per value.
pub struct AesGcmProtector {
    cipher: Aes256Gcm,
}

impl AesGcmProtector {
    /// Build from a base64 encoded 32 byte key
    pub fn new(key: &str) -> Result<Self, ProtectionError> {
        let key = Zeroizing::new(
            STANDARD
                .decode(key.trim())
                .map_err(|e| ProtectionError::InvalidKey(e.to_string()))?,
        );
        if key.len() != KEY_LEN {
            return Err(ProtectionError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| ProtectionError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Build from the key in [`DATA_PROTECTION_KEY`]
    pub fn from_env() -> Result<Self, ProtectionError> {
        let key = Zeroizing::new(
            std::env::var(DATA_PROTECTION_KEY)
                .map_err(|_| ProtectionError::MissingKey(DATA_PROTECTION_KEY))?,
        );
        Self::new(&key)
    }

    /// A fresh random key, base64 encoded
    pub fn generate_key() -> Zeroizing<String> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand::rng().fill_bytes(&mut *key);
        Zeroizing::new(STANDARD.encode(&*key))
    }
}

impl DataProtector for AesGcmProtector {
    fn protect(&self, plaintext: &str) -> Result<String, ProtectionError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| ProtectionError::EncryptionFailed)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    fn unprotect(&self, protected: &str) -> Result<SecretString, ProtectionError> {
        let payload = STANDARD
            .decode(protected.trim())
            .map_err(|e| ProtectionError::Malformed(e.to_string()))?;
        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(ProtectionError::Malformed("payload too short".to_string()));
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| ProtectionError::DecryptionFailed)?;

        Ok(SecretString::new(String::from_utf8(plaintext)?))
    }
}

/// Stores values as-is. Development only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextProtector;

impl DataProtector for PlaintextProtector {
    fn protect(&self, plaintext: &str) -> Result<String, ProtectionError> {
        Ok(plaintext.to_owned())
    }

    fn unprotect(&self, protected: &str) -> Result<SecretString, ProtectionError> {
        Ok(SecretString::new(protected.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn protector() -> AesGcmProtector {
        AesGcmProtector::new(&AesGcmProtector::generate_key()).unwrap()
    }

    #[test]
    fn test_unprotect_recovers_plaintext() {
        let protector = protector();

        let protected = protector.protect("AKIDEXAMPLE").unwrap();
        assert_ne!(protected, "AKIDEXAMPLE");
        assert_eq!(protector.unprotect(&protected).unwrap().expose_secret(), "AKIDEXAMPLE");
    }

    #[test]
    fn test_protect_uses_fresh_nonce() {
        let protector = protector();

        assert_ne!(protector.protect("same").unwrap(), protector.protect("same").unwrap());
    }

    #[test]
    fn test_tampered_value_fails() {
        let protector = protector();
        let mut payload = STANDARD.decode(protector.protect("value").unwrap()).unwrap();
        let last = payload.len() - 1;
        payload[last] ^= 0x01;

        let err = protector.unprotect(&STANDARD.encode(payload)).unwrap_err();
        assert!(matches!(err, ProtectionError::DecryptionFailed));
    }

    #[test]
    fn test_wrong_key_fails() {
        let protected = protector().protect("value").unwrap();

        let err = protector().unprotect(&protected).unwrap_err();
        assert!(matches!(err, ProtectionError::DecryptionFailed));
    }

    #[test]
    fn test_malformed_values() {
        let protector = protector();

        assert!(matches!(
            protector.unprotect("not base64!").unwrap_err(),
            ProtectionError::Malformed(_)
        ));
        assert!(matches!(
            protector.unprotect(&STANDARD.encode([0u8; 8])).unwrap_err(),
            ProtectionError::Malformed(_)
        ));
    }

    #[test]
    fn test_invalid_keys() {
        assert!(matches!(
            AesGcmProtector::new(&STANDARD.encode([0u8; 16])),
            Err(ProtectionError::InvalidKey(_))
        ));
        assert!(matches!(
            AesGcmProtector::new("%%%"),
            Err(ProtectionError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_plaintext_protector_passes_through() {
        let protected = PlaintextProtector.protect("value").unwrap();

        assert_eq!(protected, "value");
        assert_eq!(PlaintextProtector.unprotect(&protected).unwrap().expose_secret(), "value");
    }
}
