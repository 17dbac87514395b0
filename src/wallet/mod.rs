//! Key generation for newly created accounts.
//!
//! Every account gets a fresh ed25519 keypair derived from a 12-word
//! BIP-39 phrase. The phrase is the recoverable seed representation that
//! gets persisted alongside the account id, so a user can later import the
//! account into a full wallet.

use bip39::{Language, Mnemonic};
use ed25519_dalek::SigningKey;
use thiserror::Error;

use crate::pow::{KeyType, PublicKey};

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Failed to generate seed phrase: {0}")]
    SeedGeneration(String),

    #[error("Invalid seed phrase: {0}")]
    InvalidPhrase(String),
}

/// An ed25519 keypair with its recoverable seed phrase.
pub struct KeyPair {
    mnemonic: Mnemonic,
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a keypair from fresh entropy (12-word phrase).
    pub fn generate() -> Result<Self, WalletError> {
        let mut entropy = [0u8; 16];
        getrandom::getrandom(&mut entropy)
            .map_err(|e| WalletError::SeedGeneration(e.to_string()))?;

        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|e| WalletError::SeedGeneration(e.to_string()))?;

        Ok(Self::from_mnemonic(mnemonic))
    }

    /// Recover a keypair from an existing seed phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, WalletError> {
        let mnemonic = Mnemonic::parse_in(Language::English, phrase)
            .map_err(|e| WalletError::InvalidPhrase(e.to_string()))?;

        Ok(Self::from_mnemonic(mnemonic))
    }

    fn from_mnemonic(mnemonic: Mnemonic) -> Self {
        let seed = mnemonic.to_seed("");

        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&seed[..32]);
        let signing_key = SigningKey::from_bytes(&key_bytes);

        Self {
            mnemonic,
            signing_key,
        }
    }

    /// The seed phrase this keypair can be recovered from.
    pub fn seed_phrase(&self) -> String {
        self.mnemonic.to_string()
    }

    /// The tagged public half, as embedded in the mined message.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::new(KeyType::Ed25519, self.signing_key.verifying_key().to_bytes())
    }

    /// The signing key, for callers that need to sign with the new account.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_12_words() {
        let keypair = KeyPair::generate().unwrap();
        assert_eq!(keypair.seed_phrase().split_whitespace().count(), 12);
    }

    #[test]
    fn test_phrase_roundtrip() {
        let keypair = KeyPair::generate().unwrap();
        let recovered = KeyPair::from_phrase(&keypair.seed_phrase()).unwrap();

        assert_eq!(keypair.public_key(), recovered.public_key());
    }

    #[test]
    fn test_deterministic_derivation() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

        let a = KeyPair::from_phrase(phrase).unwrap();
        let b = KeyPair::from_phrase(phrase).unwrap();

        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.public_key().key_type(), KeyType::Ed25519);
    }

    #[test]
    fn test_rejects_bad_phrase() {
        assert!(KeyPair::from_phrase("not a real phrase").is_err());
    }

    #[test]
    fn test_fresh_keypairs_differ() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }
}
