//! Canonical message layout for the proof-of-work hash.
//!
//! The verifier reconstructs the exact same byte sequence on its side, so
//! the layout here is fixed: UTF-8 account id, `b':'`, one algorithm tag
//! byte, the raw key bytes, `b':'`, then an 8-byte salt field.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width of the mutable salt field at the end of the message.
pub const SALT_FIELD_LEN: usize = 8;

/// Key algorithm identifier, transmitted as a single leading byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    Ed25519 = 0,
}

impl KeyType {
    /// The wire tag for this algorithm.
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

/// An asymmetric public key: algorithm tag plus raw key bytes.
///
/// Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    key_type: KeyType,
    data: [u8; 32],
}

impl PublicKey {
    pub const fn new(key_type: KeyType, data: [u8; 32]) -> Self {
        Self { key_type, data }
    }

    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.data
    }

    /// Tag-prefixed byte representation, as submitted to the faucet.
    pub fn to_tagged_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.data.len());
        bytes.push(self.key_type.tag());
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key_type {
            KeyType::Ed25519 => write!(f, "ed25519:{}", hex::encode(self.data)),
        }
    }
}

/// The mutable byte buffer a mining run hashes.
///
/// Owned exclusively by one in-progress search; the last [`SALT_FIELD_LEN`]
/// bytes are a little-endian counter incremented in place so the hot loop
/// never re-encodes or reallocates.
pub struct CandidateMessage {
    buf: Vec<u8>,
}

impl CandidateMessage {
    /// Build the canonical message for `account_id` and `public_key` with an
    /// all-zero salt field.
    pub fn new(account_id: &str, public_key: &PublicKey) -> Self {
        let key_bytes = public_key.as_bytes();
        let mut buf = Vec::with_capacity(account_id.len() + key_bytes.len() + 3 + SALT_FIELD_LEN);
        buf.extend_from_slice(account_id.as_bytes());
        buf.push(b':');
        buf.push(public_key.key_type().tag());
        buf.extend_from_slice(key_bytes);
        buf.push(b':');
        buf.extend_from_slice(&[0u8; SALT_FIELD_LEN]);
        Self { buf }
    }

    /// The full message, including the current salt field.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The 8-byte salt field.
    pub fn salt_field(&self) -> &[u8] {
        &self.buf[self.buf.len() - SALT_FIELD_LEN..]
    }

    /// Current salt value, reading the field as a little-endian u64.
    pub fn salt(&self) -> u64 {
        let field: [u8; SALT_FIELD_LEN] = self
            .salt_field()
            .try_into()
            .unwrap_or([0u8; SALT_FIELD_LEN]);
        u64::from_le_bytes(field)
    }

    /// Increment the salt field by one, carrying from the lowest-order byte
    /// upward. Wraps to all-zero after `2^64 - 1` increments.
    pub fn increment_salt(&mut self) {
        let start = self.buf.len() - SALT_FIELD_LEN;
        for byte in &mut self.buf[start..] {
            if *byte == u8::MAX {
                *byte = 0;
            } else {
                *byte += 1;
                break;
            }
        }
    }
}
