//! Proof-of-work primitives for account creation.
//!
//! The faucet only creates an account if the caller proves work: find a
//! `u64` salt such that `sha256(account_id ':' public_key ':' salt)` has at
//! least `min_difficulty` leading zero bits. This module builds the
//! canonical message and grinds the salt.

mod message;
mod miner;

pub use message::{CandidateMessage, KeyType, PublicKey, SALT_FIELD_LEN};
pub use miner::{
    leading_zero_bits, mine, CancelToken, ProgressReport, HEARTBEAT_INTERVAL,
};
