//! Proof-of-Work Account Faucet Client
//!
//! A client library for faucets that create ledger accounts in exchange
//! for proof of work: before the faucet registers `alice.faucet`, the
//! caller must find a salt such that
//! `sha256(account_id ':' public_key ':' salt)` has enough leading zero
//! bits. The grind is the anti-spam gate.
//!
//! # Overview
//!
//! - [`account`] — syntactic rules for requested account names
//! - [`pow`] — the canonical message layout and the salt search loop
//! - [`wallet`] — seed-phrase keypair generation for new accounts
//! - [`rpc`] — the faucet service as an injectable capability trait
//! - [`store`] — credential and session persistence
//! - [`creator`] — the state machine tying one creation attempt together
//!
//! # Example
//!
//! ```rust
//! use pow_faucet::{leading_zero_bits, CandidateMessage, KeyType, PublicKey};
//!
//! let key = PublicKey::new(KeyType::Ed25519, [0u8; 32]);
//! let mut msg = CandidateMessage::new("alice.faucet", &key);
//!
//! // The account id heads the message; the salt field starts at zero.
//! assert_eq!(&msg.bytes()[..12], b"alice.faucet");
//! assert_eq!(msg.salt(), 0);
//!
//! msg.increment_salt();
//! assert_eq!(msg.salt(), 1);
//!
//! assert_eq!(leading_zero_bits(&[0x0F, 0xFF]), 4);
//! ```

pub mod account;
pub mod creator;
pub mod pow;
pub mod rpc;
pub mod store;
pub mod wallet;

// Convenience re-exports
pub use account::{is_valid_account_id, sanitize_requested_name};
pub use creator::{AccountCreator, CreateError, CreatedAccount, CreatorState, NameStatus};
pub use pow::{leading_zero_bits, mine, CancelToken, CandidateMessage, KeyType, ProgressReport, PublicKey};
pub use rpc::{CreateAccountArgs, FaucetConfig, FaucetRpc, HttpFaucetClient, RpcError};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, Session, StoredKey};
pub use wallet::KeyPair;
