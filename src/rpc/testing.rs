//! In-process faucet for tests.
//!
//! Verifies submissions the same way the on-chain faucet does: suffix
//! check, duplicate check, then recompute the proof-of-work digest from the
//! submitted `(account_id, public_key, salt)` and score its leading zero
//! bits. Not intended for production use.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::pow::leading_zero_bits;

use super::{CreateAccountArgs, FaucetConfig, FaucetRpc, RpcError};

/// An in-memory [`FaucetRpc`] implementation with real proof verification.
pub struct FakeFaucet {
    config: FaucetConfig,
    created: Mutex<HashSet<String>>,
    submissions: AtomicU64,
}

impl FakeFaucet {
    pub fn new(account_suffix: &str, min_difficulty: u32) -> Self {
        Self {
            config: FaucetConfig {
                account_suffix: account_suffix.to_string(),
                min_difficulty,
            },
            created: Mutex::new(HashSet::new()),
            submissions: AtomicU64::new(0),
        }
    }

    /// Pre-seed an account id, e.g. to exercise the existence probe.
    pub fn insert_existing(&self, account_id: &str) {
        self.created
            .lock()
            .expect("fake faucet lock poisoned")
            .insert(account_id.to_string());
    }

    /// How many `create_account` calls were received, accepted or not.
    pub fn submission_count(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    fn verify(&self, args: &CreateAccountArgs) -> Result<(), RpcError> {
        if !args.account_id.ends_with(&self.config.account_suffix) {
            return Err(RpcError::Rejected(
                "account id does not end with the faucet suffix".to_string(),
            ));
        }

        // Same message layout the client mines over.
        let mut message = args.account_id.as_bytes().to_vec();
        message.push(b':');
        message.extend_from_slice(&args.public_key);
        message.push(b':');
        message.extend_from_slice(&args.salt.to_le_bytes());

        let digest = Sha256::digest(&message);
        if leading_zero_bits(&digest) < self.config.min_difficulty {
            return Err(RpcError::Rejected("the proof of work is too weak".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FaucetRpc for FakeFaucet {
    async fn fetch_config(&self) -> Result<FaucetConfig, RpcError> {
        Ok(self.config.clone())
    }

    async fn num_created_accounts(&self) -> Result<u64, RpcError> {
        Ok(self.created.lock().expect("fake faucet lock poisoned").len() as u64)
    }

    async fn account_exists(&self, account_id: &str) -> Result<bool, RpcError> {
        Ok(self
            .created
            .lock()
            .expect("fake faucet lock poisoned")
            .contains(account_id))
    }

    async fn create_account(&self, args: &CreateAccountArgs) -> Result<(), RpcError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);

        let mut created = self.created.lock().expect("fake faucet lock poisoned");
        if created.contains(&args.account_id) {
            return Err(RpcError::Rejected("the account is already created".to_string()));
        }
        self.verify(args)?;
        created.insert(args.account_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::{mine, CancelToken, CandidateMessage, KeyType, PublicKey};

    fn tagged(key: &PublicKey) -> Vec<u8> {
        key.to_tagged_bytes()
    }

    #[tokio::test]
    async fn test_accepts_a_mined_proof() {
        let faucet = FakeFaucet::new(".faucet", 8);
        let key = PublicKey::new(KeyType::Ed25519, [9u8; 32]);
        let mut msg = CandidateMessage::new("alice.faucet", &key);
        let salt = mine(&mut msg, 8, &CancelToken::never(), |_| {})
            .await
            .unwrap();

        let args = CreateAccountArgs {
            account_id: "alice.faucet".to_string(),
            public_key: tagged(&key),
            salt,
        };
        faucet.create_account(&args).await.unwrap();
        assert_eq!(faucet.num_created_accounts().await.unwrap(), 1);
        assert!(faucet.account_exists("alice.faucet").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_weak_proof() {
        let faucet = FakeFaucet::new(".faucet", 64);
        let key = PublicKey::new(KeyType::Ed25519, [9u8; 32]);
        let args = CreateAccountArgs {
            account_id: "alice.faucet".to_string(),
            public_key: tagged(&key),
            salt: 0,
        };
        let err = faucet.create_account(&args).await.unwrap_err();
        assert!(matches!(err, RpcError::Rejected(_)));
        assert_eq!(faucet.num_created_accounts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejects_wrong_suffix() {
        let faucet = FakeFaucet::new(".faucet", 0);
        let key = PublicKey::new(KeyType::Ed25519, [9u8; 32]);
        let args = CreateAccountArgs {
            account_id: "alice.other".to_string(),
            public_key: tagged(&key),
            salt: 0,
        };
        let err = faucet.create_account(&args).await.unwrap_err();
        assert!(matches!(err, RpcError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_rejects_duplicate_account() {
        let faucet = FakeFaucet::new(".faucet", 0);
        faucet.insert_existing("alice.faucet");

        let key = PublicKey::new(KeyType::Ed25519, [9u8; 32]);
        let args = CreateAccountArgs {
            account_id: "alice.faucet".to_string(),
            public_key: tagged(&key),
            salt: 0,
        };
        let err = faucet.create_account(&args).await.unwrap_err();
        assert!(matches!(err, RpcError::Rejected(_)));
        assert_eq!(faucet.submission_count(), 1);
    }
}
