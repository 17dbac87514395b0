//! Account creation orchestration.
//!
//! One [`AccountCreator`] sequences a creation attempt end to end:
//! validate the requested name, generate a keypair, mine the proof of
//! work, submit to the faucet, persist the credentials. The current phase
//! is published through a `watch` channel so observers (a UI, a test) can
//! follow along without being coupled to the pipeline.
//!
//! Attempts are generation-counted: starting a new attempt cancels the
//! previous one's mining loop, and a superseded attempt can never publish
//! state again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::account::is_valid_account_id;
use crate::pow::{mine, CancelToken, CandidateMessage, ProgressReport, PublicKey};
use crate::rpc::{CreateAccountArgs, FaucetConfig, FaucetRpc, RpcError};
use crate::store::{CredentialStore, Session, StoreError, StoredKey};
use crate::wallet::{KeyPair, WalletError};

#[derive(Error, Debug)]
pub enum CreateError {
    /// The requested name failed validation. No network call was made;
    /// the user corrects the input and tries again.
    #[error("invalid account name {0:?}")]
    InvalidName(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A newer attempt was started while this one was in flight.
    #[error("creation attempt superseded by a newer one")]
    Superseded,
}

/// Observable phase of the current creation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatorState {
    Idle,
    Validating {
        requested_name: String,
    },
    GeneratingKey {
        account_id: String,
    },
    Mining {
        account_id: String,
        progress_percent: u32,
        best_zero_bits: u32,
        salt: u64,
    },
    Submitting {
        account_id: String,
        salt: u64,
    },
    Persisting {
        account_id: String,
    },
    Done {
        account_id: String,
        num_created_accounts: u64,
    },
    Failed {
        message: String,
    },
}

/// Result of the live availability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStatus {
    Invalid,
    Taken,
    Available,
}

/// A successfully created account.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub account_id: String,
    pub public_key: PublicKey,
    pub salt: u64,
    pub seed_phrase: String,
}

/// Sequences validation, key generation, mining, submission and
/// persistence into one account-creation attempt.
pub struct AccountCreator<R, S> {
    rpc: Arc<R>,
    store: Arc<S>,
    network_id: String,
    config: FaucetConfig,
    num_created: AtomicU64,
    attempt_seq: Arc<AtomicU64>,
    state_tx: watch::Sender<CreatorState>,
}

impl<R, S> AccountCreator<R, S>
where
    R: FaucetRpc,
    S: CredentialStore,
{
    /// Fetch the faucet configuration and created-account count, then
    /// build an idle creator. The suffix and difficulty are treated as
    /// immutable for the process lifetime.
    pub async fn connect(
        rpc: Arc<R>,
        store: Arc<S>,
        network_id: impl Into<String>,
    ) -> Result<Self, CreateError> {
        let config = rpc.fetch_config().await?;
        let num_created = rpc.num_created_accounts().await?;
        info!(
            suffix = %config.account_suffix,
            min_difficulty = config.min_difficulty,
            num_created,
            "connected to faucet"
        );

        let (state_tx, _) = watch::channel(CreatorState::Idle);
        Ok(Self {
            rpc,
            store,
            network_id: network_id.into(),
            config,
            num_created: AtomicU64::new(num_created),
            attempt_seq: Arc::new(AtomicU64::new(0)),
            state_tx,
        })
    }

    /// Observe state transitions of the current attempt.
    pub fn subscribe(&self) -> watch::Receiver<CreatorState> {
        self.state_tx.subscribe()
    }

    pub fn account_suffix(&self) -> &str {
        &self.config.account_suffix
    }

    pub fn min_difficulty(&self) -> u32 {
        self.config.min_difficulty
    }

    /// Last known created-account count (refreshed after each success).
    pub fn num_created_accounts(&self) -> u64 {
        self.num_created.load(Ordering::Relaxed)
    }

    pub fn full_account_id(&self, requested_name: &str) -> String {
        format!("{requested_name}{}", self.config.account_suffix)
    }

    /// The persisted session, if any. Presence means signed in.
    pub fn session(&self) -> Result<Option<Session>, StoreError> {
        self.store.load_session()
    }

    /// Clear the session and return to `Idle`.
    pub fn logout(&self) -> Result<(), StoreError> {
        self.store.clear_session()?;
        self.state_tx.send_replace(CreatorState::Idle);
        Ok(())
    }

    /// Seed the fixed service-operator key into the store if absent.
    pub fn ensure_operator_key(&self, name: &str, key: &StoredKey) -> Result<(), StoreError> {
        if self.store.get_key(&self.network_id, name)?.is_none() {
            self.store.set_key(&self.network_id, name, key)?;
        }
        Ok(())
    }

    /// Live validation feedback: syntax check plus existence probe.
    ///
    /// Probe failures only affect displayed state, so they are swallowed
    /// and the name is reported available.
    pub async fn check_availability(&self, requested_name: &str) -> NameStatus {
        if !is_valid_account_id(requested_name, &self.config.account_suffix) {
            return NameStatus::Invalid;
        }
        let account_id = self.full_account_id(requested_name);
        match self.rpc.account_exists(&account_id).await {
            Ok(true) => NameStatus::Taken,
            Ok(false) => NameStatus::Available,
            Err(err) => {
                debug!(%account_id, error = %err, "existence probe failed");
                NameStatus::Available
            }
        }
    }

    /// Run one creation attempt to completion.
    ///
    /// Starting a new attempt while another is mining cancels the older
    /// one, which then returns [`CreateError::Superseded`] without
    /// publishing any further state.
    pub async fn create_account(&self, requested_name: &str) -> Result<CreatedAccount, CreateError> {
        let generation = self.attempt_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancelToken::new(Arc::clone(&self.attempt_seq), generation);

        self.publish(
            &cancel,
            CreatorState::Validating {
                requested_name: requested_name.to_string(),
            },
        );
        if !is_valid_account_id(requested_name, &self.config.account_suffix) {
            self.publish(&cancel, CreatorState::Idle);
            return Err(CreateError::InvalidName(requested_name.to_string()));
        }

        let account_id = self.full_account_id(requested_name);
        match self.run_attempt(&cancel, &account_id).await {
            Ok(created) => Ok(created),
            Err(CreateError::Superseded) => Err(CreateError::Superseded),
            Err(err) => {
                warn!(%account_id, error = %err, "account creation failed");
                self.publish(
                    &cancel,
                    CreatorState::Failed {
                        message: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }

    async fn run_attempt(
        &self,
        cancel: &CancelToken,
        account_id: &str,
    ) -> Result<CreatedAccount, CreateError> {
        self.publish(
            cancel,
            CreatorState::GeneratingKey {
                account_id: account_id.to_string(),
            },
        );
        let keypair = KeyPair::generate()?;
        let public_key = keypair.public_key();

        let mut message = CandidateMessage::new(account_id, &public_key);
        self.publish(
            cancel,
            CreatorState::Mining {
                account_id: account_id.to_string(),
                progress_percent: 0,
                best_zero_bits: 0,
                salt: 0,
            },
        );

        let mut best_zero_bits = 0u32;
        let mut best_percent = 0u32;
        let salt = mine(
            &mut message,
            self.config.min_difficulty,
            cancel,
            |report| {
                let state = match report {
                    ProgressReport::Best {
                        salt,
                        zero_bits,
                        percent,
                    } => {
                        best_zero_bits = zero_bits;
                        best_percent = percent;
                        CreatorState::Mining {
                            account_id: account_id.to_string(),
                            progress_percent: percent,
                            best_zero_bits: zero_bits,
                            salt,
                        }
                    }
                    ProgressReport::Heartbeat { salt } => CreatorState::Mining {
                        account_id: account_id.to_string(),
                        progress_percent: best_percent,
                        best_zero_bits,
                        salt,
                    },
                };
                self.publish(cancel, state);
            },
        )
        .await
        .ok_or(CreateError::Superseded)?;
        info!(%account_id, salt, "proof of work found");

        self.publish(
            cancel,
            CreatorState::Submitting {
                account_id: account_id.to_string(),
                salt,
            },
        );
        if cancel.is_cancelled() {
            return Err(CreateError::Superseded);
        }
        let args = CreateAccountArgs {
            account_id: account_id.to_string(),
            public_key: public_key.to_tagged_bytes(),
            salt,
        };
        self.rpc.create_account(&args).await?;

        self.publish(
            cancel,
            CreatorState::Persisting {
                account_id: account_id.to_string(),
            },
        );
        let seed_phrase = keypair.seed_phrase();
        self.store.set_key(
            &self.network_id,
            account_id,
            &StoredKey {
                public_key: public_key.clone(),
                seed_phrase: seed_phrase.clone(),
            },
        )?;
        self.store.save_session(&Session {
            account_id: account_id.to_string(),
            seed_phrase: seed_phrase.clone(),
        })?;

        match self.rpc.num_created_accounts().await {
            Ok(count) => self.num_created.store(count, Ordering::Relaxed),
            Err(err) => warn!(error = %err, "failed to refresh created-account count"),
        }

        info!(%account_id, "account created");
        self.publish(
            cancel,
            CreatorState::Done {
                account_id: account_id.to_string(),
                num_created_accounts: self.num_created.load(Ordering::Relaxed),
            },
        );

        Ok(CreatedAccount {
            account_id: account_id.to_string(),
            public_key,
            salt,
            seed_phrase,
        })
    }

    /// Publish `state` unless this attempt has been superseded. The check
    /// runs inside the channel's modify closure, so a stale attempt can
    /// never overwrite state belonging to a newer one.
    fn publish(&self, cancel: &CancelToken, state: CreatorState) {
        self.state_tx.send_modify(|current| {
            if !cancel.is_cancelled() {
                *current = state;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::testing::FakeFaucet;
    use crate::store::MemoryCredentialStore;

    const SUFFIX: &str = ".faucet";

    async fn connect(
        faucet: Arc<FakeFaucet>,
    ) -> (
        Arc<AccountCreator<FakeFaucet, MemoryCredentialStore>>,
        Arc<MemoryCredentialStore>,
    ) {
        let store = Arc::new(MemoryCredentialStore::new());
        let creator = AccountCreator::connect(faucet, Arc::clone(&store), "testnet")
            .await
            .unwrap();
        (Arc::new(creator), store)
    }

    #[tokio::test]
    async fn test_end_to_end_creation() {
        let faucet = Arc::new(FakeFaucet::new(SUFFIX, 8));
        let (creator, store) = connect(Arc::clone(&faucet)).await;
        assert_eq!(creator.num_created_accounts(), 0);

        let mut states = creator.subscribe();
        let created = creator.create_account("alice").await.unwrap();

        assert_eq!(created.account_id, "alice.faucet");
        // Submitted exactly once, and the fake re-verified the proof.
        assert_eq!(faucet.submission_count(), 1);
        assert_eq!(creator.num_created_accounts(), 1);

        // Credentials and session were persisted.
        let key = store.get_key("testnet", "alice.faucet").unwrap().unwrap();
        assert_eq!(key.public_key, created.public_key);
        assert_eq!(key.seed_phrase, created.seed_phrase);
        let session = creator.session().unwrap().unwrap();
        assert_eq!(session.account_id, "alice.faucet");

        // Terminal state is Done with the refreshed count.
        assert_eq!(
            *states.borrow_and_update(),
            CreatorState::Done {
                account_id: "alice.faucet".to_string(),
                num_created_accounts: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_name_makes_no_network_call() {
        let faucet = Arc::new(FakeFaucet::new(SUFFIX, 8));
        let (creator, _store) = connect(Arc::clone(&faucet)).await;

        let err = creator.create_account("-bob").await.unwrap_err();
        assert!(matches!(err, CreateError::InvalidName(_)));
        assert_eq!(faucet.submission_count(), 0);
        assert_eq!(*creator.subscribe().borrow(), CreatorState::Idle);
    }

    #[tokio::test]
    async fn test_duplicate_account_fails_visibly() {
        let faucet = Arc::new(FakeFaucet::new(SUFFIX, 0));
        faucet.insert_existing("alice.faucet");
        let (creator, store) = connect(Arc::clone(&faucet)).await;

        let err = creator.create_account("alice").await.unwrap_err();
        assert!(matches!(err, CreateError::Rpc(RpcError::Rejected(_))));
        assert!(matches!(
            *creator.subscribe().borrow(),
            CreatorState::Failed { .. }
        ));
        // Nothing was persisted for the failed attempt.
        assert!(store.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_availability_probe() {
        let faucet = Arc::new(FakeFaucet::new(SUFFIX, 8));
        faucet.insert_existing("taken.faucet");
        let (creator, _store) = connect(faucet).await;

        assert_eq!(creator.check_availability("-bad").await, NameStatus::Invalid);
        assert_eq!(creator.check_availability("taken").await, NameStatus::Taken);
        assert_eq!(creator.check_availability("fresh").await, NameStatus::Available);
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_resets_state() {
        let faucet = Arc::new(FakeFaucet::new(SUFFIX, 0));
        let (creator, _store) = connect(faucet).await;

        creator.create_account("alice").await.unwrap();
        assert!(creator.session().unwrap().is_some());

        creator.logout().unwrap();
        assert!(creator.session().unwrap().is_none());
        assert_eq!(*creator.subscribe().borrow(), CreatorState::Idle);
    }

    #[tokio::test]
    async fn test_operator_key_seeded_once() {
        let faucet = Arc::new(FakeFaucet::new(SUFFIX, 8));
        let (creator, store) = connect(faucet).await;

        let first = StoredKey {
            public_key: PublicKey::new(crate::pow::KeyType::Ed25519, [1u8; 32]),
            seed_phrase: "operator phrase one".to_string(),
        };
        let second = StoredKey {
            public_key: PublicKey::new(crate::pow::KeyType::Ed25519, [2u8; 32]),
            seed_phrase: "operator phrase two".to_string(),
        };

        creator.ensure_operator_key("faucet", &first).unwrap();
        creator.ensure_operator_key("faucet", &second).unwrap();

        // The existing key wins.
        assert_eq!(store.get_key("testnet", "faucet").unwrap(), Some(first));
    }

    /// Starting attempt B while attempt A is mining must stop A's
    /// progress reporting for good.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_new_attempt_cancels_in_flight_mining() {
        // Difficulty high enough that attempt A cannot finish on its own.
        let faucet = Arc::new(FakeFaucet::new(SUFFIX, 48));
        let (creator, _store) = connect(faucet).await;

        let mut states = creator.subscribe();

        // Attempt A mines in the background.
        let creator_a = Arc::clone(&creator);
        let attempt_a =
            tokio::spawn(async move { creator_a.create_account("alice").await });

        // Wait until A is observably mining.
        loop {
            if matches!(
                &*states.borrow_and_update(),
                CreatorState::Mining { account_id, .. } if account_id == "alice.faucet"
            ) {
                break;
            }
            states.changed().await.unwrap();
        }

        // Attempt B supersedes A; cancel B itself via a third (invalid)
        // attempt so the test doesn't have to mine 48 bits either.
        let creator_b = Arc::clone(&creator);
        let attempt_b = tokio::spawn(async move { creator_b.create_account("bob").await });

        // Wait until B is observably mining, then record everything after.
        loop {
            if matches!(
                &*states.borrow_and_update(),
                CreatorState::Mining { account_id, .. } if account_id == "bob.faucet"
            ) {
                break;
            }
            states.changed().await.unwrap();
        }

        assert!(matches!(
            attempt_a.await.unwrap(),
            Err(CreateError::Superseded)
        ));

        // No stale A updates may appear once B is mining.
        let mut seen_after_b = Vec::new();
        let deadline = tokio::time::sleep(std::time::Duration::from_millis(100));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                changed = states.changed() => {
                    changed.unwrap();
                    seen_after_b.push(states.borrow_and_update().clone());
                }
                _ = &mut deadline => break,
            }
        }
        for state in &seen_after_b {
            if let CreatorState::Mining { account_id, .. } = state {
                assert_eq!(account_id, "bob.faucet", "stale attempt published progress");
            }
        }

        let _ = creator.create_account("-cancel-b").await;
        assert!(matches!(
            attempt_b.await.unwrap(),
            Err(CreateError::Superseded)
        ));
    }
}
