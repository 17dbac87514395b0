//! RPC client for the faucet service.
//!
//! The remote ledger is modeled as three capabilities: fetch the immutable
//! faucet configuration, probe whether an account id already exists, and
//! submit a mined account creation. Core logic only ever sees the
//! [`FaucetRpc`] trait, so everything above this module is testable against
//! the in-process [`testing::FakeFaucet`] without a live network.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod testing;

/// Default faucet service endpoint.
pub const DEFAULT_FAUCET_URL: &str = "https://faucet.testnet.near.org";

#[derive(Error, Debug)]
pub enum RpcError {
    /// The request never completed: DNS, connection, timeout, or a server
    /// error. Safe to retry the whole attempt.
    #[error("faucet request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The faucet understood the request and said no (duplicate account,
    /// weak proof). The generated key and salt must be discarded.
    #[error("faucet rejected the request: {0}")]
    Rejected(String),
}

/// Immutable faucet parameters, fetched once per process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetConfig {
    /// Fixed suffix appended to every requested local name.
    pub account_suffix: String,
    /// Required leading zero bits in the proof-of-work digest.
    pub min_difficulty: u32,
}

/// Payload of the account creation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountArgs {
    pub account_id: String,
    /// Tag-prefixed key bytes: one algorithm byte, then the raw key.
    pub public_key: Vec<u8>,
    pub salt: u64,
}

/// The remote ledger service, as seen by the orchestrator.
#[async_trait]
pub trait FaucetRpc: Send + Sync {
    /// Fetch the account suffix and minimum difficulty.
    async fn fetch_config(&self) -> Result<FaucetConfig, RpcError>;

    /// Number of accounts this faucet has created so far.
    async fn num_created_accounts(&self) -> Result<u64, RpcError>;

    /// Existence probe. Absence of the account is the "name available"
    /// signal, not an error.
    async fn account_exists(&self, account_id: &str) -> Result<bool, RpcError>;

    /// Submit a mined account creation.
    async fn create_account(&self, args: &CreateAccountArgs) -> Result<(), RpcError>;
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    num_created_accounts: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
}

/// HTTP implementation of [`FaucetRpc`] against the faucet's REST bridge.
pub struct HttpFaucetClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpFaucetClient {
    /// Client against the default endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_FAUCET_URL)
    }

    /// Client against a custom endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }
}

impl Default for HttpFaucetClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaucetRpc for HttpFaucetClient {
    async fn fetch_config(&self) -> Result<FaucetConfig, RpcError> {
        let config: FaucetConfig = self
            .http
            .get(self.url("config"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(
            suffix = %config.account_suffix,
            min_difficulty = config.min_difficulty,
            "fetched faucet config"
        );
        Ok(config)
    }

    async fn num_created_accounts(&self) -> Result<u64, RpcError> {
        let stats: StatsResponse = self
            .http
            .get(self.url("stats"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(stats.num_created_accounts)
    }

    async fn account_exists(&self, account_id: &str) -> Result<bool, RpcError> {
        let resp = self
            .http
            .get(self.url(&format!("accounts/{account_id}")))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        resp.error_for_status()?;
        Ok(true)
    }

    async fn create_account(&self, args: &CreateAccountArgs) -> Result<(), RpcError> {
        debug!(account_id = %args.account_id, salt = args.salt, "submitting account creation");
        let resp = self
            .http
            .post(self.url("accounts"))
            .json(args)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status.is_client_error() {
            let message = resp
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(RpcError::Rejected(message));
        }
        resp.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = HttpFaucetClient::with_base_url("https://example.org///");
        assert_eq!(client.url("config"), "https://example.org/v1/config");
    }

    #[test]
    fn test_create_args_serialization() {
        let args = CreateAccountArgs {
            account_id: "alice.faucet".to_string(),
            public_key: vec![0, 1, 2, 3],
            salt: 89_949,
        };
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["account_id"], "alice.faucet");
        assert_eq!(json["public_key"][0], 0);
        assert_eq!(json["salt"], 89_949);
    }
}
