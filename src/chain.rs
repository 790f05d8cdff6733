//! # Chain RPC Client
//!
//! Read-only access to on-chain account state: single-account reads by
//! derived deterministic address, and program-account scans used to hydrate
//! the pool compliance registry.
//!
//! The `ChainClient` trait is the seam tests mock; `RpcChainClient` is the
//! production JSON-RPC implementation. Every request carries an explicit
//! timeout, so a node that stops answering degrades to a typed error, never an
//! indefinite hang.

use crate::types::Pubkey;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Raw account contents as read from the chain node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub data: Vec<u8>,
    pub owner: Pubkey,
    pub lamports: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("RPC transport error: {0}")]
    Transport(String),
    #[error("RPC request timed out")]
    Timeout,
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChainError::Timeout
        } else {
            ChainError::Transport(e.to_string())
        }
    }
}

/// Read-only chain access used by the compliance caches.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch a single account; `None` when the account does not exist.
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountData>, ChainError>;

    /// Scan all accounts owned by `program`, optionally filtered to an exact
    /// data size (registry entries are fixed-size, so the filter keeps the
    /// scan cheap).
    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        data_size: Option<u64>,
    ) -> Result<Vec<(Pubkey, AccountData)>, ChainError>;

    /// Current chain slot, recorded by the registry at sync time.
    async fn slot(&self) -> Result<u64, ChainError>;
}

/// Derive a deterministic account address from seed byte-strings and the
/// owning program id. Same inputs always yield the same address.
pub fn derive_address(seeds: &[&[u8]], program_id: &Pubkey) -> Pubkey {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(b"MeridianDerivedAddress");
    Pubkey::new(hasher.finalize().into())
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcAccount {
    /// `[base64_payload, "base64"]` tuple from the node.
    data: (String, String),
    owner: Pubkey,
    lamports: u64,
}

#[derive(Debug, Deserialize)]
struct RpcKeyedAccount {
    pubkey: Pubkey,
    account: RpcAccount,
}

impl RpcAccount {
    fn into_account_data(self) -> Result<AccountData, ChainError> {
        if self.data.1 != "base64" {
            return Err(ChainError::InvalidResponse(format!(
                "unexpected account encoding: {}",
                self.data.1
            )));
        }
        let data = BASE64
            .decode(self.data.0.as_bytes())
            .map_err(|e| ChainError::InvalidResponse(format!("bad base64 account data: {}", e)))?;
        Ok(AccountData {
            data,
            owner: self.owner,
            lamports: self.lamports,
        })
    }
}

/// JSON-RPC chain client over HTTP.
pub struct RpcChainClient {
    http: reqwest::Client,
    url: String,
    request_id: AtomicU64,
}

impl RpcChainClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("chain rpc call id={} method={}", id, method);
        let response = self.http.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Transport(format!(
                "HTTP {} from chain node",
                status.as_u16()
            )));
        }
        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
        if let Some(err) = envelope.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| ChainError::InvalidResponse("missing result field".to_string()))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountData>, ChainError> {
        let result = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), {"encoding": "base64"}]),
            )
            .await?;
        let value = result
            .get("value")
            .ok_or_else(|| ChainError::InvalidResponse("missing value field".to_string()))?;
        if value.is_null() {
            return Ok(None);
        }
        let account: RpcAccount = serde_json::from_value(value.clone())
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
        Ok(Some(account.into_account_data()?))
    }

    async fn get_program_accounts(
        &self,
        program: &Pubkey,
        data_size: Option<u64>,
    ) -> Result<Vec<(Pubkey, AccountData)>, ChainError> {
        let mut options = json!({"encoding": "base64"});
        if let Some(size) = data_size {
            options["filters"] = json!([{"dataSize": size}]);
        }
        let result = self
            .call("getProgramAccounts", json!([program.to_string(), options]))
            .await?;
        let keyed: Vec<RpcKeyedAccount> = serde_json::from_value(result)
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
        let mut accounts = Vec::with_capacity(keyed.len());
        for entry in keyed {
            accounts.push((entry.pubkey, entry.account.into_account_data()?));
        }
        Ok(accounts)
    }

    async fn slot(&self) -> Result<u64, ChainError> {
        let result = self.call("getSlot", json!([])).await?;
        result
            .as_u64()
            .ok_or_else(|| ChainError::InvalidResponse("slot is not a u64".to_string()))
    }
}
