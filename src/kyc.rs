//! # KYC Compliance Checker
//!
//! Resolves a trader's on-chain KYC/whitelist record and evaluates it
//! against a trading policy (minimum level, allowed jurisdictions,
//! activity/expiry).
//!
//! ## Caching
//!
//! Records are cached per wallet after the first chain fetch, including
//! negative lookups ("no record"). The cache never expires on its own;
//! invalidate explicitly via `invalidate`/`invalidate_all` when a record is
//! known to have changed on chain.
//!
//! ## Policy evaluation
//!
//! `evaluate_policy` is a total function of `(record, min_level, bitmask,
//! now)`: the same inputs always produce the same result, and exactly one
//! rejection reason (or "compliant") is reported, checked in a fixed order.

use crate::chain::{derive_address, ChainClient, ChainError};
use crate::layouts::{decode_whitelist_entry, WHITELIST_SEED};
use crate::types::{KycRecord, KycLevel, Pubkey};
use dashmap::DashMap;
use log::{debug, info};
use std::sync::Arc;

/// Outcome of a policy check. `record` is attached for diagnostics whenever
/// one was found, compliant or not.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceCheckResult {
    pub is_compliant: bool,
    pub reason: Option<String>,
    pub record: Option<KycRecord>,
}

impl ComplianceCheckResult {
    fn compliant(record: KycRecord) -> Self {
        Self {
            is_compliant: true,
            reason: None,
            record: Some(record),
        }
    }

    fn rejected(reason: impl Into<String>, record: Option<KycRecord>) -> Self {
        Self {
            is_compliant: false,
            reason: Some(reason.into()),
            record,
        }
    }
}

/// Evaluate a (possibly absent) KYC record against a policy. Pure: no I/O,
/// no clock reads; `now` is an input. Rejections are checked in order and
/// the first applicable one wins.
pub fn evaluate_policy(
    record: Option<&KycRecord>,
    min_level: KycLevel,
    allowed_jurisdictions: u8,
    now: i64,
) -> ComplianceCheckResult {
    let record = match record {
        Some(r) => r,
        None => return ComplianceCheckResult::rejected("no KYC record", None),
    };
    if !record.is_active {
        return ComplianceCheckResult::rejected("KYC inactive", Some(record.clone()));
    }
    if record.expiry_at > 0 && now > record.expiry_at {
        return ComplianceCheckResult::rejected("KYC expired", Some(record.clone()));
    }
    if record.kyc_level < min_level {
        return ComplianceCheckResult::rejected(
            format!(
                "KYC level {} below required {}",
                record.kyc_level, min_level
            ),
            Some(record.clone()),
        );
    }
    if !record.jurisdiction.allowed_by(allowed_jurisdictions) {
        return ComplianceCheckResult::rejected(
            format!("jurisdiction {} not allowed", record.jurisdiction),
            Some(record.clone()),
        );
    }
    ComplianceCheckResult::compliant(record.clone())
}

/// Per-wallet KYC record resolver with explicit cache invalidation.
pub struct KycComplianceChecker {
    chain: Arc<dyn ChainClient>,
    /// KYC registry account the whitelist entries are derived under.
    kyc_registry: Pubkey,
    /// Program that owns the whitelist entry accounts.
    kyc_program: Pubkey,
    /// Cached lookups, including negative ones.
    cache: DashMap<Pubkey, Option<KycRecord>>,
}

impl KycComplianceChecker {
    pub fn new(chain: Arc<dyn ChainClient>, kyc_registry: Pubkey, kyc_program: Pubkey) -> Self {
        Self {
            chain,
            kyc_registry,
            kyc_program,
            cache: DashMap::new(),
        }
    }

    /// Deterministic whitelist entry address for a wallet.
    pub fn whitelist_address(&self, wallet: &Pubkey) -> Pubkey {
        derive_address(
            &[
                WHITELIST_SEED,
                self.kyc_registry.as_bytes(),
                wallet.as_bytes(),
            ],
            &self.kyc_program,
        )
    }

    /// Fetch (or recall) a wallet's KYC record. Malformed account data
    /// decodes as "no record", never an error.
    pub async fn get_record(&self, wallet: &Pubkey) -> Result<Option<KycRecord>, ChainError> {
        if let Some(cached) = self.cache.get(wallet) {
            return Ok(cached.clone());
        }
        let address = self.whitelist_address(wallet);
        let record = match self.chain.get_account(&address).await? {
            Some(account) => {
                let decoded = decode_whitelist_entry(&account.data);
                if decoded.is_none() {
                    debug!("malformed whitelist entry at {} treated as absent", address);
                }
                decoded
            }
            None => None,
        };
        self.cache.insert(*wallet, record.clone());
        Ok(record)
    }

    /// Drop one wallet's cached record.
    pub fn invalidate(&self, wallet: &Pubkey) {
        self.cache.remove(wallet);
    }

    /// Drop the whole cache.
    pub fn invalidate_all(&self) {
        let size = self.cache.len();
        self.cache.clear();
        info!("KYC cache invalidated ({} entries dropped)", size);
    }

    /// Resolve the wallet's record and evaluate it against the policy at the
    /// current wall clock.
    pub async fn check_policy(
        &self,
        wallet: &Pubkey,
        min_level: KycLevel,
        allowed_jurisdictions: u8,
    ) -> Result<ComplianceCheckResult, ChainError> {
        let record = self.get_record(wallet).await?;
        let now = chrono::Utc::now().timestamp();
        Ok(evaluate_policy(
            record.as_ref(),
            min_level,
            allowed_jurisdictions,
            now,
        ))
    }
}
