//! # Core Types
//!
//! Shared domain types for the compliance routing layer: account addresses,
//! KYC/jurisdiction enums and the on-chain record shapes they appear in.
//!
//! All token amounts in this crate are `u64` base units. On-chain amounts
//! exceed the 53-bit float-safe range, so nothing on the numeric path is ever
//! represented as `f64` (wire encodings use decimal strings, see `aggregator`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Seconds in one daily-limit accounting window.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// A 32-byte on-chain account address, rendered as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    pub const LEN: usize = 32;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParsePubkeyError {
    #[error("Invalid base58: {0}")]
    InvalidBase58(String),
    #[error("Invalid length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for Pubkey {
    type Err = ParsePubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s)
            .into_vec()
            .map_err(|e| ParsePubkeyError::InvalidBase58(e.to_string()))?;
        let bytes: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| ParsePubkeyError::InvalidLength(decoded.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Render a pool id list for user-facing failure messages.
pub fn format_pubkeys(keys: &[Pubkey]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// KYC verification levels, ordered by strength (ordinal 0..3 on chain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KycLevel {
    /// Basic verification (email, phone)
    Basic,
    /// Standard verification (ID document)
    Standard,
    /// Enhanced verification (video call, address proof)
    Enhanced,
    /// Institutional (corporate KYC/KYB)
    Institutional,
}

impl KycLevel {
    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Basic),
            1 => Some(Self::Standard),
            2 => Some(Self::Enhanced),
            3 => Some(Self::Institutional),
            _ => None,
        }
    }

    pub fn ordinal(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for KycLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KycLevel::Basic => write!(f, "Basic"),
            KycLevel::Standard => write!(f, "Standard"),
            KycLevel::Enhanced => write!(f, "Enhanced"),
            KycLevel::Institutional => write!(f, "Institutional"),
        }
    }
}

/// Supported jurisdictions. The ordinal doubles as the bit position in
/// jurisdiction bitmasks (`1 << ordinal`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    /// Japan (primary market)
    Japan,
    Singapore,
    HongKong,
    Eu,
    /// USA (restricted)
    Usa,
    Other,
}

impl Jurisdiction {
    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Japan),
            1 => Some(Self::Singapore),
            2 => Some(Self::HongKong),
            3 => Some(Self::Eu),
            4 => Some(Self::Usa),
            5 => Some(Self::Other),
            _ => None,
        }
    }

    /// Bitmask bit for this jurisdiction.
    pub fn bit(&self) -> u8 {
        1 << (*self as u8)
    }

    /// True if this jurisdiction's bit is set in `bitmask`.
    pub fn allowed_by(&self, bitmask: u8) -> bool {
        bitmask & self.bit() != 0
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Jurisdiction::Japan => write!(f, "Japan"),
            Jurisdiction::Singapore => write!(f, "Singapore"),
            Jurisdiction::HongKong => write!(f, "HongKong"),
            Jurisdiction::Eu => write!(f, "EU"),
            Jurisdiction::Usa => write!(f, "USA"),
            Jurisdiction::Other => write!(f, "Other"),
        }
    }
}

/// Pool compliance status lifecycle. Transitions happen on chain; this crate
/// only observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolStatus {
    Active,
    Suspended,
    Revoked,
}

impl PoolStatus {
    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Active),
            1 => Some(Self::Suspended),
            2 => Some(Self::Revoked),
            _ => None,
        }
    }
}

/// A trader's on-chain KYC/whitelist record, read-only from this crate.
///
/// `kyc_hash` is an opaque commitment to off-chain KYC data; raw PII never
/// appears on chain or in this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycRecord {
    pub subject_wallet: Pubkey,
    pub registry_id: Pubkey,
    pub kyc_level: KycLevel,
    pub jurisdiction: Jurisdiction,
    pub kyc_hash: [u8; 32],
    pub is_active: bool,
    /// Daily transaction limit in base units (0 = unlimited).
    pub daily_limit: u64,
    pub daily_volume: u64,
    pub volume_reset_at: i64,
    pub verified_at: i64,
    /// Expiry timestamp; 0 means the record never expires.
    pub expiry_at: i64,
    pub last_activity_at: i64,
}

impl KycRecord {
    /// True while the record is active and unexpired at `now`.
    pub fn is_usable(&self, now: i64) -> bool {
        self.is_active && (self.expiry_at == 0 || now <= self.expiry_at)
    }

    /// Daily volume counted against the limit at `now`, honoring the reset
    /// window.
    pub fn effective_daily_volume(&self, now: i64) -> u64 {
        if now - self.volume_reset_at >= SECONDS_PER_DAY {
            0
        } else {
            self.daily_volume
        }
    }

    /// Remaining headroom under the daily limit; `None` when unlimited.
    pub fn remaining_daily_limit(&self, now: i64) -> Option<u64> {
        if self.daily_limit == 0 {
            return None;
        }
        Some(
            self.daily_limit
                .saturating_sub(self.effective_daily_volume(now)),
        )
    }

    /// True if a trade of `amount` fits within the record's daily limit.
    pub fn can_trade(&self, amount: u64, now: i64) -> bool {
        if !self.is_usable(now) {
            return false;
        }
        match self.remaining_daily_limit(now) {
            None => true,
            Some(remaining) => amount <= remaining,
        }
    }
}

/// One pool's compliance entry, hydrated from the on-chain registry program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolComplianceEntry {
    pub pool_id: Pubkey,
    pub registry_id: Pubkey,
    pub operator: Pubkey,
    /// DEX label, e.g. "Raydium" or "Orca".
    pub venue_label: String,
    pub status: PoolStatus,
    pub allowed_jurisdiction: Jurisdiction,
    pub min_kyc_level: KycLevel,
    /// Hash of the most recent compliance audit report.
    pub audit_hash: [u8; 32],
    pub audit_expiry: i64,
    pub registered_at: i64,
    pub updated_at: i64,
}
