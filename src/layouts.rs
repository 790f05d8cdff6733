//! # On-Chain Account Layouts
//!
//! Fixed little-endian byte layouts for the two account types this crate
//! reads, and fail-closed decoders for them. A short buffer, a wrong leading
//! tag, or an out-of-range enum ordinal all decode to `None`; malformed
//! chain data is treated as "record absent", never a panic.
//!
//! Both layouts follow the registry programs' account convention: an 8-byte
//! discriminator tag (first 8 bytes of `sha256("account:<Name>")`), then the
//! struct fields packed tightly in declaration order. Integers are
//! little-endian fixed width, booleans are single bytes, enums are single-byte
//! ordinals, strings are u32-length-prefixed UTF-8. Accounts are allocated at
//! the maximum serialized size, so decoded content may be followed by zero
//! padding.
//!
//! ## `WhitelistEntry` (156 bytes)
//!
//! | offset | width | field              |
//! |--------|-------|--------------------|
//! | 0      | 8     | discriminator      |
//! | 8      | 32    | wallet             |
//! | 40     | 32    | registry           |
//! | 72     | 1     | kyc_level          |
//! | 73     | 1     | jurisdiction       |
//! | 74     | 32    | kyc_hash           |
//! | 106    | 1     | is_active          |
//! | 107    | 8     | daily_limit        |
//! | 115    | 8     | daily_volume       |
//! | 123    | 8     | volume_reset_time  |
//! | 131    | 8     | verified_at        |
//! | 139    | 8     | expiry_timestamp   |
//! | 147    | 8     | last_activity      |
//! | 155    | 1     | bump               |
//!
//! ## `PoolComplianceEntry` (200 bytes allocated)
//!
//! Fields in order: discriminator (8), amm_key (32), registry (32), operator
//! (32), dex_label (4 + up to 32), status (1), jurisdiction (1), kyc_level
//! (1), audit_hash (32), audit_expiry (8), registered_at (8), updated_at (8),
//! bump (1).

use crate::types::{Jurisdiction, KycLevel, KycRecord, PoolComplianceEntry, PoolStatus, Pubkey};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

/// Seed prefix for whitelist entry address derivation.
pub const WHITELIST_SEED: &[u8] = b"whitelist";
/// Seed prefix for pool entry address derivation.
pub const POOL_ENTRY_SEED: &[u8] = b"pool_entry";

/// Allocated size of a `WhitelistEntry` account.
pub const WHITELIST_ENTRY_SPACE: u64 = 156;
/// Allocated size of a `PoolComplianceEntry` account.
pub const POOL_ENTRY_SPACE: u64 = 200;

/// Maximum encoded length of a pool's DEX label.
pub const MAX_VENUE_LABEL_LEN: u32 = 32;

fn account_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("account:{}", name).as_bytes());
    let mut tag = [0u8; 8];
    tag.copy_from_slice(&digest[..8]);
    tag
}

/// Leading tag of `WhitelistEntry` accounts.
pub static WHITELIST_ENTRY_DISCRIMINATOR: Lazy<[u8; 8]> =
    Lazy::new(|| account_discriminator("WhitelistEntry"));

/// Leading tag of `PoolComplianceEntry` accounts.
pub static POOL_ENTRY_DISCRIMINATOR: Lazy<[u8; 8]> =
    Lazy::new(|| account_discriminator("PoolComplianceEntry"));

/// Sequential little-endian reader. Every accessor returns `None` on
/// underrun, so decoders compose with `?` and fail closed.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.data.len() {
            return None;
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Some(slice)
    }

    fn u8(&mut self) -> Option<u8> {
        Some(self.take(1)?[0])
    }

    fn bool(&mut self) -> Option<bool> {
        // Single-byte boolean; anything other than 0/1 is malformed.
        match self.u8()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }

    fn u32_le(&mut self) -> Option<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    fn u64_le(&mut self) -> Option<u64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    fn i64_le(&mut self) -> Option<i64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().ok()?;
        Some(i64::from_le_bytes(bytes))
    }

    fn bytes32(&mut self) -> Option<[u8; 32]> {
        self.take(32)?.try_into().ok()
    }

    fn pubkey(&mut self) -> Option<Pubkey> {
        Some(Pubkey::new(self.bytes32()?))
    }

    fn string(&mut self, max_len: u32) -> Option<String> {
        let len = self.u32_le()?;
        if len > max_len {
            return None;
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).ok()
    }
}

fn check_discriminator(cursor: &mut Cursor<'_>, expected: &[u8; 8]) -> Option<()> {
    let tag = cursor.take(8)?;
    if tag == expected {
        Some(())
    } else {
        None
    }
}

/// Decode a `WhitelistEntry` account into a [`KycRecord`]. Fails closed.
pub fn decode_whitelist_entry(data: &[u8]) -> Option<KycRecord> {
    let mut cursor = Cursor::new(data);
    check_discriminator(&mut cursor, &WHITELIST_ENTRY_DISCRIMINATOR)?;
    let record = KycRecord {
        subject_wallet: cursor.pubkey()?,
        registry_id: cursor.pubkey()?,
        kyc_level: KycLevel::from_ordinal(cursor.u8()?)?,
        jurisdiction: Jurisdiction::from_ordinal(cursor.u8()?)?,
        kyc_hash: cursor.bytes32()?,
        is_active: cursor.bool()?,
        daily_limit: cursor.u64_le()?,
        daily_volume: cursor.u64_le()?,
        volume_reset_at: cursor.i64_le()?,
        verified_at: cursor.i64_le()?,
        expiry_at: cursor.i64_le()?,
        last_activity_at: cursor.i64_le()?,
    };
    cursor.u8()?; // bump
    Some(record)
}

/// Decode a `PoolComplianceEntry` account. Fails closed.
pub fn decode_pool_entry(data: &[u8]) -> Option<PoolComplianceEntry> {
    let mut cursor = Cursor::new(data);
    check_discriminator(&mut cursor, &POOL_ENTRY_DISCRIMINATOR)?;
    let entry = PoolComplianceEntry {
        pool_id: cursor.pubkey()?,
        registry_id: cursor.pubkey()?,
        operator: cursor.pubkey()?,
        venue_label: cursor.string(MAX_VENUE_LABEL_LEN)?,
        status: PoolStatus::from_ordinal(cursor.u8()?)?,
        allowed_jurisdiction: Jurisdiction::from_ordinal(cursor.u8()?)?,
        min_kyc_level: KycLevel::from_ordinal(cursor.u8()?)?,
        audit_hash: cursor.bytes32()?,
        audit_expiry: cursor.i64_le()?,
        registered_at: cursor.i64_le()?,
        updated_at: cursor.i64_le()?,
    };
    cursor.u8()?; // bump
    Some(entry)
}

/// Test-facing encoders for the documented layouts. Production code never
/// writes these accounts; the encoders exist so tests and fixtures can build
/// byte-exact account images.
pub mod encode {
    use super::*;

    pub fn whitelist_entry(record: &KycRecord, bump: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(WHITELIST_ENTRY_SPACE as usize);
        out.extend_from_slice(&*WHITELIST_ENTRY_DISCRIMINATOR);
        out.extend_from_slice(record.subject_wallet.as_bytes());
        out.extend_from_slice(record.registry_id.as_bytes());
        out.push(record.kyc_level.ordinal());
        out.push(record.jurisdiction as u8);
        out.extend_from_slice(&record.kyc_hash);
        out.push(record.is_active as u8);
        out.extend_from_slice(&record.daily_limit.to_le_bytes());
        out.extend_from_slice(&record.daily_volume.to_le_bytes());
        out.extend_from_slice(&record.volume_reset_at.to_le_bytes());
        out.extend_from_slice(&record.verified_at.to_le_bytes());
        out.extend_from_slice(&record.expiry_at.to_le_bytes());
        out.extend_from_slice(&record.last_activity_at.to_le_bytes());
        out.push(bump);
        out
    }

    pub fn pool_entry(entry: &PoolComplianceEntry, bump: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(POOL_ENTRY_SPACE as usize);
        out.extend_from_slice(&*POOL_ENTRY_DISCRIMINATOR);
        out.extend_from_slice(entry.pool_id.as_bytes());
        out.extend_from_slice(entry.registry_id.as_bytes());
        out.extend_from_slice(entry.operator.as_bytes());
        out.extend_from_slice(&(entry.venue_label.len() as u32).to_le_bytes());
        out.extend_from_slice(entry.venue_label.as_bytes());
        out.push(match entry.status {
            PoolStatus::Active => 0,
            PoolStatus::Suspended => 1,
            PoolStatus::Revoked => 2,
        });
        out.push(entry.allowed_jurisdiction as u8);
        out.push(entry.min_kyc_level.ordinal());
        out.extend_from_slice(&entry.audit_hash);
        out.extend_from_slice(&entry.audit_expiry.to_le_bytes());
        out.extend_from_slice(&entry.registered_at.to_le_bytes());
        out.extend_from_slice(&entry.updated_at.to_le_bytes());
        out.push(bump);
        // Pad to the allocated account size.
        out.resize(POOL_ENTRY_SPACE as usize, 0);
        out
    }
}
