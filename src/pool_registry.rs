//! # Pool Compliance Registry Cache
//!
//! In-memory view of which liquidity pools are currently approved for
//! compliant trading, keyed by pool id and resynchronized from the on-chain
//! registry program.
//!
//! ## Freshness
//!
//! Entries never auto-expire on wall-clock time. The cache is exactly as
//! fresh as the last `sync_from_chain` call; callers that need a freshness
//! guarantee before a compliance-critical decision must resync explicitly.
//!
//! ## Concurrency
//!
//! The snapshot lives behind an `ArcSwap`, so readers are lock-free and a
//! resync is a single atomic replace, so concurrent readers never observe a
//! torn cache.

use crate::chain::{ChainClient, ChainError};
use crate::layouts::{decode_pool_entry, POOL_ENTRY_SPACE};
use crate::types::{PoolComplianceEntry, PoolStatus, Pubkey};
use arc_swap::ArcSwap;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

type Snapshot = HashMap<Pubkey, PoolComplianceEntry>;

/// Cache of on-chain pool compliance entries.
pub struct PoolComplianceRegistry {
    /// Program that owns `PoolComplianceEntry` accounts on chain.
    registry_program: Pubkey,
    entries: ArcSwap<Snapshot>,
    last_synced_slot: AtomicU64,
    last_synced_at: AtomicI64,
}

impl PoolComplianceRegistry {
    pub fn new(registry_program: Pubkey) -> Self {
        Self {
            registry_program,
            entries: ArcSwap::from_pointee(Snapshot::new()),
            last_synced_slot: AtomicU64::new(0),
            last_synced_at: AtomicI64::new(0),
        }
    }

    /// True only if a cached entry exists with status `Active`. Absent,
    /// `Suspended` and `Revoked` entries all resolve to false.
    pub fn is_approved(&self, pool_id: &Pubkey) -> bool {
        self.entries
            .load()
            .get(pool_id)
            .map(|e| e.status == PoolStatus::Active)
            .unwrap_or(false)
    }

    /// Cached entry for a pool, if any.
    pub fn entry(&self, pool_id: &Pubkey) -> Option<PoolComplianceEntry> {
        self.entries.load().get(pool_id).cloned()
    }

    /// Insert or replace a single entry locally.
    pub fn add_entry(&self, entry: PoolComplianceEntry) {
        self.entries.rcu(|snapshot| {
            let mut next = Snapshot::clone(snapshot);
            next.insert(entry.pool_id, entry.clone());
            next
        });
    }

    /// Remove a single entry locally. Returns true if it was present.
    pub fn remove_entry(&self, pool_id: &Pubkey) -> bool {
        let previous = self.entries.rcu(|snapshot| {
            let mut next = Snapshot::clone(snapshot);
            next.remove(pool_id);
            next
        });
        previous.contains_key(pool_id)
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    /// Pool ids currently approved (status `Active`).
    pub fn approved_pools(&self) -> Vec<Pubkey> {
        self.entries
            .load()
            .values()
            .filter(|e| e.status == PoolStatus::Active)
            .map(|e| e.pool_id)
            .collect()
    }

    /// Slot observed at the last successful sync (0 = never synced).
    pub fn last_synced_slot(&self) -> u64 {
        self.last_synced_slot.load(Ordering::Relaxed)
    }

    /// Unix timestamp of the last successful sync (0 = never synced).
    pub fn last_synced_at(&self) -> i64 {
        self.last_synced_at.load(Ordering::Relaxed)
    }

    /// Replace the cache from the on-chain registry program.
    ///
    /// Scans the program's accounts (size-filtered to entry accounts),
    /// decodes them, keeps the `Active` ones and atomically swaps in the new
    /// snapshot. Undecodable accounts are skipped with a warning; one
    /// corrupt account must not poison the whole registry. Returns the
    /// number of approved entries cached.
    pub async fn sync_from_chain(&self, chain: &dyn ChainClient) -> Result<usize, ChainError> {
        let slot = chain.slot().await?;
        let accounts = chain
            .get_program_accounts(&self.registry_program, Some(POOL_ENTRY_SPACE))
            .await?;
        let scanned = accounts.len();

        let mut next = Snapshot::new();
        for (address, account) in accounts {
            match decode_pool_entry(&account.data) {
                Some(entry) if entry.status == PoolStatus::Active => {
                    next.insert(entry.pool_id, entry);
                }
                Some(_) => {} // Suspended/Revoked: observed but not cached
                None => {
                    warn!("⚠️ Skipping undecodable registry account {}", address);
                }
            }
        }

        let count = next.len();
        self.entries.store(Arc::new(next));
        self.last_synced_slot.store(slot, Ordering::Relaxed);
        self.last_synced_at
            .store(chrono::Utc::now().timestamp(), Ordering::Relaxed);
        info!(
            "✅ Pool registry synced: {} approved of {} scanned (slot {})",
            count, scanned, slot
        );
        Ok(count)
    }
}
