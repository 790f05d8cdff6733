//! # Route Compliance Filter
//!
//! Cross-references a quoted route's hops against the pool compliance
//! registry. A route is compliant iff every hop's pool resolves to an
//! `Active` registry entry. Partial compliance is never accepted, so the
//! filter returns either the full original quote or nothing.

use crate::aggregator::SwapQuote;
use crate::pool_registry::PoolComplianceRegistry;
use crate::types::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-route compliance partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteComplianceResult {
    pub is_compliant: bool,
    pub compliant_pool_ids: Vec<Pubkey>,
    pub non_compliant_pool_ids: Vec<Pubkey>,
}

/// Validates quotes against a [`PoolComplianceRegistry`].
pub struct RouteComplianceFilter {
    registry: Arc<PoolComplianceRegistry>,
}

impl RouteComplianceFilter {
    pub fn new(registry: Arc<PoolComplianceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PoolComplianceRegistry {
        &self.registry
    }

    /// Partition the quote's hop pools into compliant and non-compliant
    /// sets. An empty hop list is vacuously compliant.
    pub fn check_route_compliance(&self, quote: &SwapQuote) -> RouteComplianceResult {
        let mut compliant = Vec::new();
        let mut non_compliant = Vec::new();
        for hop in &quote.hops {
            if self.registry.is_approved(&hop.pool_id) {
                compliant.push(hop.pool_id);
            } else {
                non_compliant.push(hop.pool_id);
            }
        }
        RouteComplianceResult {
            is_compliant: non_compliant.is_empty(),
            compliant_pool_ids: compliant,
            non_compliant_pool_ids: non_compliant,
        }
    }

    /// Return the quote unchanged when fully compliant, `None` otherwise.
    /// Never returns a truncated route.
    pub fn filter_to_compliant_quote(&self, quote: SwapQuote) -> Option<SwapQuote> {
        if self.check_route_compliance(&quote).is_compliant {
            Some(quote)
        } else {
            None
        }
    }

    /// Bulk approval lookup for reporting/UI use.
    pub fn batch_check(&self, pool_ids: &[Pubkey]) -> HashMap<Pubkey, bool> {
        pool_ids
            .iter()
            .map(|id| (*id, self.registry.is_approved(id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::RouteHop;
    use crate::types::{Jurisdiction, KycLevel, PoolComplianceEntry, PoolStatus};
    use rust_decimal::Decimal;

    fn entry(pool: Pubkey, status: PoolStatus) -> PoolComplianceEntry {
        PoolComplianceEntry {
            pool_id: pool,
            registry_id: Pubkey::new([50u8; 32]),
            operator: Pubkey::new([51u8; 32]),
            venue_label: "Raydium".to_string(),
            status,
            allowed_jurisdiction: Jurisdiction::Japan,
            min_kyc_level: KycLevel::Standard,
            audit_hash: [0u8; 32],
            audit_expiry: 2_000_000_000,
            registered_at: 0,
            updated_at: 0,
        }
    }

    fn hop(pool: Pubkey) -> RouteHop {
        RouteHop {
            pool_id: pool,
            venue_label: "Raydium".to_string(),
            input_mint: Pubkey::new([1u8; 32]),
            output_mint: Pubkey::new([2u8; 32]),
            in_amount: 1_000_000,
            out_amount: 990_000,
            fee_amount: 100,
        }
    }

    fn quote_with_hops(hops: Vec<RouteHop>) -> SwapQuote {
        SwapQuote {
            input_mint: Pubkey::new([1u8; 32]),
            output_mint: Pubkey::new([2u8; 32]),
            in_amount: 1_000_000,
            out_amount: 990_000,
            other_amount_threshold: 985_000,
            price_impact_pct: Decimal::new(5, 2),
            hops,
            context_slot: 1,
        }
    }

    fn filter_with(entries: Vec<PoolComplianceEntry>) -> RouteComplianceFilter {
        let registry = Arc::new(PoolComplianceRegistry::new(Pubkey::new([99u8; 32])));
        for e in entries {
            registry.add_entry(e);
        }
        RouteComplianceFilter::new(registry)
    }

    #[test]
    fn test_partition_of_mixed_route() {
        let good = Pubkey::new([10u8; 32]);
        let bad = Pubkey::new([11u8; 32]);
        let filter = filter_with(vec![entry(good, PoolStatus::Active)]);
        let quote = quote_with_hops(vec![hop(good), hop(bad)]);

        let result = filter.check_route_compliance(&quote);
        assert!(!result.is_compliant);
        assert_eq!(result.compliant_pool_ids, vec![good]);
        assert_eq!(result.non_compliant_pool_ids, vec![bad]);
    }

    #[test]
    fn test_empty_route_vacuously_compliant() {
        let filter = filter_with(vec![]);
        let result = filter.check_route_compliance(&quote_with_hops(vec![]));
        assert!(result.is_compliant);
        assert!(result.compliant_pool_ids.is_empty());
        assert!(result.non_compliant_pool_ids.is_empty());
    }

    #[test]
    fn test_registry_membership_flips_exactly_one_hop() {
        let a = Pubkey::new([10u8; 32]);
        let b = Pubkey::new([11u8; 32]);
        let filter = filter_with(vec![
            entry(a, PoolStatus::Active),
            entry(b, PoolStatus::Active),
        ]);
        let quote = quote_with_hops(vec![hop(a), hop(b)]);
        assert!(filter.check_route_compliance(&quote).is_compliant);

        // Removing pool b flips only b's compliance bit.
        filter.registry().remove_entry(&b);
        let result = filter.check_route_compliance(&quote);
        assert_eq!(result.compliant_pool_ids, vec![a]);
        assert_eq!(result.non_compliant_pool_ids, vec![b]);

        // Re-adding restores full compliance.
        filter.registry().add_entry(entry(b, PoolStatus::Active));
        assert!(filter.check_route_compliance(&quote).is_compliant);
    }

    #[test]
    fn test_filter_is_identity_on_compliant_quote() {
        let a = Pubkey::new([10u8; 32]);
        let filter = filter_with(vec![entry(a, PoolStatus::Active)]);
        let quote = quote_with_hops(vec![hop(a)]);

        let once = filter.filter_to_compliant_quote(quote.clone()).unwrap();
        assert_eq!(once, quote);
        // Idempotent: filtering the filtered quote changes nothing.
        let twice = filter.filter_to_compliant_quote(once.clone()).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_filter_never_returns_partial_route() {
        let good = Pubkey::new([10u8; 32]);
        let bad = Pubkey::new([11u8; 32]);
        let filter = filter_with(vec![entry(good, PoolStatus::Active)]);
        let quote = quote_with_hops(vec![hop(good), hop(bad)]);

        // One bad hop kills the whole quote; no truncated subset comes back.
        assert_eq!(filter.filter_to_compliant_quote(quote), None);
    }

    #[test]
    fn test_suspended_pool_is_non_compliant() {
        let a = Pubkey::new([10u8; 32]);
        let filter = filter_with(vec![entry(a, PoolStatus::Suspended)]);
        let quote = quote_with_hops(vec![hop(a)]);
        assert!(!filter.check_route_compliance(&quote).is_compliant);
    }

    #[test]
    fn test_batch_check() {
        let a = Pubkey::new([10u8; 32]);
        let b = Pubkey::new([11u8; 32]);
        let c = Pubkey::new([12u8; 32]);
        let filter = filter_with(vec![
            entry(a, PoolStatus::Active),
            entry(b, PoolStatus::Revoked),
        ]);
        let result = filter.batch_check(&[a, b, c]);
        assert_eq!(result.get(&a), Some(&true));
        assert_eq!(result.get(&b), Some(&false));
        assert_eq!(result.get(&c), Some(&false));
    }
}
