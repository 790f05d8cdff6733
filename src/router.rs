//! # Compliance-Aware Router
//!
//! Orchestrates the KYC gate, the aggregator client and the route filter
//! into a single "get a compliant quote" operation with an explicit state
//! machine:
//!
//! ```text
//! CheckingKyc -> FetchingQuote -> ValidatingRoute -> Done
//!                                       |
//!                                       v
//!                             FallbackFetch -> FallbackValidate -> Done | Failed
//! ```
//!
//! The KYC gate runs exactly once per invocation and is terminal on failure:
//! an unverified trader never receives any route, compliant or not. A route
//! that fails pool validation is retried once as a direct-only quote when
//! fallback is enabled; the final failure lists the non-compliant pools from
//! the original multi-hop check.

use crate::aggregator::{QuoteRequest, QuoteSource, SwapQuote};
use crate::errors::RoutingError;
use crate::kyc::KycComplianceChecker;
use crate::route_filter::RouteComplianceFilter;
use crate::types::{format_pubkeys, Jurisdiction, KycLevel, Pubkey};
use log::{debug, info, warn};
use std::sync::Arc;

/// The externally visible success artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct CompliantQuoteResult {
    pub quote: SwapQuote,
    pub was_fallback_used: bool,
    pub compliant_hop_count: usize,
    pub trader_kyc_level: KycLevel,
    pub trader_jurisdiction: Jurisdiction,
}

/// Caller-supplied trading policy for the KYC gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradePolicy {
    pub min_kyc_level: KycLevel,
    /// Bitmask of allowed jurisdictions (`1 << jurisdiction`).
    pub allowed_jurisdictions: u8,
}

/// Router behavior knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Retry a non-compliant route with a direct-only quote.
    pub enable_fallback: bool,
    /// Reject routes with more hops than this before the registry check.
    pub max_route_hops: Option<u8>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enable_fallback: true,
            max_route_hops: None,
        }
    }
}

#[derive(Clone, Copy)]
struct TraderInfo {
    kyc_level: KycLevel,
    jurisdiction: Jurisdiction,
}

/// Routing state machine. Data-carrying variants make every transition and
/// terminal state explicit.
enum RoutingStage {
    CheckingKyc,
    FetchingQuote(TraderInfo),
    ValidatingRoute(TraderInfo, SwapQuote),
    FallbackFetch(TraderInfo, Vec<Pubkey>),
    FallbackValidate(TraderInfo, SwapQuote, Vec<Pubkey>),
    Done(CompliantQuoteResult),
    Failed(RoutingError),
}

impl RoutingStage {
    fn name(&self) -> &'static str {
        match self {
            RoutingStage::CheckingKyc => "CheckingKyc",
            RoutingStage::FetchingQuote(_) => "FetchingQuote",
            RoutingStage::ValidatingRoute(..) => "ValidatingRoute",
            RoutingStage::FallbackFetch(..) => "FallbackFetch",
            RoutingStage::FallbackValidate(..) => "FallbackValidate",
            RoutingStage::Done(_) => "Done",
            RoutingStage::Failed(_) => "Failed",
        }
    }
}

/// Orchestrator for compliant quote requests.
pub struct ComplianceAwareRouter {
    kyc: Arc<KycComplianceChecker>,
    source: Arc<dyn QuoteSource>,
    filter: RouteComplianceFilter,
    config: RouterConfig,
}

impl ComplianceAwareRouter {
    pub fn new(
        kyc: Arc<KycComplianceChecker>,
        source: Arc<dyn QuoteSource>,
        filter: RouteComplianceFilter,
        config: RouterConfig,
    ) -> Self {
        Self {
            kyc,
            source,
            filter,
            config,
        }
    }

    pub fn filter(&self) -> &RouteComplianceFilter {
        &self.filter
    }

    pub fn kyc(&self) -> &KycComplianceChecker {
        &self.kyc
    }

    /// True when the quote respects the configured hop bound.
    fn within_hop_bound(&self, quote: &SwapQuote) -> bool {
        self.config
            .max_route_hops
            .map_or(true, |max| quote.hop_count() <= max as usize)
    }

    /// Run the full routing flow for one trade request.
    pub async fn get_compliant_quote(
        &self,
        wallet: &Pubkey,
        request: &QuoteRequest,
        policy: &TradePolicy,
    ) -> Result<CompliantQuoteResult, RoutingError> {
        let mut stage = RoutingStage::CheckingKyc;
        loop {
            debug!("routing stage {}", stage.name());
            stage = match stage {
                RoutingStage::CheckingKyc => {
                    let check = self
                        .kyc
                        .check_policy(wallet, policy.min_kyc_level, policy.allowed_jurisdictions)
                        .await?;
                    if !check.is_compliant {
                        let reason = check
                            .reason
                            .unwrap_or_else(|| "unspecified policy violation".to_string());
                        warn!("🔴 KYC gate rejected wallet {}: {}", wallet, reason);
                        RoutingStage::Failed(RoutingError::PolicyViolation { reason })
                    } else {
                        match check.record {
                            Some(record) => RoutingStage::FetchingQuote(TraderInfo {
                                kyc_level: record.kyc_level,
                                jurisdiction: record.jurisdiction,
                            }),
                            // A compliant result always carries its record;
                            // treat the impossible case as a policy failure.
                            None => RoutingStage::Failed(RoutingError::PolicyViolation {
                                reason: "no KYC record".to_string(),
                            }),
                        }
                    }
                }

                RoutingStage::FetchingQuote(trader) => {
                    match self.source.get_quote(request).await {
                        Ok(quote) => RoutingStage::ValidatingRoute(trader, quote),
                        Err(e) => RoutingStage::Failed(e.into()),
                    }
                }

                RoutingStage::ValidatingRoute(trader, quote) => {
                    let result = self.filter.check_route_compliance(&quote);
                    if result.is_compliant && self.within_hop_bound(&quote) {
                        let hop_count = quote.hop_count();
                        info!(
                            "✅ Compliant route: {} hops, out {}",
                            hop_count, quote.out_amount
                        );
                        RoutingStage::Done(CompliantQuoteResult {
                            quote,
                            was_fallback_used: false,
                            compliant_hop_count: hop_count,
                            trader_kyc_level: trader.kyc_level,
                            trader_jurisdiction: trader.jurisdiction,
                        })
                    } else {
                        warn!(
                            "Route failed validation (non-compliant pools: [{}], hops: {})",
                            format_pubkeys(&result.non_compliant_pool_ids),
                            quote.hop_count()
                        );
                        if self.config.enable_fallback {
                            RoutingStage::FallbackFetch(trader, result.non_compliant_pool_ids)
                        } else {
                            RoutingStage::Failed(RoutingError::NonCompliantRoute {
                                pool_ids: result.non_compliant_pool_ids,
                            })
                        }
                    }
                }

                RoutingStage::FallbackFetch(trader, original_non_compliant) => {
                    debug!("refetching as direct-only fallback");
                    match self.source.get_quote(&request.direct_only()).await {
                        Ok(quote) => {
                            RoutingStage::FallbackValidate(trader, quote, original_non_compliant)
                        }
                        Err(e) => {
                            // No fallback route exists; surface the pools
                            // that made the original route non-compliant.
                            warn!("fallback quote unavailable: {}", e);
                            RoutingStage::Failed(RoutingError::NonCompliantRoute {
                                pool_ids: original_non_compliant,
                            })
                        }
                    }
                }

                RoutingStage::FallbackValidate(trader, quote, original_non_compliant) => {
                    let result = self.filter.check_route_compliance(&quote);
                    if result.is_compliant && self.within_hop_bound(&quote) {
                        let hop_count = quote.hop_count();
                        info!(
                            "✅ Compliant fallback route: {} hops, out {}",
                            hop_count, quote.out_amount
                        );
                        RoutingStage::Done(CompliantQuoteResult {
                            quote,
                            was_fallback_used: true,
                            compliant_hop_count: hop_count,
                            trader_kyc_level: trader.kyc_level,
                            trader_jurisdiction: trader.jurisdiction,
                        })
                    } else {
                        // Report the original offenders; fall back to the
                        // direct-route offenders when the original list is
                        // empty (hop-bound-only rejection).
                        let pool_ids = if original_non_compliant.is_empty() {
                            result.non_compliant_pool_ids
                        } else {
                            original_non_compliant
                        };
                        RoutingStage::Failed(RoutingError::NonCompliantRoute { pool_ids })
                    }
                }

                RoutingStage::Done(result) => return Ok(result),
                RoutingStage::Failed(error) => return Err(error),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{AggregatorError, RouteHop};
    use crate::chain::{AccountData, ChainClient, ChainError};
    use crate::kyc::KycComplianceChecker;
    use crate::layouts::encode;
    use crate::pool_registry::PoolComplianceRegistry;
    use crate::types::{KycRecord, PoolComplianceEntry, PoolStatus};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOW_PLUS: i64 = i64::MAX / 2;
    const ALL_JURISDICTIONS: u8 = 0b0011_1111;

    fn wallet() -> Pubkey {
        Pubkey::new([1u8; 32])
    }

    fn kyc_record(is_active: bool) -> KycRecord {
        KycRecord {
            subject_wallet: wallet(),
            registry_id: Pubkey::new([2u8; 32]),
            kyc_level: KycLevel::Standard,
            jurisdiction: Jurisdiction::Japan,
            kyc_hash: [0u8; 32],
            is_active,
            daily_limit: 0,
            daily_volume: 0,
            volume_reset_at: 0,
            verified_at: 0,
            expiry_at: NOW_PLUS,
            last_activity_at: 0,
        }
    }

    struct MapChain {
        accounts: HashMap<Pubkey, AccountData>,
    }

    #[async_trait]
    impl ChainClient for MapChain {
        async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountData>, ChainError> {
            Ok(self.accounts.get(address).cloned())
        }
        async fn get_program_accounts(
            &self,
            _: &Pubkey,
            _: Option<u64>,
        ) -> Result<Vec<(Pubkey, AccountData)>, ChainError> {
            Ok(Vec::new())
        }
        async fn slot(&self) -> Result<u64, ChainError> {
            Ok(0)
        }
    }

    fn checker_for(record: Option<KycRecord>) -> Arc<KycComplianceChecker> {
        let registry = Pubkey::new([2u8; 32]);
        let program = Pubkey::new([3u8; 32]);
        let mut accounts = HashMap::new();
        if let Some(r) = record {
            let probe = KycComplianceChecker::new(
                Arc::new(MapChain {
                    accounts: HashMap::new(),
                }),
                registry,
                program,
            );
            accounts.insert(
                probe.whitelist_address(&r.subject_wallet),
                AccountData {
                    data: encode::whitelist_entry(&r, 255),
                    owner: program,
                    lamports: 1,
                },
            );
        }
        Arc::new(KycComplianceChecker::new(
            Arc::new(MapChain { accounts }),
            registry,
            program,
        ))
    }

    fn hop(pool: Pubkey) -> RouteHop {
        RouteHop {
            pool_id: pool,
            venue_label: "Orca".to_string(),
            input_mint: Pubkey::new([1u8; 32]),
            output_mint: Pubkey::new([2u8; 32]),
            in_amount: 1_000_000,
            out_amount: 990_000,
            fee_amount: 100,
        }
    }

    fn quote_with(pools: &[Pubkey]) -> SwapQuote {
        SwapQuote {
            input_mint: Pubkey::new([1u8; 32]),
            output_mint: Pubkey::new([2u8; 32]),
            in_amount: 1_000_000,
            out_amount: 990_000,
            other_amount_threshold: 985_000,
            price_impact_pct: Decimal::new(5, 2),
            hops: pools.iter().map(|p| hop(*p)).collect(),
            context_slot: 1,
        }
    }

    fn approved(pool: Pubkey) -> PoolComplianceEntry {
        PoolComplianceEntry {
            pool_id: pool,
            registry_id: Pubkey::new([50u8; 32]),
            operator: Pubkey::new([51u8; 32]),
            venue_label: "Orca".to_string(),
            status: PoolStatus::Active,
            allowed_jurisdiction: Jurisdiction::Japan,
            min_kyc_level: KycLevel::Standard,
            audit_hash: [0u8; 32],
            audit_expiry: NOW_PLUS,
            registered_at: 0,
            updated_at: 0,
        }
    }

    /// Quote source answering multi-hop and direct requests separately, with
    /// call counting.
    struct ScriptedSource {
        multi: Option<SwapQuote>,
        direct: Option<SwapQuote>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteSource for ScriptedSource {
        async fn get_quote(&self, request: &QuoteRequest) -> Result<SwapQuote, AggregatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let side = if request.only_direct_routes {
                &self.direct
            } else {
                &self.multi
            };
            side.clone()
                .ok_or_else(|| AggregatorError::Unavailable("no route".to_string()))
        }
    }

    fn policy() -> TradePolicy {
        TradePolicy {
            min_kyc_level: KycLevel::Standard,
            allowed_jurisdictions: ALL_JURISDICTIONS,
        }
    }

    fn request() -> QuoteRequest {
        QuoteRequest::new(Pubkey::new([1u8; 32]), Pubkey::new([2u8; 32]), 1_000_000, 50)
    }

    struct Setup {
        router: ComplianceAwareRouter,
        source: Arc<ScriptedSource>,
    }

    fn setup(
        record: Option<KycRecord>,
        approved_pools: &[Pubkey],
        multi: Option<SwapQuote>,
        direct: Option<SwapQuote>,
        config: RouterConfig,
    ) -> Setup {
        let registry = Arc::new(PoolComplianceRegistry::new(Pubkey::new([99u8; 32])));
        for pool in approved_pools {
            registry.add_entry(approved(*pool));
        }
        let source = Arc::new(ScriptedSource {
            multi,
            direct,
            calls: AtomicUsize::new(0),
        });
        let router = ComplianceAwareRouter::new(
            checker_for(record),
            source.clone(),
            RouteComplianceFilter::new(registry),
            config,
        );
        Setup { router, source }
    }

    #[tokio::test]
    async fn test_inactive_wallet_short_circuits_before_any_quote() {
        let s = setup(
            Some(kyc_record(false)),
            &[],
            Some(quote_with(&[Pubkey::new([10u8; 32])])),
            None,
            RouterConfig::default(),
        );
        let err = s
            .router
            .get_compliant_quote(&wallet(), &request(), &policy())
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::PolicyViolation { ref reason } if reason == "KYC inactive"));
        assert_eq!(
            s.source.calls.load(Ordering::SeqCst),
            0,
            "KYC gate must short-circuit before the aggregator is called"
        );
    }

    #[tokio::test]
    async fn test_missing_record_is_policy_violation() {
        let s = setup(None, &[], None, None, RouterConfig::default());
        let err = s
            .router
            .get_compliant_quote(&wallet(), &request(), &policy())
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::PolicyViolation { ref reason } if reason == "no KYC record"));
    }

    #[tokio::test]
    async fn test_compliant_route_without_fallback() {
        let pool_a = Pubkey::new([10u8; 32]);
        let pool_b = Pubkey::new([11u8; 32]);
        let s = setup(
            Some(kyc_record(true)),
            &[pool_a, pool_b],
            Some(quote_with(&[pool_a, pool_b])),
            None,
            RouterConfig::default(),
        );
        let result = s
            .router
            .get_compliant_quote(&wallet(), &request(), &policy())
            .await
            .unwrap();
        assert!(!result.was_fallback_used);
        assert_eq!(result.compliant_hop_count, 2);
        assert_eq!(result.trader_kyc_level, KycLevel::Standard);
        assert_eq!(result.trader_jurisdiction, Jurisdiction::Japan);
        assert_eq!(s.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_to_direct_route_succeeds() {
        let approved_pool = Pubkey::new([10u8; 32]);
        let unlisted_pool = Pubkey::new([11u8; 32]);
        let s = setup(
            Some(kyc_record(true)),
            &[approved_pool],
            Some(quote_with(&[approved_pool, unlisted_pool])),
            Some(quote_with(&[approved_pool])),
            RouterConfig::default(),
        );
        let result = s
            .router
            .get_compliant_quote(&wallet(), &request(), &policy())
            .await
            .unwrap();
        assert!(result.was_fallback_used);
        assert_eq!(result.compliant_hop_count, 1);
        assert_eq!(s.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_fallback_lists_original_pools() {
        let approved_pool = Pubkey::new([10u8; 32]);
        let unlisted_a = Pubkey::new([11u8; 32]);
        let unlisted_b = Pubkey::new([12u8; 32]);
        let s = setup(
            Some(kyc_record(true)),
            &[approved_pool],
            Some(quote_with(&[approved_pool, unlisted_a])),
            Some(quote_with(&[unlisted_b])),
            RouterConfig::default(),
        );
        let err = s
            .router
            .get_compliant_quote(&wallet(), &request(), &policy())
            .await
            .unwrap_err();
        match err {
            RoutingError::NonCompliantRoute { pool_ids } => {
                // The pools from the *original* multi-hop check, not the
                // fallback's.
                assert_eq!(pool_ids, vec![unlisted_a]);
            }
            other => panic!("expected NonCompliantRoute, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fallback_disabled_fails_immediately() {
        let approved_pool = Pubkey::new([10u8; 32]);
        let unlisted = Pubkey::new([11u8; 32]);
        let s = setup(
            Some(kyc_record(true)),
            &[approved_pool],
            Some(quote_with(&[approved_pool, unlisted])),
            Some(quote_with(&[approved_pool])),
            RouterConfig {
                enable_fallback: false,
                max_route_hops: None,
            },
        );
        let err = s
            .router
            .get_compliant_quote(&wallet(), &request(), &policy())
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::NonCompliantRoute { .. }));
        assert_eq!(
            s.source.calls.load(Ordering::SeqCst),
            1,
            "no fallback fetch when disabled"
        );
    }

    #[tokio::test]
    async fn test_fallback_fetch_failure_reports_original_pools() {
        let approved_pool = Pubkey::new([10u8; 32]);
        let unlisted = Pubkey::new([11u8; 32]);
        let s = setup(
            Some(kyc_record(true)),
            &[approved_pool],
            Some(quote_with(&[approved_pool, unlisted])),
            None, // direct refetch has no route
            RouterConfig::default(),
        );
        let err = s
            .router
            .get_compliant_quote(&wallet(), &request(), &policy())
            .await
            .unwrap_err();
        match err {
            RoutingError::NonCompliantRoute { pool_ids } => assert_eq!(pool_ids, vec![unlisted]),
            other => panic!("expected NonCompliantRoute, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_primary_quote_failure_is_route_unavailable() {
        let s = setup(
            Some(kyc_record(true)),
            &[],
            None,
            None,
            RouterConfig::default(),
        );
        let err = s
            .router
            .get_compliant_quote(&wallet(), &request(), &policy())
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::RouteUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_hop_bound_forces_fallback() {
        let a = Pubkey::new([10u8; 32]);
        let b = Pubkey::new([11u8; 32]);
        let c = Pubkey::new([12u8; 32]);
        let s = setup(
            Some(kyc_record(true)),
            &[a, b, c],
            Some(quote_with(&[a, b, c])),
            Some(quote_with(&[a])),
            RouterConfig {
                enable_fallback: true,
                max_route_hops: Some(2),
            },
        );
        let result = s
            .router
            .get_compliant_quote(&wallet(), &request(), &policy())
            .await
            .unwrap();
        assert!(result.was_fallback_used);
        assert_eq!(result.compliant_hop_count, 1);
    }
}
