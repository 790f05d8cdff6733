//! # Route Optimizer
//!
//! Best-effort route selection: races a direct-only quote against an
//! unconstrained multi-hop quote and keeps whichever pays out more. This is
//! an optimization layer, not a policy gate, so failures degrade to `None`.

use crate::aggregator::{QuoteRequest, QuoteSource, SwapQuote};
use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Result of a price impact pre-check.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceImpactCheck {
    /// True only when a quote was obtained and its impact is within bound.
    pub acceptable: bool,
    /// Observed impact percent; `None` when no quote could be fetched
    /// (treated as unbounded impact, fail closed).
    pub price_impact: Option<Decimal>,
    pub quote: Option<SwapQuote>,
}

/// Compares direct vs multi-hop routes from the same quote source.
pub struct RouteOptimizer {
    source: Arc<dyn QuoteSource>,
    /// Maximum tolerated price impact percent for `check_price_impact`.
    default_max_impact_pct: Decimal,
}

impl RouteOptimizer {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self {
            source,
            default_max_impact_pct: Decimal::ONE, // 1.0%
        }
    }

    pub fn with_max_impact(source: Arc<dyn QuoteSource>, max_impact_pct: Decimal) -> Self {
        Self {
            source,
            default_max_impact_pct: max_impact_pct,
        }
    }

    /// Fetch a direct-only and an unconstrained quote concurrently and return
    /// the one with the strictly larger output. Ties favor the direct route
    /// (lower settlement risk). One side failing returns the other; both
    /// failing returns `None`.
    pub async fn find_optimal_route(&self, request: &QuoteRequest) -> Option<SwapQuote> {
        let direct_request = request.direct_only();
        let mut multi_request = request.clone();
        multi_request.only_direct_routes = false;

        let (direct, multi) = tokio::join!(
            self.source.get_quote(&direct_request),
            self.source.get_quote(&multi_request),
        );
        let direct = direct.ok();
        let multi = multi.ok();

        match (direct, multi) {
            (Some(d), Some(m)) => {
                if m.out_amount > d.out_amount {
                    debug!(
                        "multi-hop route wins: {} > {} ({} hops)",
                        m.out_amount,
                        d.out_amount,
                        m.hop_count()
                    );
                    Some(m)
                } else {
                    Some(d)
                }
            }
            (Some(d), None) => Some(d),
            (None, Some(m)) => Some(m),
            (None, None) => None,
        }
    }

    /// Check the price impact of a prospective trade against the configured
    /// bound. Any fetch failure is reported as unacceptable with unbounded
    /// impact; this check never silently passes.
    pub async fn check_price_impact(
        &self,
        request: &QuoteRequest,
        max_impact_pct: Option<Decimal>,
    ) -> PriceImpactCheck {
        let bound = max_impact_pct.unwrap_or(self.default_max_impact_pct);
        match self.source.get_quote(request).await {
            Ok(quote) => {
                let impact = quote.price_impact_pct;
                PriceImpactCheck {
                    acceptable: impact <= bound,
                    price_impact: Some(impact),
                    quote: Some(quote),
                }
            }
            Err(e) => {
                debug!("price impact check failed closed: {}", e);
                PriceImpactCheck {
                    acceptable: false,
                    price_impact: None,
                    quote: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregatorError;
    use crate::types::Pubkey;
    use async_trait::async_trait;
    use std::str::FromStr;

    /// Quote source that answers direct and multi-hop requests separately.
    struct SplitSource {
        direct: Option<SwapQuote>,
        multi: Option<SwapQuote>,
    }

    #[async_trait]
    impl QuoteSource for SplitSource {
        async fn get_quote(&self, request: &QuoteRequest) -> Result<SwapQuote, AggregatorError> {
            let side = if request.only_direct_routes {
                &self.direct
            } else {
                &self.multi
            };
            side.clone()
                .ok_or_else(|| AggregatorError::Unavailable("no route".to_string()))
        }
    }

    fn quote(out_amount: u64, hops: usize, impact: &str) -> SwapQuote {
        let hop = crate::aggregator::RouteHop {
            pool_id: Pubkey::new([9u8; 32]),
            venue_label: "Raydium".to_string(),
            input_mint: Pubkey::new([1u8; 32]),
            output_mint: Pubkey::new([2u8; 32]),
            in_amount: 1_000_000,
            out_amount,
            fee_amount: 100,
        };
        SwapQuote {
            input_mint: Pubkey::new([1u8; 32]),
            output_mint: Pubkey::new([2u8; 32]),
            in_amount: 1_000_000,
            out_amount,
            other_amount_threshold: out_amount - out_amount / 100,
            price_impact_pct: Decimal::from_str(impact).unwrap(),
            hops: vec![hop; hops],
            context_slot: 1,
        }
    }

    fn request() -> QuoteRequest {
        QuoteRequest::new(Pubkey::new([1u8; 32]), Pubkey::new([2u8; 32]), 1_000_000, 50)
    }

    fn optimizer(direct: Option<SwapQuote>, multi: Option<SwapQuote>) -> RouteOptimizer {
        RouteOptimizer::new(Arc::new(SplitSource { direct, multi }))
    }

    #[tokio::test]
    async fn test_larger_multi_hop_output_wins() {
        let opt = optimizer(Some(quote(900_000, 1, "0.1")), Some(quote(950_000, 2, "0.2")));
        let best = opt.find_optimal_route(&request()).await.unwrap();
        assert_eq!(best.out_amount, 950_000);
        assert_eq!(best.hop_count(), 2);
    }

    #[tokio::test]
    async fn test_larger_direct_output_wins() {
        let opt = optimizer(Some(quote(960_000, 1, "0.1")), Some(quote(950_000, 2, "0.2")));
        let best = opt.find_optimal_route(&request()).await.unwrap();
        assert_eq!(best.out_amount, 960_000);
        assert_eq!(best.hop_count(), 1);
    }

    #[tokio::test]
    async fn test_tie_favors_direct() {
        let opt = optimizer(Some(quote(950_000, 1, "0.1")), Some(quote(950_000, 3, "0.2")));
        let best = opt.find_optimal_route(&request()).await.unwrap();
        assert_eq!(best.hop_count(), 1);
    }

    #[tokio::test]
    async fn test_one_side_failing_returns_other() {
        let opt = optimizer(None, Some(quote(950_000, 2, "0.2")));
        assert_eq!(
            opt.find_optimal_route(&request()).await.unwrap().out_amount,
            950_000
        );

        let opt = optimizer(Some(quote(900_000, 1, "0.1")), None);
        assert_eq!(
            opt.find_optimal_route(&request()).await.unwrap().out_amount,
            900_000
        );
    }

    #[tokio::test]
    async fn test_both_failing_returns_none() {
        let opt = optimizer(None, None);
        assert!(opt.find_optimal_route(&request()).await.is_none());
    }

    #[tokio::test]
    async fn test_price_impact_within_bound() {
        let opt = optimizer(None, Some(quote(950_000, 2, "0.5")));
        let check = opt.check_price_impact(&request(), None).await;
        assert!(check.acceptable);
        assert_eq!(check.price_impact, Some(Decimal::from_str("0.5").unwrap()));
        assert!(check.quote.is_some());
    }

    #[tokio::test]
    async fn test_price_impact_over_bound() {
        let opt = optimizer(None, Some(quote(950_000, 2, "1.5")));
        let check = opt.check_price_impact(&request(), None).await;
        assert!(!check.acceptable);
    }

    #[tokio::test]
    async fn test_price_impact_fails_closed_on_fetch_error() {
        let opt = optimizer(None, None);
        let check = opt.check_price_impact(&request(), None).await;
        assert!(!check.acceptable);
        assert_eq!(check.price_impact, None);
        assert!(check.quote.is_none());
    }
}
