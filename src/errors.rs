//! # Routing Error Taxonomy
//!
//! Public failure surface of the compliance router. Policy violations and
//! exhausted-fallback route failures are the only conditions meant to reach
//! an end user verbatim; transport-level failures are retryable and should
//! be retried by the caller with backoff. Malformed on-chain data never
//! appears here; it decodes to "record absent" inside the caches.

use crate::aggregator::AggregatorError;
use crate::chain::ChainError;
use crate::types::{format_pubkeys, Pubkey};

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// Trader failed the KYC gate. Terminal: never retried, no fallback.
    #[error("KYC check failed: {reason}")]
    PolicyViolation { reason: String },

    /// A route was found but no compliant variant exists (fallback exhausted
    /// or disabled). Lists the offending pools from the original check.
    #[error("No compliant route found: pools [{}]", format_pubkeys(.pool_ids))]
    NonCompliantRoute { pool_ids: Vec<Pubkey> },

    /// The aggregator timed out, rate-limited or errored. Transient.
    #[error("Route unavailable: {source}")]
    RouteUnavailable {
        #[from]
        source: AggregatorError,
    },

    /// The chain node failed while resolving compliance state. Transient.
    #[error("Chain unavailable: {source}")]
    ChainUnavailable {
        #[from]
        source: ChainError,
    },
}

impl RoutingError {
    /// Transient failures the caller should retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RoutingError::RouteUnavailable { .. } | RoutingError::ChainUnavailable { .. }
        )
    }

    /// Failures carrying an actionable, user-facing message.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            RoutingError::PolicyViolation { .. } | RoutingError::NonCompliantRoute { .. }
        )
    }
}
