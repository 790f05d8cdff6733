//! # Aggregator Client
//!
//! Stateless HTTP client for the third-party DEX route aggregator. Produces
//! price/route quotes (`GET /quote`) and unsigned swap payloads
//! (`POST /swap`).
//!
//! ## Numeric safety
//!
//! The aggregator encodes token amounts as decimal strings. They are parsed
//! straight into `u64` base units and the price impact into
//! [`rust_decimal::Decimal`]; nothing ever round-trips through a 64-bit
//! float.
//!
//! ## Availability
//!
//! Every call is bounded by the client timeout. A timeout or connection
//! failure surfaces as [`AggregatorError::Unavailable`]; non-2xx responses as
//! [`AggregatorError::Http`] with the status and body. `get_best_route` is
//! the forgiving wrapper: it logs and returns `None` instead of erroring.

use crate::types::Pubkey;
use async_trait::async_trait;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serde adapter for u64 amounts carried as decimal strings on the wire.
pub(crate) mod amount_str {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>()
            .map_err(|e| de::Error::custom(format!("invalid amount string {:?}: {}", s, e)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("Aggregator HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Aggregator unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid aggregator response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AggregatorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            AggregatorError::Unavailable(e.to_string())
        } else if e.is_decode() {
            AggregatorError::InvalidResponse(e.to_string())
        } else {
            AggregatorError::Unavailable(e.to_string())
        }
    }
}

/// One pool traversal within a multi-step route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHop {
    /// Pool identifier (the AMM account the hop trades through).
    #[serde(rename = "ammKey")]
    pub pool_id: Pubkey,
    /// DEX label, e.g. "Raydium".
    #[serde(rename = "label")]
    pub venue_label: String,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    #[serde(with = "amount_str")]
    pub in_amount: u64,
    #[serde(with = "amount_str")]
    pub out_amount: u64,
    #[serde(with = "amount_str")]
    pub fee_amount: u64,
}

/// A priced route quote. Immutable once returned by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    #[serde(with = "amount_str")]
    pub in_amount: u64,
    #[serde(with = "amount_str")]
    pub out_amount: u64,
    /// Worst acceptable output under the requested slippage bound.
    #[serde(with = "amount_str")]
    pub other_amount_threshold: u64,
    pub price_impact_pct: Decimal,
    /// Ordered hops; concatenated they form a path from `input_mint` to
    /// `output_mint`.
    #[serde(rename = "routePlan", default)]
    pub hops: Vec<RouteHop>,
    /// Chain slot the quote was computed against.
    #[serde(default)]
    pub context_slot: u64,
}

impl SwapQuote {
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    pub fn pool_ids(&self) -> Vec<Pubkey> {
        self.hops.iter().map(|h| h.pool_id).collect()
    }

    /// True when the route is a single direct hop.
    pub fn is_direct(&self) -> bool {
        self.hops.len() <= 1
    }
}

/// Unsigned swap payload ready for signing by the trader's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapPayload {
    /// Base64-encoded unsigned transaction.
    pub swap_transaction: String,
    pub last_valid_block_height: u64,
    #[serde(default)]
    pub prioritization_fee_lamports: u64,
}

/// Parameters for one quote request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    /// Input amount in base units.
    pub amount: u64,
    pub slippage_bps: u16,
    /// Constrain the aggregator to single-hop routes.
    pub only_direct_routes: bool,
    pub max_accounts: Option<u32>,
}

impl QuoteRequest {
    pub fn new(input_mint: Pubkey, output_mint: Pubkey, amount: u64, slippage_bps: u16) -> Self {
        Self {
            input_mint,
            output_mint,
            amount,
            slippage_bps,
            only_direct_routes: false,
            max_accounts: None,
        }
    }

    /// Same request constrained to direct (single-hop) routes.
    pub fn direct_only(&self) -> Self {
        Self {
            only_direct_routes: true,
            ..self.clone()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequestBody<'a> {
    quote_response: &'a SwapQuote,
    user_public_key: Pubkey,
    wrap_and_unwrap_sol: bool,
}

/// Abstraction over "something that can produce quotes". The HTTP client is
/// the production implementation; tests substitute in-memory sources.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<SwapQuote, AggregatorError>;
}

/// HTTP client against the aggregator REST API.
pub struct AggregatorClient {
    http: reqwest::Client,
    base_url: String,
}

impl AggregatorClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AggregatorError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AggregatorError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn quote_query(request: &QuoteRequest) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("inputMint", request.input_mint.to_string()),
            ("outputMint", request.output_mint.to_string()),
            ("amount", request.amount.to_string()),
            ("slippageBps", request.slippage_bps.to_string()),
            ("onlyDirectRoutes", request.only_direct_routes.to_string()),
        ];
        if let Some(max_accounts) = request.max_accounts {
            query.push(("maxAccounts", max_accounts.to_string()));
        }
        query
    }

    /// Fetch a quote. Errors are typed per the availability contract above.
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<SwapQuote, AggregatorError> {
        let response = self
            .http
            .get(self.endpoint("quote"))
            .query(&Self::quote_query(request))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AggregatorError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<SwapQuote>().await?)
    }

    /// Build the unsigned swap transaction for an accepted quote.
    pub async fn get_swap_payload(
        &self,
        quote: &SwapQuote,
        trader: &Pubkey,
        wrap_and_unwrap_sol: bool,
    ) -> Result<SwapPayload, AggregatorError> {
        let body = SwapRequestBody {
            quote_response: quote,
            user_public_key: *trader,
            wrap_and_unwrap_sol,
        };
        let response = self.http.post(self.endpoint("swap")).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AggregatorError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<SwapPayload>().await?)
    }

    /// Best-effort quote: any failure is logged and swallowed into `None`.
    pub async fn get_best_route(&self, request: &QuoteRequest) -> Option<SwapQuote> {
        match self.get_quote(request).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!(
                    "⚠️ Aggregator quote failed for {} -> {}: {}",
                    request.input_mint, request.output_mint, e
                );
                None
            }
        }
    }
}

#[async_trait]
impl QuoteSource for AggregatorClient {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<SwapQuote, AggregatorError> {
        AggregatorClient::get_quote(self, request).await
    }
}
