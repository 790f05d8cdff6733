//! # Meridian Routing SDK
//!
//! Compliance-aware trade routing for a regulated stablecoin trading
//! surface. This crate sits between a third-party DEX route aggregator and
//! the trading layer, and guarantees that every route it returns (a) only
//! traverses pools pre-approved by an on-chain compliance registry, and (b)
//! is only handed to a trader whose on-chain KYC record currently satisfies
//! policy.
//!
//! ## Overview
//!
//! The SDK is organized into several layers:
//!
//! ### Quote Layer
//! HTTP client for the aggregator's quote/swap API plus a best-effort route
//! optimizer that races direct against multi-hop routes.
//!
//! ### Compliance Layer
//! Caches of on-chain compliance state: the pool registry snapshot (atomic
//! resync) and per-wallet KYC records (explicit invalidation), with a route
//! filter cross-referencing quotes against the registry.
//!
//! ### Orchestration
//! `ComplianceAwareRouter` runs the full flow (KYC gate, quote fetch, route
//! validation, direct-only fallback) as an explicit state machine. The
//! optional `ZkComplianceProver` produces policy-satisfaction proofs without
//! revealing the underlying record.
//!
//! All token amounts are `u64` base units end to end; nothing on the numeric
//! path passes through a 64-bit float.

// Core Types
/// Addresses, KYC/jurisdiction enums, on-chain record shapes
pub mod types;
/// Public routing error taxonomy
pub mod errors;

// Chain Access
/// JSON-RPC chain client and deterministic address derivation
pub mod chain;
/// On-chain account byte layouts and fail-closed decoders
pub mod layouts;

// Quote Layer
/// Aggregator HTTP client and wire types
pub mod aggregator;
/// Direct-vs-multi-hop route optimization
pub mod optimizer;

// Compliance Layer
/// Pool compliance registry cache
pub mod pool_registry;
/// Per-wallet KYC resolution and policy evaluation
pub mod kyc;
/// Route-vs-registry validation
pub mod route_filter;
/// Optional ZK compliance proofs
pub mod zk;

// Orchestration
/// Compliance-aware routing state machine
pub mod router;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use aggregator::{AggregatorClient, QuoteRequest, QuoteSource, SwapQuote};
pub use errors::RoutingError;
pub use kyc::KycComplianceChecker;
pub use optimizer::RouteOptimizer;
pub use pool_registry::PoolComplianceRegistry;
pub use route_filter::RouteComplianceFilter;
pub use router::{ComplianceAwareRouter, CompliantQuoteResult, RouterConfig, TradePolicy};
pub use settings::Settings;
pub use types::Pubkey;
pub use zk::ZkComplianceProver;
