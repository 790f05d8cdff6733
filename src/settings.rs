//! # Configuration
//!
//! Layered settings: `Config.toml` (optional) with `MERIDIAN_*` environment
//! overrides for deployment-specific values. Every tunable has a sane
//! default so tests and examples can run with an empty config.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AggregatorSettings {
    /// Base URL of the route aggregator REST API.
    #[serde(default = "default_aggregator_base_url")]
    pub base_url: String,
    #[serde(default = "default_aggregator_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u16,
    /// Cap on accounts per route; bounds transaction size.
    #[serde(default = "default_max_accounts")]
    pub max_accounts: u32,
}

fn default_aggregator_base_url() -> String {
    "https://quote-api.jup.ag/v6".to_string()
}
fn default_aggregator_timeout_ms() -> u64 {
    5_000
}
fn default_slippage_bps() -> u16 {
    50 // 0.5%
}
fn default_max_accounts() -> u32 {
    64
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            base_url: default_aggregator_base_url(),
            timeout_ms: default_aggregator_timeout_ms(),
            default_slippage_bps: default_slippage_bps(),
            max_accounts: default_max_accounts(),
        }
    }
}

impl AggregatorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainSettings {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
    /// KYC registry account (base58) whitelist entries derive under.
    #[serde(default)]
    pub kyc_registry: String,
    /// Program owning whitelist entry accounts.
    #[serde(default)]
    pub kyc_program: String,
    /// Program owning pool compliance entry accounts.
    #[serde(default)]
    pub pool_registry_program: String,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8899".to_string()
}
fn default_rpc_timeout_ms() -> u64 {
    10_000
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            timeout_ms: default_rpc_timeout_ms(),
            kyc_registry: String::new(),
            kyc_program: String::new(),
            pool_registry_program: String::new(),
        }
    }
}

impl ChainSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingSettings {
    /// Retry non-compliant routes with a direct-only quote.
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    /// Minimum KYC level ordinal the policy gate requires (0..3).
    #[serde(default = "default_min_kyc_level")]
    pub min_kyc_level: u8,
    /// Bitmask of allowed jurisdictions; defaults to Japan | Singapore |
    /// HongKong.
    #[serde(default = "default_allowed_jurisdictions")]
    pub allowed_jurisdictions: u8,
    #[serde(default)]
    pub max_route_hops: Option<u8>,
    /// Maximum tolerated price impact percent for pre-checks.
    #[serde(default = "default_max_price_impact_pct")]
    pub max_price_impact_pct: String,
}

fn default_true() -> bool {
    true
}
fn default_min_kyc_level() -> u8 {
    1 // Standard
}
fn default_allowed_jurisdictions() -> u8 {
    0b0000_0111
}
fn default_max_price_impact_pct() -> String {
    "1.0".to_string()
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            enable_fallback: default_true(),
            min_kyc_level: default_min_kyc_level(),
            allowed_jurisdictions: default_allowed_jurisdictions(),
            max_route_hops: None,
            max_price_impact_pct: default_max_price_impact_pct(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub aggregator: AggregatorSettings,
    #[serde(default)]
    pub chain: ChainSettings,
    #[serde(default)]
    pub routing: RoutingSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("Config.toml").required(false))
            .add_source(Environment::with_prefix("MERIDIAN").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}
