//! Configuration module for the coin-send tool
//!
//! This module handles configuration loading from TOML files with
//! environment variable overrides, and maps the result onto the builder and
//! ledger client settings.

use crate::tx_builder::{BuilderConfig, PageLimits};
use crate::types::{CoinType, NATIVE_COIN_TYPE, NATIVE_DECIMALS};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding `network.rpc_url`
pub const ENV_RPC_URL: &str = "COIN_SEND_RPC_URL";

/// Environment variable overriding `network.name`
pub const ENV_NETWORK: &str = "COIN_SEND_NETWORK";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Network and RPC endpoint
    pub network: NetworkConfig,

    /// Coin pagination and confirmation polling
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Native coin and known asset metadata
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Monitoring and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network name, used in the chain identifier (`iota:<name>`)
    pub name: String,

    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Coins requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Ceiling on pages per aggregation; 0 disables the ceiling
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Interval between confirmation polls in milliseconds
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,

    /// Give up waiting for confirmation after this many seconds
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Coin type that pays fees
    #[serde(default = "default_native_coin_type")]
    pub native_coin_type: String,

    /// Decimal precision of the native coin
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,

    /// Metadata for other coin types
    #[serde(default)]
    pub registry: Vec<AssetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub coin_type: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Dump Prometheus metrics on exit
    #[serde(default)]
    pub enable_metrics: bool,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,
}

// Default value functions
fn default_request_timeout() -> u64 { 30 }
fn default_page_size() -> usize { crate::tx_builder::aggregate::DEFAULT_PAGE_SIZE }
fn default_max_pages() -> usize { crate::tx_builder::aggregate::DEFAULT_MAX_PAGES }
fn default_confirmation_poll_ms() -> u64 { 500 }
fn default_confirmation_timeout() -> u64 { 60 }
fn default_native_coin_type() -> String { NATIVE_COIN_TYPE.to_string() }
fn default_native_decimals() -> u8 { NATIVE_DECIMALS }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "testnet".to_string(),
            rpc_url: "https://api.testnet.iota.cafe".to_string(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            confirmation_poll_ms: default_confirmation_poll_ms(),
            confirmation_timeout_secs: default_confirmation_timeout(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            native_coin_type: default_native_coin_type(),
            native_decimals: default_native_decimals(),
            registry: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// A `.env` file in the working directory is honoured if present.
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `COIN_SEND_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_RPC_URL) {
            self.network.rpc_url = url;
        }
        if let Ok(name) = std::env::var(ENV_NETWORK) {
            self.network.name = name;
        }
    }

    /// Reject settings the builder cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.network.name.trim().is_empty() {
            bail!("network.name must not be empty");
        }
        if !self.network.rpc_url.starts_with("http://")
            && !self.network.rpc_url.starts_with("https://")
        {
            bail!("network.rpc_url must be an http(s) URL: {}", self.network.rpc_url);
        }
        if self.ledger.page_size == 0 {
            bail!("ledger.page_size must be greater than 0");
        }
        if self.ledger.confirmation_poll_ms == 0 {
            bail!("ledger.confirmation_poll_ms must be greater than 0");
        }
        if self.assets.native_coin_type.trim().is_empty() {
            bail!("assets.native_coin_type must not be empty");
        }
        for asset in &self.assets.registry {
            if asset.coin_type.trim().is_empty() {
                bail!("asset '{}' has an empty coin_type", asset.symbol);
            }
        }
        Ok(())
    }

    /// Chain identifier handed to signers, e.g. `iota:testnet`
    pub fn chain_id(&self) -> String {
        format!("iota:{}", self.network.name)
    }

    /// Decimal precision for `coin_type`, if known
    ///
    /// The native coin falls back to its standard precision; unknown assets
    /// yield `None` and cannot be built until their metadata is supplied.
    pub fn decimals_for(&self, coin_type: &str) -> Option<u8> {
        if coin_type == self.assets.native_coin_type {
            return Some(self.assets.native_decimals);
        }
        self.assets
            .registry
            .iter()
            .find(|a| a.coin_type == coin_type)
            .map(|a| a.decimals)
    }

    /// Display symbol for `coin_type`, if known
    pub fn symbol_for(&self, coin_type: &str) -> Option<&str> {
        self.assets
            .registry
            .iter()
            .find(|a| a.coin_type == coin_type)
            .map(|a| a.symbol.as_str())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.request_timeout_secs)
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ledger.confirmation_poll_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger.confirmation_timeout_secs)
    }

    /// Builder settings derived from this configuration
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            native_coin_type: CoinType::new(self.assets.native_coin_type.clone()),
            limits: PageLimits {
                page_size: self.ledger.page_size,
                max_pages: (self.ledger.max_pages > 0).then_some(self.ledger.max_pages),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chain_id(), "iota:testnet");
        assert_eq!(config.ledger.page_size, 200);
        assert_eq!(config.decimals_for(NATIVE_COIN_TYPE), Some(9));
    }

    #[test]
    fn test_minimal_file_fills_defaults() {
        let file = write_config(
            r#"
            [network]
            name = "devnet"
            rpc_url = "http://127.0.0.1:9000"
            "#,
        );

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.chain_id(), "iota:devnet");
        assert_eq!(config.ledger, LedgerConfig::default());
        assert_eq!(config.assets.native_coin_type, NATIVE_COIN_TYPE);
    }

    #[test]
    fn test_asset_registry() {
        let file = write_config(
            r#"
            [network]
            name = "mainnet"
            rpc_url = "https://api.mainnet.iota.cafe"

            [ledger]
            page_size = 50
            max_pages = 0

            [[assets.registry]]
            coin_type = "0x5::hero::HERO"
            symbol = "HERO"
            decimals = 6
            "#,
        );

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.decimals_for("0x5::hero::HERO"), Some(6));
        assert_eq!(config.symbol_for("0x5::hero::HERO"), Some("HERO"));
        assert_eq!(config.decimals_for("0x6::other::OTHER"), None);

        let builder = config.builder_config();
        assert_eq!(builder.limits.page_size, 50);
        assert_eq!(builder.limits.max_pages, None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let file = write_config(
            r#"
            [network]
            name = "testnet"
            rpc_url = "ftp://example.com"
            "#,
        );
        let err = Config::from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("rpc_url"));

        let mut config = Config::default();
        config.ledger.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Config::from_file("/nonexistent/coin-send.toml").is_err());
    }
}
