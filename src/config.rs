//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::api::http::HttpSettings;
use crate::policy::PolicySettings;
use crate::trading::OrchestratorSettings;
use crate::wallet::Network;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub trading: TradingConfig,
}

/// Deployment the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEnvironment {
    Local,
    Development,
    Production,
}

impl GatewayEnvironment {
    pub fn default_api_url(&self) -> &'static str {
        match self {
            GatewayEnvironment::Local => "http://localhost:3000",
            GatewayEnvironment::Development => "https://api.dev.amm-gateway.example",
            GatewayEnvironment::Production => "https://api.amm-gateway.example",
        }
    }

    /// Environment implied by a bare network in the legacy shape
    fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => GatewayEnvironment::Production,
            Network::Local => GatewayEnvironment::Local,
            Network::Testnet | Network::Signet | Network::Regtest => {
                GatewayEnvironment::Development
            }
        }
    }
}

impl std::fmt::Display for GatewayEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayEnvironment::Local => write!(f, "local"),
            GatewayEnvironment::Development => write!(f, "development"),
            GatewayEnvironment::Production => write!(f, "production"),
        }
    }
}

/// Client target, in either the legacy or the environment shape
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ClientSettings {
    /// Network only; environment and URL are implied
    Legacy { network: Network },
    Environment {
        environment: GatewayEnvironment,
        network: Network,
        #[serde(default)]
        api_url: Option<String>,
    },
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings::Environment {
            environment: GatewayEnvironment::Local,
            network: Network::Regtest,
            api_url: None,
        }
    }
}

/// Client target with every implied value filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClient {
    pub network: Network,
    pub environment: GatewayEnvironment,
    pub api_base_url: String,
}

impl ClientSettings {
    pub fn resolve(&self) -> ResolvedClient {
        match self {
            ClientSettings::Legacy { network } => {
                let environment = GatewayEnvironment::for_network(*network);
                ResolvedClient {
                    network: *network,
                    environment,
                    api_base_url: environment.default_api_url().to_string(),
                }
            }
            ClientSettings::Environment {
                environment,
                network,
                api_url,
            } => ResolvedClient {
                network: *network,
                environment: *environment,
                api_base_url: api_url
                    .clone()
                    .unwrap_or_else(|| environment.default_api_url().to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retry budget for read-only calls
    #[serde(default = "default_read_retry_ms")]
    pub read_retry_max_elapsed_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_feature_flags_ttl_ms")]
    pub feature_flags_ttl_ms: u64,
    #[serde(default = "default_min_amounts_ttl_ms")]
    pub min_amounts_ttl_ms: u64,
    #[serde(default = "default_allowed_assets_ttl_ms")]
    pub allowed_assets_ttl_ms: u64,
    #[serde(default = "default_ping_ttl_ms")]
    pub ping_ttl_ms: u64,
    /// Output-side minimums are relaxed to this share of the input minimum
    #[serde(default = "default_output_min_relaxation_bps")]
    pub output_min_relaxation_bps: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    #[serde(default = "default_max_slippage_bps")]
    pub default_max_slippage_bps: u32,
    #[serde(default)]
    pub integrator_public_key: Option<String>,
    #[serde(default)]
    pub integrator_fee_bps: Option<u32>,
}

// Default value functions
fn default_timeout_ms() -> u64 {
    15_000
}

fn default_read_retry_ms() -> u64 {
    5_000
}

fn default_feature_flags_ttl_ms() -> u64 {
    5_000
}

fn default_min_amounts_ttl_ms() -> u64 {
    5_000
}

fn default_allowed_assets_ttl_ms() -> u64 {
    60_000
}

fn default_ping_ttl_ms() -> u64 {
    2_000
}

fn default_output_min_relaxation_bps() -> u32 {
    5_000
}

fn default_max_slippage_bps() -> u32 {
    100
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            read_retry_max_elapsed_ms: default_read_retry_ms(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            feature_flags_ttl_ms: default_feature_flags_ttl_ms(),
            min_amounts_ttl_ms: default_min_amounts_ttl_ms(),
            allowed_assets_ttl_ms: default_allowed_assets_ttl_ms(),
            ping_ttl_ms: default_ping_ttl_ms(),
            output_min_relaxation_bps: default_output_min_relaxation_bps(),
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_max_slippage_bps: default_max_slippage_bps(),
            integrator_public_key: None,
            integrator_fee_bps: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix AMM_GATEWAY__)
            .add_source(
                config::Environment::with_prefix("AMM_GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let ttls = [
            ("feature_flags_ttl_ms", self.policy.feature_flags_ttl_ms),
            ("min_amounts_ttl_ms", self.policy.min_amounts_ttl_ms),
            ("allowed_assets_ttl_ms", self.policy.allowed_assets_ttl_ms),
            ("ping_ttl_ms", self.policy.ping_ttl_ms),
        ];
        for (name, ttl) in ttls {
            if ttl == 0 {
                anyhow::bail!("policy.{} must be positive", name);
            }
        }

        if self.policy.output_min_relaxation_bps > 10_000 {
            anyhow::bail!("output_min_relaxation_bps cannot exceed 10000 (100%)");
        }

        if self.trading.default_max_slippage_bps > 10_000 {
            anyhow::bail!("default_max_slippage_bps cannot exceed 10000 (100%)");
        }

        if let Some(fee) = self.trading.integrator_fee_bps {
            if fee > 10_000 {
                anyhow::bail!("integrator_fee_bps cannot exceed 10000 (100%)");
            }
            if self.trading.integrator_public_key.is_none() {
                anyhow::bail!("integrator_fee_bps requires integrator_public_key");
            }
        }

        if self.http.timeout_ms == 0 {
            anyhow::bail!("http.timeout_ms must be positive");
        }

        if let ClientSettings::Environment {
            api_url: Some(url), ..
        } = &self.client
        {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("client.api_url must be an http(s) URL, got {}", mask_url(url));
            }
        }

        let client = self.client.resolve();
        if client.environment == GatewayEnvironment::Production && client.network != Network::Mainnet
        {
            tracing::warn!("Production environment configured with a non-mainnet network");
        }

        Ok(())
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_millis(self.http.timeout_ms),
            read_retry_max_elapsed: Duration::from_millis(self.http.read_retry_max_elapsed_ms),
        }
    }

    pub fn policy_settings(&self) -> PolicySettings {
        PolicySettings {
            feature_flags_ttl: Duration::from_millis(self.policy.feature_flags_ttl_ms),
            min_amounts_ttl: Duration::from_millis(self.policy.min_amounts_ttl_ms),
            allowed_assets_ttl: Duration::from_millis(self.policy.allowed_assets_ttl_ms),
            ping_ttl: Duration::from_millis(self.policy.ping_ttl_ms),
            output_min_relaxation_bps: self.policy.output_min_relaxation_bps,
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            default_max_slippage_bps: self.trading.default_max_slippage_bps,
            integrator_public_key: self.trading.integrator_public_key.clone(),
            integrator_fee_bps: self.trading.integrator_fee_bps,
        }
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        let client = self.client.resolve();
        let shape = match self.client {
            ClientSettings::Legacy { .. } => "legacy",
            ClientSettings::Environment { .. } => "environment",
        };
        format!(
            r#"Configuration:
  Client:
    shape: {}
    environment: {}
    network: {}
    api_url: {}
  HTTP:
    timeout: {}ms
    read_retry_budget: {}ms
  Policy:
    feature_flags_ttl: {}ms
    min_amounts_ttl: {}ms
    allowed_assets_ttl: {}ms
    ping_ttl: {}ms
    output_min_relaxation: {}bps
  Trading:
    default_max_slippage: {}bps
    integrator: {}
    integrator_fee: {}
"#,
            shape,
            client.environment,
            client.network,
            mask_url(&client.api_base_url),
            self.http.timeout_ms,
            self.http.read_retry_max_elapsed_ms,
            self.policy.feature_flags_ttl_ms,
            self.policy.min_amounts_ttl_ms,
            self.policy.allowed_assets_ttl_ms,
            self.policy.ping_ttl_ms,
            self.policy.output_min_relaxation_bps,
            self.trading.default_max_slippage_bps,
            self.trading
                .integrator_public_key
                .as_deref()
                .map(mask_key)
                .unwrap_or_else(|| "(not set)".to_string()),
            self.trading
                .integrator_fee_bps
                .map(|bps| format!("{}bps", bps))
                .unwrap_or_else(|| "(not set)".to_string()),
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load_toml(body: &str) -> Result<Config> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        Config::load(file.path())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trading.default_max_slippage_bps, 100);
        assert_eq!(config.policy.output_min_relaxation_bps, 5_000);
        let client = config.client.resolve();
        assert_eq!(client.network, Network::Regtest);
        assert_eq!(client.api_base_url, "http://localhost:3000");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/amm-gateway.toml").unwrap();
        assert_eq!(config.http.timeout_ms, 15_000);
    }

    #[test]
    fn test_legacy_shape_resolves_from_network() {
        let config = load_toml(
            r#"
[client]
shape = "legacy"
network = "mainnet"
"#,
        )
        .unwrap();
        let client = config.client.resolve();
        assert_eq!(client.environment, GatewayEnvironment::Production);
        assert_eq!(client.api_base_url, "https://api.amm-gateway.example");
    }

    #[test]
    fn test_environment_shape_with_url_override() {
        let config = load_toml(
            r#"
[client]
shape = "environment"
environment = "development"
network = "regtest"
api_url = "http://10.0.0.5:8080"

[policy]
ping_ttl_ms = 500

[trading]
integrator_public_key = "02aabbccddeeff00112233"
integrator_fee_bps = 25
"#,
        )
        .unwrap();
        let client = config.client.resolve();
        assert_eq!(client.api_base_url, "http://10.0.0.5:8080");
        assert_eq!(config.policy_settings().ping_ttl, Duration::from_millis(500));
        assert_eq!(config.orchestrator_settings().integrator_fee_bps, Some(25));
        assert!(config.masked_display().contains("02aabb...2233"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(load_toml("[policy]\nmin_amounts_ttl_ms = 0\n").is_err());
        assert!(load_toml("[trading]\ndefault_max_slippage_bps = 10001\n").is_err());
        assert!(load_toml("[policy]\noutput_min_relaxation_bps = 20000\n").is_err());
        assert!(load_toml("[trading]\nintegrator_fee_bps = 5\n").is_err());
        assert!(load_toml("[client]\nshape = \"bogus\"\n").is_err());
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(mask_url("https://api.example.com"), "https://api.example.com");
    }

    #[test]
    fn test_mask_key_counts_characters() {
        assert_eq!(mask_key("02aabbccddeeff00112233"), "02aabb...2233");
        assert_eq!(mask_key("short"), "***");
        assert_eq!(mask_key("ключ-интегратора-ёё"), "ключ-и...а-ёё");
    }
}
