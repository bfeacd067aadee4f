//! Node configuration loading and management.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use htlcswap_core::{AssetId, EngineConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Full configuration for the swap node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapNodeConfig {
    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Swap engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// In-memory ledgers to route assets to.
    #[serde(default = "default_ledgers")]
    pub ledgers: Vec<LedgerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// One in-memory ledger and the assets it funds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Adapter identifier, also the prefix of its transaction references.
    pub id: String,
    /// Initial funding balance per asset. Every listed asset is routed here.
    #[serde(default)]
    pub balances: BTreeMap<AssetId, Decimal>,
    /// Artificial delay per ledger call, in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
}

impl LedgerConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    9001
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_ledgers() -> Vec<LedgerConfig> {
    let mut balances = BTreeMap::new();
    if let Ok(btc) = AssetId::new("btc") {
        balances.insert(btc, Decimal::from(1));
    }
    if let Ok(depix) = AssetId::new("depix") {
        balances.insert(depix, Decimal::from(10_000));
    }
    vec![LedgerConfig {
        id: "ledger-memory".into(),
        balances,
        latency_ms: 0,
    }]
}

impl Default for SwapNodeConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
            ledgers: default_ledgers(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SwapNodeConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: SwapNodeConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The API listen socket, as `addr:port`.
    pub fn api_socket(&self) -> String {
        format!("{}:{}", self.api.listen_addr, self.api.port)
    }

    /// Reject configurations the node cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.engine.validate()?;
        if self.ledgers.is_empty() {
            anyhow::bail!("at least one [[ledgers]] entry is required");
        }
        let mut seen = std::collections::HashSet::new();
        for ledger in &self.ledgers {
            if !seen.insert(ledger.id.as_str()) {
                anyhow::bail!("duplicate ledger id {}", ledger.id);
            }
            if ledger.balances.is_empty() {
                anyhow::bail!("ledger {} lists no assets", ledger.id);
            }
        }
        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => anyhow::bail!("unknown log format {} (expected text or json)", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SwapNodeConfig::default();
        assert_eq!(config.api.port, 9001);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.engine.timelock_duration_secs, 86_400);
        assert_eq!(config.ledgers.len(), 1);
        assert_eq!(config.ledgers[0].balances.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_socket() {
        let config = SwapNodeConfig::default();
        assert_eq!(config.api_socket(), "127.0.0.1:9001");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = SwapNodeConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let decoded: SwapNodeConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(decoded.api.port, config.api.port);
        assert_eq!(decoded.ledgers[0].balances, config.ledgers[0].balances);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let config = SwapNodeConfig::load(Path::new("/nonexistent/htlcswap.toml")).unwrap();
        assert_eq!(config.api.port, 9001);
    }

    #[test]
    fn test_config_from_toml_partial() {
        let toml_str = r#"
[api]
port = 8001

[engine]
timelock_duration_secs = 7200
cancel_policy = "either_party"

[[ledgers]]
id = "bitcoin-regtest"
latency_ms = 250
balances = { BTC = "0.5" }

[[ledgers]]
id = "liquid-regtest"
balances = { depix = 2500, lbtc = "1.25" }
"#;
        let config: SwapNodeConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.api.port, 8001);
        assert_eq!(config.engine.timelock_duration_secs, 7200);
        assert_eq!(config.engine.secret_len, 32);
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.ledgers.len(), 2);
        assert_eq!(config.ledgers[0].latency(), Duration::from_millis(250));
        assert_eq!(
            config.ledgers[0].balances[&AssetId::new("btc").unwrap()],
            Decimal::new(5, 1)
        );
        assert_eq!(
            config.ledgers[1].balances[&AssetId::new("depix").unwrap()],
            Decimal::from(2500)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_ledgers() {
        let mut config = SwapNodeConfig::default();
        config.ledgers.push(config.ledgers[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = SwapNodeConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }
}
