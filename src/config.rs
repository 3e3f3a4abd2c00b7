use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// PostgreSQL connection URL. Required unless running with `--memory`.
    #[serde(default)]
    pub postgres_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Currency used when a funding request does not name one
    pub default_currency: String,
    /// Upper bound for a single ledger operation, including commit
    pub op_timeout_ms: u64,
    /// Number of statements returned by the movement summary
    pub recent_statements_limit: i64,
    /// Whether funding writes a CREDIT/DEBIT statement next to the balance update
    pub fund_writes_statement: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_currency: "BRL".to_string(),
            op_timeout_ms: 5_000,
            recent_statements_limit: 10,
            fund_writes_statement: true,
        }
    }
}

impl LedgerConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 30,
            acquire_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: ledger.log
use_json: false
rotation: daily
gateway:
  host: 0.0.0.0
  port: 8080
"#;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let cfg = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(cfg.gateway.port, 8080);
        assert_eq!(cfg.ledger.default_currency, "BRL");
        assert_eq!(cfg.ledger.recent_statements_limit, 10);
        assert!(cfg.ledger.fund_writes_statement);
        assert_eq!(cfg.database.max_connections, 30);
        assert!(cfg.postgres_url.is_none());
    }

    #[test]
    fn test_ledger_section_override() {
        let yaml = format!(
            "{}ledger:\n  default_currency: USD\n  op_timeout_ms: 250\n  recent_statements_limit: 3\n  fund_writes_statement: false\n",
            MINIMAL
        );
        let cfg = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(cfg.ledger.default_currency, "USD");
        assert_eq!(cfg.ledger.op_timeout(), Duration::from_millis(250));
        assert!(!cfg.ledger.fund_writes_statement);
    }

    #[test]
    fn test_missing_gateway_is_an_error() {
        let yaml = "log_level: info\nlog_dir: x\nlog_file: y\nuse_json: true\nrotation: never\n";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }
}
