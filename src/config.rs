use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub prices: PricesConfig,
    #[serde(default)]
    pub swap: SwapConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PricesConfig {
    pub base_url: String,
    pub ttl_secs: u64,
    pub timeout_secs: u64,
    /// Extra symbol -> upstream id mappings, merged over the built-ins
    #[serde(default)]
    pub symbol_ids: HashMap<String, String>,
    /// Serve settable static quotes instead of calling upstream
    pub mock_mode: bool,
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            ttl_secs: 60,
            timeout_secs: 10,
            symbol_ids: HashMap::new(),
            mock_mode: false,
        }
    }
}

/// Swap fee in basis points. Stored as an integer so the configured
/// rate survives YAML without a float round trip.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SwapConfig {
    pub fee_bps: u32,
}

impl SwapConfig {
    /// Fee as a fraction (35 bps -> 0.0035).
    pub fn fee_pct(&self) -> Decimal {
        Decimal::new(self.fee_bps as i64, 4)
    }
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self { fee_bps: 35 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "./data/audit/ledger.csv".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotifyConfig {
    pub queue_size: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { queue_size: 8192 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminConfig {
    /// Shared secret for the admin review surface (X-Admin-Secret)
    pub secret: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            secret: "change-me".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let yaml = r#"
log_level: info
log_dir: ./logs
log_file: custodia.log
use_json: false
rotation: daily
gateway:
  host: 127.0.0.1
  port: 8080
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.prices.ttl_secs, 60);
        assert_eq!(config.swap.fee_bps, 35);
        assert!(!config.audit.enabled);
        assert_eq!(config.notify.queue_size, 8192);
    }

    #[test]
    fn test_fee_bps_to_fraction() {
        assert_eq!(SwapConfig { fee_bps: 35 }.fee_pct(), dec!(0.0035));
        assert_eq!(SwapConfig { fee_bps: 0 }.fee_pct(), dec!(0));
        assert_eq!(SwapConfig { fee_bps: 100 }.fee_pct(), dec!(0.01));
    }

    #[test]
    fn test_symbol_id_overrides_parse() {
        let yaml = r#"
log_level: info
log_dir: ./logs
log_file: custodia.log
use_json: false
rotation: never
gateway:
  host: 0.0.0.0
  port: 9000
prices:
  base_url: http://localhost:9100
  ttl_secs: 5
  timeout_secs: 2
  mock_mode: true
  symbol_ids:
    PEPE: pepe
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.prices.mock_mode);
        assert_eq!(config.prices.symbol_ids["PEPE"], "pepe");
    }
}
