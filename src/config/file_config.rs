use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub default_page_size: Option<usize>,
    pub max_page_size: Option<usize>,
    pub cursor_lookahead: Option<bool>,
    pub metadata_cache_ttl_secs: Option<u64>,

    // Sections
    pub retry: Option<RetryConfig>,
    pub exchange_rates: Option<ExchangeRatesConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ExchangeRatesConfig {
    pub default_rate: Option<Decimal>,
    /// Year (as a TOML key) to domestic units per foreign unit.
    pub rates: Option<BTreeMap<String, Decimal>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::parse(
            r#"
            db_path = "/data/investments.db"
            default_page_size = 25
            cursor_lookahead = true

            [retry]
            max_attempts = 5

            [exchange_rates]
            default_rate = 15000

            [exchange_rates.rates]
            2021 = 14300
            2025 = 16250.5
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path.as_deref(), Some("/data/investments.db"));
        assert_eq!(config.default_page_size, Some(25));
        assert_eq!(config.max_page_size, None);
        assert_eq!(config.cursor_lookahead, Some(true));
        assert_eq!(config.retry.unwrap().max_attempts, Some(5));

        let rates = config.exchange_rates.unwrap();
        assert_eq!(rates.default_rate, Some(Decimal::from(15000)));
        let table = rates.rates.unwrap();
        assert_eq!(table["2021"], Decimal::from(14300));
        assert_eq!(table["2025"], Decimal::from_str("16250.5").unwrap());
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        assert!(FileConfig::parse("default_page_size = \"ten\"").is_err());
    }
}
