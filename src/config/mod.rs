mod file_config;

pub use file_config::{ExchangeRatesConfig, FileConfig, RetryConfig};

use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;
pub const DEFAULT_METADATA_CACHE_TTL_SECS: u64 = 300;
/// One week.
pub const MAX_METADATA_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub cursor_lookahead: bool,
    pub metadata_cache_ttl_secs: u64,
    pub retry_max_attempts: u32,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            cursor_lookahead: false,
            metadata_cache_ttl_secs: DEFAULT_METADATA_CACHE_TTL_SECS,
            retry_max_attempts: RetrySettings::default().max_attempts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub paging: PagingSettings,
    pub retry: RetrySettings,
    pub metadata_cache_ttl_secs: u64,
    pub exchange_rates: ExchangeRateSettings,
}

impl AppConfig {
    /// The metadata TTL as a `chrono` duration, saturating for values that
    /// did not go through `resolve`.
    pub fn metadata_cache_ttl(&self) -> chrono::Duration {
        i64::try_from(self.metadata_cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| anyhow!("db_path must be specified via --db-path or in config file"))?;

        // The database file itself may not exist yet, its directory must
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let paging = PagingSettings {
            default_page_size: file.default_page_size.unwrap_or(cli.default_page_size),
            max_page_size: file.max_page_size.unwrap_or(cli.max_page_size),
            cursor_lookahead: file.cursor_lookahead.unwrap_or(cli.cursor_lookahead),
        };
        if paging.default_page_size == 0 {
            bail!("default_page_size must be at least 1");
        }
        if paging.max_page_size < paging.default_page_size {
            bail!(
                "max_page_size ({}) must not be smaller than default_page_size ({})",
                paging.max_page_size,
                paging.default_page_size
            );
        }

        let retry_file = file.retry.unwrap_or_default();
        let retry_defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_attempts: retry_file.max_attempts.unwrap_or(cli.retry_max_attempts),
            base_delay_ms: retry_file
                .base_delay_ms
                .unwrap_or(retry_defaults.base_delay_ms),
            max_delay_ms: retry_file
                .max_delay_ms
                .unwrap_or(retry_defaults.max_delay_ms),
        };
        if retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if retry.max_delay_ms < retry.base_delay_ms {
            bail!(
                "retry.max_delay_ms ({}) must not be smaller than retry.base_delay_ms ({})",
                retry.max_delay_ms,
                retry.base_delay_ms
            );
        }

        let metadata_cache_ttl_secs = file
            .metadata_cache_ttl_secs
            .unwrap_or(cli.metadata_cache_ttl_secs);
        if metadata_cache_ttl_secs > MAX_METADATA_CACHE_TTL_SECS {
            bail!(
                "metadata_cache_ttl_secs must be at most {}, got {}",
                MAX_METADATA_CACHE_TTL_SECS,
                metadata_cache_ttl_secs
            );
        }

        let exchange_rates = ExchangeRateSettings::from_file(file.exchange_rates)?;

        Ok(Self {
            db_path,
            paging,
            retry,
            metadata_cache_ttl_secs,
            exchange_rates,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingSettings {
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Fetch one extra row in cursor mode so `has_more` is exact.
    pub cursor_lookahead: bool,
}

impl Default for PagingSettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            cursor_lookahead: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
        }
    }
}

/// Year-keyed foreign to domestic conversion rates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRateSettings {
    pub default_rate: Decimal,
    pub rates: BTreeMap<i32, Decimal>,
}

impl ExchangeRateSettings {
    /// A `[exchange_rates.rates]` table replaces the built-in rates entirely.
    fn from_file(file: Option<ExchangeRatesConfig>) -> Result<Self> {
        let defaults = Self::default();
        let file = match file {
            Some(file) => file,
            None => return Ok(defaults),
        };

        let default_rate = file.default_rate.unwrap_or(defaults.default_rate);
        if default_rate <= Decimal::ZERO {
            bail!("exchange_rates.default_rate must be positive, got {}", default_rate);
        }

        let rates = match file.rates {
            None => defaults.rates,
            Some(raw) => {
                let mut rates = BTreeMap::new();
                for (year, rate) in raw {
                    let parsed_year: i32 = year
                        .trim()
                        .parse()
                        .with_context(|| format!("Invalid exchange rate year '{}'", year))?;
                    if rate <= Decimal::ZERO {
                        bail!("Exchange rate for {} must be positive, got {}", year, rate);
                    }
                    rates.insert(parsed_year, rate);
                }
                rates
            }
        };

        Ok(Self {
            default_rate,
            rates,
        })
    }
}

impl Default for ExchangeRateSettings {
    fn default() -> Self {
        Self {
            default_rate: Decimal::from(14000),
            rates: [
                (2019, 14000),
                (2020, 14500),
                (2021, 14300),
                (2022, 14800),
                (2023, 15500),
                (2024, 16000),
            ]
            .into_iter()
            .map(|(year, rate)| (year, Decimal::from(rate)))
            .collect(),
        }
    }
}
