use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use investment_data::config::{AppConfig, CliConfig, FileConfig};
use investment_data::investment_store::{
    DatabaseReport, Dimension, InvestmentStore, SqliteInvestmentStore,
};
use investment_data::query::{QueryParams, RawQueryParams};
use investment_data::{DataError, InvestmentService};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(name = "investment-query")]
#[command(about = "Query, aggregate and inspect investment records")]
struct CliArgs {
    /// Path to the SQLite investment database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Page size used when a request does not name one.
    #[clap(long, default_value_t = investment_data::config::DEFAULT_PAGE_SIZE)]
    pub default_page_size: usize,

    /// Largest page size a request may ask for.
    #[clap(long, default_value_t = investment_data::config::DEFAULT_MAX_PAGE_SIZE)]
    pub max_page_size: usize,

    /// Fetch one extra row in cursor mode so hasMore is exact.
    #[clap(long, default_value_t = false)]
    pub cursor_lookahead: bool,

    /// Seconds a metadata snapshot stays fresh.
    #[clap(long, default_value_t = investment_data::config::DEFAULT_METADATA_CACHE_TTL_SECS)]
    pub metadata_cache_ttl_secs: u64,

    /// Attempts per paginated read or metadata refresh.
    #[clap(long, default_value_t = 3)]
    pub retry_max_attempts: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default, Clone)]
struct FilterArgs {
    #[clap(long)]
    year: Option<String>,
    #[clap(long)]
    sector: Option<String>,
    #[clap(long)]
    region: Option<String>,
    #[clap(long)]
    province: Option<String>,
    #[clap(long)]
    country: Option<String>,
    /// PMDN, PMA, DOMESTIC or FOREIGN.
    #[clap(long)]
    status: Option<String>,
}

impl FilterArgs {
    fn raw(&self) -> RawQueryParams {
        RawQueryParams {
            year: self.year.clone(),
            sector: self.sector.clone(),
            region: self.region.clone(),
            province: self.province.clone(),
            country: self.country.clone(),
            status: self.status.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one page of records, by offset or by cursor.
    Page {
        #[command(flatten)]
        filter: FilterArgs,
        #[clap(long)]
        page: Option<String>,
        #[clap(long)]
        page_size: Option<String>,
        #[clap(long)]
        sort_by: Option<String>,
        #[clap(long)]
        sort_order: Option<String>,
        #[clap(long)]
        cursor: Option<String>,
        #[clap(long, default_value_t = false)]
        use_cursor: bool,
    },
    /// Group records by a dimension and sum both currency tracks.
    Aggregate {
        /// year, sector, region, province, country or status.
        #[clap(long)]
        group_by: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Per-year totals, optionally with foreign amounts converted and combined.
    Trend {
        #[command(flatten)]
        filter: FilterArgs,
        #[clap(long, default_value_t = false)]
        combined: bool,
    },
    /// Averages and medians over the filtered records.
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Distinct filter values and table-wide figures.
    Metadata,
    /// Convert a foreign amount to domestic currency.
    Convert {
        #[clap(long)]
        amount: Decimal,
        #[clap(long)]
        year: i32,
    },
    /// Dump every matching record as a JSON array.
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[clap(long)]
        sort_by: Option<String>,
        #[clap(long)]
        sort_order: Option<String>,
        #[clap(long, default_value_t = 500)]
        batch_size: usize,
    },
    /// Database health report.
    Status,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CombinedTrendPoint {
    #[serde(flatten)]
    bucket: investment_data::aggregation::AggregatedBucket,
    combined_domestic_total: Decimal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Conversion {
    amount: Decimal,
    year: i32,
    rate: Decimal,
    domestic: Decimal,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db_path.clone(),
        default_page_size: cli_args.default_page_size,
        max_page_size: cli_args.max_page_size,
        cursor_lookahead: cli_args.cursor_lookahead,
        metadata_cache_ttl_secs: cli_args.metadata_cache_ttl_secs,
        retry_max_attempts: cli_args.retry_max_attempts,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening investment database at {:?}...", config.db_path);
    let sqlite_store = Arc::new(SqliteInvestmentStore::new(&config.db_path)?);
    let store: Arc<dyn InvestmentStore> = sqlite_store.clone();
    let service = InvestmentService::new(store, &config);

    match cli_args.command {
        Command::Page {
            filter,
            page,
            page_size,
            sort_by,
            sort_order,
            cursor,
            use_cursor,
        } => {
            let raw = RawQueryParams {
                page,
                page_size,
                sort_by,
                sort_order,
                cursor,
                use_cursor: use_cursor.then(|| "true".to_string()),
                ..filter.raw()
            };
            print_json(&service.fetch_page_from(&raw).await?)?;
        }
        Command::Aggregate { group_by, filter } => {
            let dimension = Dimension::parse(&group_by)
                .ok_or_else(|| DataError::invalid(format!("unknown dimension '{}'", group_by)))?;
            let buckets = service
                .fetch_aggregate(dimension, &filter.raw().filter()?)
                .await?;
            print_json(&buckets)?;
        }
        Command::Trend { filter, combined } => {
            let buckets = service.yearly_trend(&filter.raw().filter()?).await?;
            if combined {
                let rates = service.exchange_rates();
                let mut points = Vec::with_capacity(buckets.len());
                for bucket in buckets {
                    if let Some(year) = bucket.key.as_year() {
                        points.push(CombinedTrendPoint {
                            combined_domestic_total: rates.combined_bucket_total(&bucket, year)?,
                            bucket,
                        });
                    }
                }
                print_json(&points)?;
            } else {
                print_json(&buckets)?;
            }
        }
        Command::Summary { filter } => {
            print_json(&service.summary(&filter.raw().filter()?).await?)?;
        }
        Command::Metadata => {
            let metadata = service.fetch_metadata().await?;
            print_json(metadata.snapshot.as_ref())?;
        }
        Command::Convert { amount, year } => {
            print_json(&Conversion {
                amount,
                year,
                rate: service.exchange_rates().rate_for(year),
                domestic: service.to_domestic(amount, year)?,
            })?;
        }
        Command::Export {
            filter,
            sort_by,
            sort_order,
            batch_size,
        } => {
            let raw = RawQueryParams {
                sort_by,
                sort_order,
                page_size: Some(batch_size.to_string()),
                ..filter.raw()
            };
            let params = QueryParams::from_raw(&raw, service.paging())?;
            let records = service
                .fetch_all(&params.filter, params.sort, batch_size, |progress| {
                    info!(
                        "Exported {}/{} records (page {}/{})",
                        progress.loaded, progress.total, progress.page, progress.total_pages
                    );
                })
                .await?;
            print_json(&records)?;
        }
        Command::Status => {
            print_json(&DatabaseReport::collect(&sqlite_store)?)?;
        }
    }

    Ok(())
}
