//! Sample datasets and pre-wired services.

use investment_data::clock::ManualClock;
use investment_data::config::PagingSettings;
use investment_data::investment_store::{
    InMemoryInvestmentStore, InvestmentStore, NewInvestmentRecord, SqliteInvestmentStore,
};
use investment_data::retry::{RecordingSleeper, RetryPolicy};
use investment_data::InvestmentService;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Twelve records over four years, with NULL categories, a tie on the
/// domestic amount (500) and a tie on 300.
pub fn sample_records() -> Vec<NewInvestmentRecord> {
    vec![
        NewInvestmentRecord::domestic(2020, dec("120"))
            .with_sector("Mining")
            .with_region("Sumatera")
            .with_province("Aceh")
            .with_projects(3)
            .with_workers(40, 0),
        NewInvestmentRecord::foreign(2020, dec("15"))
            .with_sector("Mining")
            .with_region("Sumatera")
            .with_country("Japan")
            .with_projects(1)
            .with_workers(12, 2),
        NewInvestmentRecord::domestic(2021, dec("500"))
            .with_sector("Trade")
            .with_region("Jawa")
            .with_province("DKI Jakarta"),
        NewInvestmentRecord::foreign(2021, dec("10"))
            .with_sector("Trade")
            .with_region("Jawa")
            .with_country("Singapore"),
        NewInvestmentRecord::domestic(2021, dec("500"))
            .with_sector("Mining")
            .with_region("Kalimantan"),
        NewInvestmentRecord::domestic(2022, dec("300"))
            .with_sector("Agriculture")
            .with_region("Jawa")
            .with_province("Jawa Barat"),
        NewInvestmentRecord::foreign(2022, dec("42.5"))
            .with_sector("Agriculture")
            .with_region("Sulawesi")
            .with_country("China"),
        NewInvestmentRecord::domestic(2022, dec("75.25"))
            .with_sector("Trade")
            .with_region("Sumatera"),
        NewInvestmentRecord::domestic(2023, dec("1000"))
            .with_sector("Mining")
            .with_region("Jawa"),
        NewInvestmentRecord::foreign(2023, dec("250"))
            .with_sector("Trade")
            .with_country("Japan"),
        NewInvestmentRecord::domestic(2023, dec("300")).with_region("Jawa"),
        NewInvestmentRecord::foreign(2023, dec("5"))
            .with_sector("Manufacturing")
            .with_region("Kalimantan")
            .with_country("Korea"),
    ]
}

/// The three-record example: 2021 PMDN 500, 2021 PMA 10, 2022 PMDN 300.
pub fn reference_records() -> Vec<NewInvestmentRecord> {
    vec![
        NewInvestmentRecord::domestic(2021, dec("500")),
        NewInvestmentRecord::foreign(2021, dec("10")),
        NewInvestmentRecord::domestic(2022, dec("300")),
    ]
}

/// A SQLite database in a temporary directory.
pub struct TestDb {
    pub store: Arc<SqliteInvestmentStore>,
    _temp_dir: TempDir, // Keep temp dir alive
}

impl TestDb {
    pub fn with_records(records: &[NewInvestmentRecord]) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteInvestmentStore::new(temp_dir.path().join("investments.db")).unwrap();
        store.insert_records(records).unwrap();
        Self {
            store: Arc::new(store),
            _temp_dir: temp_dir,
        }
    }

    pub fn seeded() -> Self {
        Self::with_records(&sample_records())
    }
}

/// A service with a manual clock and a sleeper that never waits.
pub struct TestService {
    pub service: InvestmentService,
    pub clock: Arc<ManualClock>,
    pub sleeper: Arc<RecordingSleeper>,
}

impl TestService {
    pub fn over(store: Arc<dyn InvestmentStore>) -> Self {
        Self::with_paging(store, PagingSettings::default())
    }

    pub fn with_paging(store: Arc<dyn InvestmentStore>, paging: PagingSettings) -> Self {
        let clock = Arc::new(ManualClock::default());
        let sleeper = Arc::new(RecordingSleeper::new());
        let service = InvestmentService::with_defaults(store)
            .with_paging(paging)
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(60),
            })
            .with_sleeper(sleeper.clone())
            .with_clock(clock.clone());
        Self {
            service,
            clock,
            sleeper,
        }
    }
}

/// An in-memory store holding the sample dataset, for failure injection.
pub fn flaky_sample_store() -> Arc<InMemoryInvestmentStore> {
    Arc::new(InMemoryInvestmentStore::with_records(&sample_records()).unwrap())
}
