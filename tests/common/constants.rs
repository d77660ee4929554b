//! Shared constants for integration tests
//!
//! Figures describing the sample dataset built by `fixtures::sample_records`.
//! When the dataset changes, update only this file.

/// Number of records in the sample dataset
pub const TOTAL_RECORDS: u64 = 12;

/// PMDN records in the sample dataset
pub const DOMESTIC_RECORDS: u64 = 7;

/// PMA records in the sample dataset
pub const FOREIGN_RECORDS: u64 = 5;

/// Distinct years, newest first
pub const YEARS: [i32; 4] = [2023, 2022, 2021, 2020];

/// Distinct non-null sectors, ascending
pub const SECTORS: [&str; 4] = ["Agriculture", "Manufacturing", "Mining", "Trade"];

/// Records in the Jawa region
pub const JAWA_RECORDS: u64 = 5;

/// Domestic amount shared by two 2021 records
pub const TIED_DOMESTIC_AMOUNT: i64 = 500;
