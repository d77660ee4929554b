//! SQLite schema for the investment records database.
//!
//! Amounts are stored as canonical decimal TEXT so they read back exactly.
//! Categorical columns are free text: no foreign keys, no normalization.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

pub const RECORDS_TABLE_NAME: &str = "investment_records";

// =============================================================================
// Version 1 - Investment records
// =============================================================================

const INVESTMENT_RECORDS_TABLE_V1: Table = Table {
    name: RECORDS_TABLE_NAME,
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("province", &SqlType::Text),
        sqlite_column!("sector", &SqlType::Text),
        sqlite_column!("region", &SqlType::Text),
        sqlite_column!("country", &SqlType::Text),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!(
            "domestic_amount",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'0'")
        ),
        sqlite_column!(
            "foreign_amount",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'0'")
        ),
        sqlite_column!(
            "projects",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "domestic_workers",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "foreign_workers",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_investment_records_year", "year"),
        ("idx_investment_records_sector", "sector"),
        ("idx_investment_records_region", "region"),
        ("idx_investment_records_status", "status"),
    ],
};

pub const INVESTMENT_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[INVESTMENT_RECORDS_TABLE_V1],
}];

/// The records table of the latest schema version.
pub fn records_table() -> &'static Table {
    &INVESTMENT_VERSIONED_SCHEMAS[INVESTMENT_VERSIONED_SCHEMAS.len() - 1].tables[0]
}
