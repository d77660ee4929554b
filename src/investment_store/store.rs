//! SQLite-backed investment store implementation.
//!
//! This module provides the `SqliteInvestmentStore`, which serves filtered,
//! sorted and windowed reads over the flat `investment_records` table.

use super::models::{
    AmountRange, Dimension, GroupKey, InvestmentRecord, InvestmentStatus, NewInvestmentRecord,
    SortField, SortValue,
};
use super::record_query::{KeysetBoundary, RecordFilter, RecordQuery};
use super::schema::{records_table, INVESTMENT_VERSIONED_SCHEMAS, RECORDS_TABLE_NAME};
use super::trait_def::InvestmentStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, Connection, ToSql};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const RECORD_COLUMNS: &str = "id, year, province, sector, region, country, status, \
     domestic_amount, foreign_amount, projects, domestic_workers, foreign_workers";

/// SQLite-backed store for investment records.
#[derive(Clone)]
pub struct SqliteInvestmentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteInvestmentStore {
    /// Open (or create) the records database at `db_path`.
    ///
    /// A fresh file gets the latest schema. An existing file must carry a known
    /// schema version and pass validation for it.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open investment database")?;

        if is_new_db {
            info!("Creating new investment database at {:?}", path);
            let latest = &INVESTMENT_VERSIONED_SCHEMAS[INVESTMENT_VERSIONED_SCHEMAS.len() - 1];
            latest.create(&conn)?;
        } else {
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;
            if db_version < 1 {
                bail!(
                    "Investment database version {} is invalid (expected >= 1)",
                    db_version
                );
            }

            let version_index = INVESTMENT_VERSIONED_SCHEMAS
                .iter()
                .position(|s| s.version == db_version as usize)
                .with_context(|| format!("Unknown investment database version {}", db_version))?;
            INVESTMENT_VERSIONED_SCHEMAS[version_index]
                .validate(&conn)
                .with_context(|| {
                    format!(
                        "Investment database schema validation failed for version {}",
                        db_version
                    )
                })?;
        }

        let record_count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", RECORDS_TABLE_NAME),
            [],
            |r| r.get(0),
        )?;
        info!("Opened investment database: {} records", record_count);
        for index in records_table().missing_indices(&conn)? {
            warn!("Investment database is missing index '{}'", index);
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Bulk-insert records in one transaction. Returns the assigned ids in
    /// input order. Nothing is written if any record breaks the amount partition.
    pub fn insert_records(&self, records: &[NewInvestmentRecord]) -> Result<Vec<i64>> {
        for (index, record) in records.iter().enumerate() {
            if let Err(reason) = record.validate() {
                bail!("Record #{} rejected: {}", index, reason);
            }
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (year, province, sector, region, country, status, \
                 domestic_amount, foreign_amount, projects, domestic_workers, foreign_workers) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                RECORDS_TABLE_NAME
            ))?;
            for record in records {
                stmt.execute(params![
                    record.year,
                    record.province,
                    record.sector,
                    record.region,
                    record.country,
                    record.status.to_db_str(),
                    record.domestic_amount.normalize().to_string(),
                    record.foreign_amount.normalize().to_string(),
                    record.projects,
                    record.domestic_workers,
                    record.foreign_workers,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        info!("Inserted {} investment records", ids.len());
        Ok(ids)
    }

    /// Names of the expected secondary indices that exist in the database.
    pub fn existing_indices(&self) -> Result<Vec<&'static str>> {
        let conn = self.conn.lock().unwrap();
        records_table().existing_indices(&conn)
    }

    /// Expected secondary indices that are absent from the database.
    pub fn missing_indices(&self) -> Result<Vec<&'static str>> {
        let conn = self.conn.lock().unwrap();
        records_table().missing_indices(&conn)
    }

    /// Number of distinct non-null values of `dimension`.
    pub fn distinct_count(&self, dimension: Dimension) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(DISTINCT {}) FROM {}",
                dimension.column(),
                RECORDS_TABLE_NAME
            ),
            [],
            |r| r.get(0),
        )?;
        Ok(count as u64)
    }

    // =========================================================================
    // Internal Helper Methods
    // =========================================================================

    /// SQL expression a field is ordered and compared by. Amount columns hold
    /// decimal text, so they are compared numerically.
    fn order_expr(field: SortField) -> String {
        if field.is_amount() {
            format!("CAST({} AS REAL)", field.column())
        } else {
            field.column().to_string()
        }
    }

    fn where_clause(
        filter: &RecordFilter,
        boundary: Option<&KeysetBoundary>,
    ) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(year) = filter.year {
            params.push(Box::new(year));
            conditions.push(format!("year = ?{}", params.len()));
        }
        let text_filters = [
            ("sector", &filter.sector),
            ("region", &filter.region),
            ("province", &filter.province),
            ("country", &filter.country),
        ];
        for (column, value) in text_filters {
            if let Some(value) = value {
                params.push(Box::new(value.clone()));
                conditions.push(format!("{} = ?{}", column, params.len()));
            }
        }
        if let Some(status) = filter.status {
            params.push(Box::new(status.to_db_str()));
            conditions.push(format!("status = ?{}", params.len()));
        }

        if let Some(boundary) = boundary {
            let value: Box<dyn ToSql> = match &boundary.value {
                SortValue::Null => Box::new(rusqlite::types::Null),
                SortValue::Integer(v) => Box::new(*v),
                SortValue::Amount(v) => Box::new(v.to_f64().unwrap_or(f64::NAN)),
                SortValue::Text(v) => Box::new(v.clone()),
            };
            params.push(value);
            conditions.push(format!(
                "{} {} ?{}",
                Self::order_expr(boundary.field),
                boundary.sql_operator(),
                params.len()
            ));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (clause, params)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<InvestmentRecord> {
        let status_str: String = row.get(6)?;
        let status = InvestmentStatus::from_db_str(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                Type::Text,
                format!("unknown investment status '{}'", status_str).into(),
            )
        })?;

        Ok(InvestmentRecord {
            id: row.get(0)?,
            year: row.get(1)?,
            province: row.get(2)?,
            sector: row.get(3)?,
            region: row.get(4)?,
            country: row.get(5)?,
            status,
            domestic_amount: decimal_column(row, 7)?,
            foreign_amount: decimal_column(row, 8)?,
            projects: row.get(9)?,
            domestic_workers: row.get(10)?,
            foreign_workers: row.get(11)?,
        })
    }
}

/// Read a decimal column stored as TEXT. INTEGER and REAL cells written by
/// other tools are accepted too.
fn decimal_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Decimal> {
    let conversion_error = |err: rust_decimal::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
    };
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(Decimal::ZERO),
        ValueRef::Integer(v) => Ok(Decimal::from(v)),
        ValueRef::Real(v) => Decimal::try_from(v).map_err(conversion_error),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })?;
            Decimal::from_str(text.trim()).map_err(conversion_error)
        }
        ValueRef::Blob(_) => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "amount".to_string(),
            Type::Blob,
        )),
    }
}

impl InvestmentStore for SqliteInvestmentStore {
    fn query(&self, query: &RecordQuery) -> Result<Vec<InvestmentRecord>> {
        let (where_clause, mut params) = Self::where_clause(&query.filter, query.boundary.as_ref());

        let mut sql = format!(
            "SELECT {} FROM {} {}",
            RECORD_COLUMNS, RECORDS_TABLE_NAME, where_clause
        );
        if let Some(sort) = &query.sort {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                Self::order_expr(sort.field),
                sort.order.as_sql()
            ));
        }
        if query.limit.is_some() || query.offset > 0 {
            // SQLite needs a LIMIT before OFFSET; -1 means unbounded
            let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
            params.push(Box::new(limit));
            sql.push_str(&format!(" LIMIT ?{}", params.len()));
            params.push(Box::new(query.offset as i64));
            sql.push_str(&format!(" OFFSET ?{}", params.len()));
        }
        debug!("Investment query: {}", sql);

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let records = stmt
            .query_map(params_refs.as_slice(), Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn count(&self, filter: &RecordFilter) -> Result<u64> {
        let (where_clause, params) = Self::where_clause(filter, None);
        let sql = format!("SELECT COUNT(*) FROM {} {}", RECORDS_TABLE_NAME, where_clause);
        debug!("Investment count: {}", sql);

        let conn = self.conn.lock().unwrap();
        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let count: i64 = conn.query_row(&sql, params_refs.as_slice(), |r| r.get(0))?;
        Ok(count as u64)
    }

    fn distinct_values(&self, dimension: Dimension) -> Result<Vec<GroupKey>> {
        let conn = self.conn.lock().unwrap();
        let values = match dimension {
            Dimension::Year => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT DISTINCT year FROM {} ORDER BY year DESC",
                    RECORDS_TABLE_NAME
                ))?;
                let years = stmt
                    .query_map([], |row| row.get::<_, i32>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                years.into_iter().map(GroupKey::Year).collect()
            }
            _ => {
                let column = dimension.column();
                let mut stmt = conn.prepare(&format!(
                    "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL ORDER BY {col}",
                    col = column,
                    table = RECORDS_TABLE_NAME
                ))?;
                let texts = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                texts.into_iter().map(GroupKey::Text).collect()
            }
        };
        Ok(values)
    }

    fn domestic_amount_range(&self) -> Result<Option<AmountRange>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT domestic_amount FROM {} WHERE CAST(domestic_amount AS REAL) > 0",
            RECORDS_TABLE_NAME
        ))?;
        let amounts = stmt
            .query_map([], |row| decimal_column(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(amounts.into_iter().fold(None, |range, amount| match range {
            None => Some(AmountRange {
                min: amount,
                max: amount,
            }),
            Some(AmountRange { min, max }) => Some(AmountRange {
                min: min.min(amount),
                max: max.max(amount),
            }),
        }))
    }
}
