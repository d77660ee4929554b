//! InvestmentStore trait definition.
//!
//! This trait abstracts the tabular data store so the query builder, the
//! aggregator and the metadata cache can run against SQLite in production and
//! an in-memory table in tests.

use super::models::{AmountRange, Dimension, GroupKey, InvestmentRecord};
use super::record_query::{RecordFilter, RecordQuery};
use anyhow::Result;

/// Trait for investment record storage backends.
pub trait InvestmentStore: Send + Sync {
    /// Read the rows selected by `query`: filter, optional keyset boundary,
    /// single-key ordering, then offset and limit.
    fn query(&self, query: &RecordQuery) -> Result<Vec<InvestmentRecord>>;

    /// Number of rows matching `filter`.
    fn count(&self, filter: &RecordFilter) -> Result<u64>;

    /// Distinct non-null values of `dimension`. Years come back newest first,
    /// text values in ascending order.
    fn distinct_values(&self, dimension: Dimension) -> Result<Vec<GroupKey>>;

    /// Min and max of the positive domestic amounts, if there are any.
    fn domestic_amount_range(&self) -> Result<Option<AmountRange>>;
}
