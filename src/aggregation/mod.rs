//! Grouping of investment records into per-key buckets.
//!
//! Buckets exist only for keys present in the input, so no bucket is empty and
//! the bucket counts always add up to the number of input records. Sums are
//! exact decimal additions that fail with `DataError::Overflow` rather than
//! wrap. Each currency track only sums rows of its own status.

mod summary;

pub use summary::{summarize, InvestmentSummary};

use crate::error::{DataError, DataResult};
use crate::investment_store::{Dimension, GroupKey, InvestmentRecord, InvestmentStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedBucket {
    pub key: GroupKey,
    pub count: u64,
    pub domestic_sum: Decimal,
    pub foreign_sum: Decimal,
}

impl AggregatedBucket {
    fn empty(key: GroupKey) -> Self {
        Self {
            key,
            count: 0,
            domestic_sum: Decimal::ZERO,
            foreign_sum: Decimal::ZERO,
        }
    }

    fn add(&mut self, record: &InvestmentRecord) -> DataResult<()> {
        let sum = match record.status {
            InvestmentStatus::Domestic => &mut self.domestic_sum,
            InvestmentStatus::Foreign => &mut self.foreign_sum,
        };
        *sum = sum.checked_add(record.amount()).ok_or_else(|| {
            DataError::overflow(format!("{} sum of bucket '{}'", record.status, self.key))
        })?;
        self.count += 1;
        Ok(())
    }
}

/// One bucket per distinct key of `dimension`, ordered by key ascending with
/// the missing-value bucket last.
pub fn aggregate<'a, I>(records: I, dimension: Dimension) -> DataResult<Vec<AggregatedBucket>>
where
    I: IntoIterator<Item = &'a InvestmentRecord>,
{
    let mut buckets: BTreeMap<GroupKey, AggregatedBucket> = BTreeMap::new();
    for record in records {
        let key = dimension.key_of(record);
        buckets
            .entry(key.clone())
            .or_insert_with(|| AggregatedBucket::empty(key))
            .add(record)?;
    }
    Ok(buckets.into_values().collect())
}
