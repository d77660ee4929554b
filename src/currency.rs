//! Foreign to domestic currency conversion with a year-keyed rate table.

use crate::aggregation::AggregatedBucket;
use crate::config::ExchangeRateSettings;
use crate::error::{DataError, DataResult};
use crate::investment_store::InvestmentRecord;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Immutable year to rate mapping with a fallback for unmapped years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRateTable {
    default_rate: Decimal,
    rates: BTreeMap<i32, Decimal>,
}

impl ExchangeRateTable {
    pub fn new(default_rate: Decimal, rates: BTreeMap<i32, Decimal>) -> Self {
        Self {
            default_rate,
            rates,
        }
    }

    pub fn from_settings(settings: &ExchangeRateSettings) -> Self {
        Self::new(settings.default_rate, settings.rates.clone())
    }

    pub fn default_rate(&self) -> Decimal {
        self.default_rate
    }

    pub fn rates(&self) -> &BTreeMap<i32, Decimal> {
        &self.rates
    }

    pub fn rate_for(&self, year: i32) -> Decimal {
        self.rates.get(&year).copied().unwrap_or(self.default_rate)
    }

    /// `foreign_amount` times the rate for `year`. Fails instead of wrapping
    /// when the product does not fit a `Decimal`.
    pub fn to_domestic(&self, foreign_amount: Decimal, year: i32) -> DataResult<Decimal> {
        let rate = self.rate_for(year);
        foreign_amount.checked_mul(rate).ok_or_else(|| {
            DataError::overflow(format!(
                "{} at rate {} for {} does not fit a decimal",
                foreign_amount, rate, year
            ))
        })
    }

    /// Domestic amounts plus foreign amounts converted at each record's year.
    pub fn combined_domestic_total<'a, I>(&self, records: I) -> DataResult<Decimal>
    where
        I: IntoIterator<Item = &'a InvestmentRecord>,
    {
        records.into_iter().try_fold(Decimal::ZERO, |total, r| {
            let converted = self.to_domestic(r.foreign_amount, r.year)?;
            checked_sum(&[total, r.domestic_amount, converted])
        })
    }

    /// A bucket's domestic sum plus its foreign sum converted at `year`.
    pub fn combined_bucket_total(&self, bucket: &AggregatedBucket, year: i32) -> DataResult<Decimal> {
        let converted = self.to_domestic(bucket.foreign_sum, year)?;
        checked_sum(&[bucket.domestic_sum, converted])
    }
}

fn checked_sum(values: &[Decimal]) -> DataResult<Decimal> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(|| DataError::overflow("combined total does not fit a decimal"))
}

impl Default for ExchangeRateTable {
    fn default() -> Self {
        Self::from_settings(&ExchangeRateSettings::default())
    }
}
