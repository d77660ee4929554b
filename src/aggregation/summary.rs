//! Descriptive statistics over a filtered record set.

use crate::error::{DataError, DataResult};
use crate::investment_store::{InvestmentRecord, InvestmentStatus};
use rust_decimal::Decimal;
use serde::Serialize;

/// Averages and medians. A statistic over an empty population is `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentSummary {
    pub record_count: u64,
    pub avg_domestic_amount: Option<Decimal>,
    pub median_domestic_amount: Option<Decimal>,
    pub avg_foreign_amount: Option<Decimal>,
    pub median_foreign_amount: Option<Decimal>,
    pub avg_projects: Option<Decimal>,
    pub avg_domestic_workers: Option<Decimal>,
    pub avg_foreign_workers: Option<Decimal>,
}

pub fn summarize<'a, I>(records: I) -> DataResult<InvestmentSummary>
where
    I: IntoIterator<Item = &'a InvestmentRecord>,
{
    let records: Vec<&InvestmentRecord> = records.into_iter().collect();

    let mut domestic: Vec<Decimal> = records
        .iter()
        .filter(|r| r.status == InvestmentStatus::Domestic)
        .map(|r| r.amount())
        .collect();
    let mut foreign: Vec<Decimal> = records
        .iter()
        .filter(|r| r.status == InvestmentStatus::Foreign)
        .map(|r| r.amount())
        .collect();

    let counts = |f: fn(&InvestmentRecord) -> u32| -> Vec<Decimal> {
        records.iter().map(|r| Decimal::from(f(r))).collect()
    };

    Ok(InvestmentSummary {
        record_count: records.len() as u64,
        avg_domestic_amount: mean(&domestic)?,
        median_domestic_amount: median(&mut domestic)?,
        avg_foreign_amount: mean(&foreign)?,
        median_foreign_amount: median(&mut foreign)?,
        avg_projects: mean(&counts(|r| r.projects))?,
        avg_domestic_workers: mean(&counts(|r| r.domestic_workers))?,
        avg_foreign_workers: mean(&counts(|r| r.foreign_workers))?,
    })
}

fn mean(values: &[Decimal]) -> DataResult<Option<Decimal>> {
    if values.is_empty() {
        return Ok(None);
    }
    let total = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(|| DataError::overflow("sum for average does not fit a decimal"))?;
    Ok(Some((total / Decimal::from(values.len() as u64)).normalize()))
}

/// Continuous median: the mean of the two middle values for even counts.
fn median(values: &mut [Decimal]) -> DataResult<Option<Decimal>> {
    if values.is_empty() {
        return Ok(None);
    }
    values.sort();
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 1 {
        values[mid]
    } else {
        values[mid - 1]
            .checked_add(values[mid])
            .ok_or_else(|| DataError::overflow("median pair does not fit a decimal"))?
            / Decimal::TWO
    };
    Ok(Some(median.normalize()))
}
