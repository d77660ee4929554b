use crate::investment_store::{AmountRange, Dimension, GroupKey, InvestmentStore, RecordFilter};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Distinct filterable values and table-wide figures, captured at one instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSnapshot {
    /// Newest first.
    pub years: Vec<i32>,
    pub sectors: Vec<String>,
    pub regions: Vec<String>,
    pub provinces: Vec<String>,
    pub statuses: Vec<String>,
    pub countries: Vec<String>,
    pub total_records: u64,
    pub domestic_amount_range: Option<AmountRange>,
    pub last_updated: DateTime<Utc>,
}

impl MetadataSnapshot {
    /// Scan the store: one distinct-value read per dimension, one count, one range.
    pub fn load(store: &dyn InvestmentStore, now: DateTime<Utc>) -> Result<Self> {
        let texts = |dimension: Dimension| -> Result<Vec<String>> {
            Ok(store
                .distinct_values(dimension)?
                .into_iter()
                .filter_map(|key| key.as_text().map(str::to_string))
                .collect())
        };

        let years = store
            .distinct_values(Dimension::Year)?
            .iter()
            .filter_map(GroupKey::as_year)
            .collect();

        Ok(Self {
            years,
            sectors: texts(Dimension::Sector)?,
            regions: texts(Dimension::Region)?,
            provinces: texts(Dimension::Province)?,
            statuses: texts(Dimension::Status)?,
            countries: texts(Dimension::Country)?,
            total_records: store.count(&RecordFilter::new())?,
            domestic_amount_range: store.domestic_amount_range()?,
            last_updated: now,
        })
    }
}
