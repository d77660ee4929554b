//! Database health report: what is stored and what would make reads faster.

use super::models::Dimension;
use super::record_query::RecordFilter;
use super::store::SqliteInvestmentStore;
use super::trait_def::InvestmentStore;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fewer distinct years than this makes trend charts uninformative.
const MIN_TREND_YEARS: u64 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseReport {
    pub record_count: u64,
    pub distinct_counts: BTreeMap<String, u64>,
    pub indices_present: Vec<String>,
    pub indices_missing: Vec<String>,
    pub recommendations: Vec<String>,
}

impl DatabaseReport {
    pub fn collect(store: &SqliteInvestmentStore) -> Result<Self> {
        let record_count = store.count(&RecordFilter::new())?;

        let mut distinct_counts = BTreeMap::new();
        for dimension in Dimension::ALL {
            distinct_counts.insert(
                dimension.column().to_string(),
                store.distinct_count(dimension)?,
            );
        }

        let indices_present: Vec<String> = store
            .existing_indices()?
            .into_iter()
            .map(String::from)
            .collect();
        let indices_missing: Vec<String> = store
            .missing_indices()?
            .into_iter()
            .map(String::from)
            .collect();

        let mut recommendations: Vec<String> = indices_missing
            .iter()
            .map(|index| format!("Create index {} to speed up filtered reads", index))
            .collect();
        let years = distinct_counts.get("year").copied().unwrap_or(0);
        if record_count == 0 {
            recommendations.push("Database is empty: import investment records".to_string());
        } else if years < MIN_TREND_YEARS {
            recommendations.push(format!(
                "Only {} year(s) of data: trends need at least {}",
                years, MIN_TREND_YEARS
            ));
        }

        Ok(Self {
            record_count,
            distinct_counts,
            indices_present,
            indices_missing,
            recommendations,
        })
    }

    pub fn is_healthy(&self) -> bool {
        self.recommendations.is_empty()
    }
}
