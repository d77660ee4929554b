//! Store-level query vocabulary: filters, ordering, keyset boundaries and windows.

use super::models::{InvestmentRecord, InvestmentStatus, SortField, SortOrder, SortValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Conjunctive equality filters. `None` means the filter is not applied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter {
    pub year: Option<i32>,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub status: Option<InvestmentStatus>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_sector(mut self, sector: &str) -> Self {
        self.sector = Some(sector.to_string());
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_province(mut self, province: &str) -> Self {
        self.province = Some(province.to_string());
        self
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    pub fn with_status(mut self, status: InvestmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == RecordFilter::default()
    }

    /// Exact-match evaluation, used by in-process stores.
    pub fn matches(&self, record: &InvestmentRecord) -> bool {
        fn text_matches(expected: &Option<String>, actual: &Option<String>) -> bool {
            match expected {
                Some(expected) => actual.as_deref() == Some(expected.as_str()),
                None => true,
            }
        }

        self.year.map_or(true, |year| record.year == year)
            && self.status.map_or(true, |status| record.status == status)
            && text_matches(&self.sector, &record.sector)
            && text_matches(&self.region, &record.region)
            && text_matches(&self.province, &record.province)
            && text_matches(&self.country, &record.country)
    }
}

/// Single-key ordering. Ties between equal keys are returned in unspecified order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    pub fn compare(&self, a: &InvestmentRecord, b: &InvestmentRecord) -> Ordering {
        let ordering = self.field.value_of(a).sort_cmp(&self.field.value_of(b));
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new(SortField::Year, SortOrder::Desc)
    }
}

/// Strict keyset predicate: `field < value` for descending order,
/// `field > value` for ascending order. Rows equal to `value` are excluded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeysetBoundary {
    pub field: SortField,
    pub order: SortOrder,
    pub value: SortValue,
}

impl KeysetBoundary {
    pub fn admits(&self, record: &InvestmentRecord) -> bool {
        match self.field.value_of(record).compare(&self.value) {
            Some(Ordering::Less) => self.order == SortOrder::Desc,
            Some(Ordering::Greater) => self.order == SortOrder::Asc,
            _ => false,
        }
    }

    pub fn sql_operator(&self) -> &'static str {
        match self.order {
            SortOrder::Desc => "<",
            SortOrder::Asc => ">",
        }
    }
}

/// A complete read against the records table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub filter: RecordFilter,
    pub sort: Option<SortSpec>,
    pub boundary: Option<KeysetBoundary>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl RecordQuery {
    /// Every row matching `filter`, in storage order.
    pub fn all(filter: RecordFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }
}
