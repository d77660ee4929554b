//! Query parameters: the loosely typed request shape and its validated form.
//!
//! `RawQueryParams` holds exactly the recognised keys as strings, the way they
//! arrive from a query string or the command line. Unknown keys are rejected.
//! `QueryParams` is the checked, typed form the service executes.

mod cursor;
mod pagination;

pub use cursor::Cursor;
pub use pagination::{CursorPagination, OffsetPagination, Page, Pagination};

use crate::config::PagingSettings;
use crate::error::{DataError, DataResult};
use crate::investment_store::{
    InvestmentStatus, KeysetBoundary, RecordFilter, RecordQuery, SortField, SortOrder, SortSpec,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RawQueryParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub year: Option<String>,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub cursor: Option<String>,
    pub use_cursor: Option<String>,
}

/// Empty strings count as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl RawQueryParams {
    /// Build from key/value pairs such as a decoded query string. Later
    /// duplicates win.
    pub fn from_pairs<'a, I>(pairs: I) -> DataResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let map: serde_json::Map<String, serde_json::Value> = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| DataError::invalid(e.to_string()))
    }

    /// The equality filters alone, for calls that take no pagination.
    pub fn filter(&self) -> DataResult<RecordFilter> {
        let year = match present(&self.year) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<i32>()
                    .map_err(|_| DataError::invalid(format!("year '{}' is not a number", raw)))?,
            ),
            None => None,
        };
        let status = match present(&self.status) {
            Some(raw) => Some(InvestmentStatus::parse(raw).ok_or_else(|| {
                DataError::invalid(format!(
                    "status '{}' is not one of PMDN, PMA, DOMESTIC, FOREIGN",
                    raw
                ))
            })?),
            None => None,
        };

        Ok(RecordFilter {
            year,
            sector: present(&self.sector).map(str::to_string),
            region: present(&self.region).map(str::to_string),
            province: present(&self.province).map(str::to_string),
            country: present(&self.country).map(str::to_string),
            status,
        })
    }
}

/// How a page is located.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageMode {
    /// 1-based page number.
    Offset { page: u32 },
    /// Rows strictly past `after` in sort order; the first page when `None`.
    Cursor { after: Option<Cursor> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryParams {
    pub filter: RecordFilter,
    pub sort: SortSpec,
    pub page_size: usize,
    pub mode: PageMode,
}

impl QueryParams {
    pub fn offset(filter: RecordFilter, sort: SortSpec, page: u32, page_size: usize) -> Self {
        Self {
            filter,
            sort,
            page_size,
            mode: PageMode::Offset { page },
        }
    }

    pub fn cursor(
        filter: RecordFilter,
        sort: SortSpec,
        page_size: usize,
        after: Option<Cursor>,
    ) -> Self {
        Self {
            filter,
            sort,
            page_size,
            mode: PageMode::Cursor { after },
        }
    }

    pub fn from_pairs<'a, I>(pairs: I, paging: &PagingSettings) -> DataResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::from_raw(&RawQueryParams::from_pairs(pairs)?, paging)
    }

    pub fn from_raw(raw: &RawQueryParams, paging: &PagingSettings) -> DataResult<Self> {
        let filter = raw.filter()?;

        let page = match present(&raw.page) {
            Some(value) => parse_number::<u32>("page", value)?,
            None => 1,
        };
        let page_size = match present(&raw.page_size) {
            Some(value) => parse_number::<usize>("pageSize", value)?,
            None => paging.default_page_size,
        };

        let field = match present(&raw.sort_by) {
            Some(value) => SortField::parse(value)
                .ok_or_else(|| DataError::invalid(format!("unknown sort field '{}'", value)))?,
            None => SortField::Year,
        };
        let order = match present(&raw.sort_order) {
            Some(value) => SortOrder::parse(value).ok_or_else(|| {
                DataError::invalid(format!("sortOrder '{}' must be asc or desc", value))
            })?,
            None => SortOrder::Desc,
        };
        let sort = SortSpec::new(field, order);

        let use_cursor = match present(&raw.use_cursor) {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(DataError::invalid(format!(
                        "useCursor '{}' must be true or false",
                        value
                    )))
                }
            },
            None => false,
        };

        let mode = match (use_cursor, present(&raw.cursor)) {
            (true, Some(encoded)) => PageMode::Cursor {
                after: Some(Cursor::decode(encoded)?),
            },
            (true, None) => PageMode::Cursor { after: None },
            (false, Some(_)) => {
                return Err(DataError::invalid("cursor given without useCursor=true"))
            }
            (false, None) => PageMode::Offset { page },
        };

        let params = Self {
            filter,
            sort,
            page_size,
            mode,
        };
        params.validate(paging)?;
        Ok(params)
    }

    /// Range and consistency checks, also applied to programmatically built params.
    pub fn validate(&self, paging: &PagingSettings) -> DataResult<()> {
        if self.page_size == 0 || self.page_size > paging.max_page_size {
            return Err(DataError::invalid(format!(
                "pageSize must be between 1 and {}, got {}",
                paging.max_page_size, self.page_size
            )));
        }
        match &self.mode {
            PageMode::Offset { page } if *page == 0 => {
                Err(DataError::invalid("page must be at least 1"))
            }
            PageMode::Cursor { after: Some(cursor) } if cursor.field != self.sort.field => {
                Err(DataError::invalid(format!(
                    "cursor was issued for '{}' but the listing is sorted by '{}'",
                    cursor.field, self.sort.field
                )))
            }
            _ => Ok(()),
        }
    }

    /// The store read for this page. With `lookahead`, cursor pages fetch one
    /// extra row to learn whether another page exists.
    pub fn to_record_query(&self, lookahead: bool) -> RecordQuery {
        match &self.mode {
            PageMode::Offset { page } => RecordQuery {
                filter: self.filter.clone(),
                sort: Some(self.sort),
                boundary: None,
                limit: Some(self.page_size),
                offset: (page.saturating_sub(1) as usize).saturating_mul(self.page_size),
            },
            PageMode::Cursor { after } => RecordQuery {
                filter: self.filter.clone(),
                sort: Some(self.sort),
                boundary: after.as_ref().map(|cursor| KeysetBoundary {
                    field: self.sort.field,
                    order: self.sort.order,
                    value: cursor.value.clone(),
                }),
                limit: Some(if lookahead {
                    self.page_size + 1
                } else {
                    self.page_size
                }),
                offset: 0,
            },
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> DataResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| DataError::invalid(format!("{} '{}' is not a valid number", name, value)))
}
