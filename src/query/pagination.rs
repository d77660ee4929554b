//! Page envelopes returned by `fetch_page`.

use crate::investment_store::InvestmentRecord;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page {
    pub data: Vec<InvestmentRecord>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Pagination {
    Offset(OffsetPagination),
    Cursor(CursorPagination),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetPagination {
    pub total: u64,
    pub page: u32,
    pub page_size: usize,
    pub total_pages: u64,
}

impl OffsetPagination {
    pub fn new(total: u64, page: u32, page_size: usize) -> Self {
        Self {
            total,
            page,
            page_size,
            total_pages: total.div_ceil(page_size.max(1) as u64),
        }
    }
}

/// Keyset pagination state.
///
/// Without lookahead, `has_more` only says the page came back full: when the
/// last row of the table lands exactly at the end of a page, it is `true` and
/// the following page is empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPagination {
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub page_size: usize,
}

impl Page {
    pub fn offset_pagination(&self) -> Option<&OffsetPagination> {
        match &self.pagination {
            Pagination::Offset(offset) => Some(offset),
            Pagination::Cursor(_) => None,
        }
    }

    pub fn cursor_pagination(&self) -> Option<&CursorPagination> {
        match &self.pagination {
            Pagination::Cursor(cursor) => Some(cursor),
            Pagination::Offset(_) => None,
        }
    }
}
