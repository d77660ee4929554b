//! End-to-end tests for offset and cursor pagination over SQLite.

mod common;

use common::{dec, TestDb, TestService, TIED_DOMESTIC_AMOUNT, TOTAL_RECORDS};
use investment_data::config::PagingSettings;
use investment_data::investment_store::{
    InvestmentRecord, RecordFilter, SortField, SortOrder, SortSpec,
};
use investment_data::query::{Cursor, Page, QueryParams, RawQueryParams};
use investment_data::{DataError, InvestmentService};
use rust_decimal::Decimal;
use std::collections::HashSet;

async fn cursor_pages(
    service: &InvestmentService,
    filter: RecordFilter,
    sort: SortSpec,
    page_size: usize,
) -> Vec<Page> {
    let mut pages = Vec::new();
    let mut after = None;
    loop {
        let params = QueryParams::cursor(filter.clone(), sort, page_size, after);
        let page = service.fetch_page(&params).await.unwrap();
        let next = page.cursor_pagination().unwrap().next_cursor.clone();
        pages.push(page);
        match next {
            Some(encoded) => after = Some(Cursor::decode(&encoded).unwrap()),
            None => break,
        }
        assert!(pages.len() <= TOTAL_RECORDS as usize + 1, "cursor loop ran away");
    }
    pages
}

fn domestic_amounts(page: &Page) -> Vec<Decimal> {
    page.data.iter().map(|r| r.domestic_amount).collect()
}

#[tokio::test]
async fn test_offset_pages_cover_everything_once() {
    let db = TestDb::seeded();
    let harness = TestService::over(db.store.clone());
    let sort = SortSpec::new(SortField::Year, SortOrder::Desc);

    let first = harness
        .service
        .fetch_page(&QueryParams::offset(RecordFilter::new(), sort, 1, 5))
        .await
        .unwrap();
    let pagination = first.offset_pagination().unwrap().clone();
    assert_eq!(pagination.total, TOTAL_RECORDS);
    assert_eq!(pagination.total_pages, 3);

    let mut all: Vec<InvestmentRecord> = first.data;
    for page in 2..=pagination.total_pages as u32 {
        let next = harness
            .service
            .fetch_page(&QueryParams::offset(RecordFilter::new(), sort, page, 5))
            .await
            .unwrap();
        all.extend(next.data);
    }

    assert_eq!(all.len() as u64, TOTAL_RECORDS);
    let ids: HashSet<i64> = all.iter().map(|r| r.id).collect();
    assert_eq!(ids.len() as u64, TOTAL_RECORDS);
    assert!(all.windows(2).all(|w| w[0].year >= w[1].year));
}

#[tokio::test]
async fn test_offset_page_past_the_end_is_empty() {
    let db = TestDb::seeded();
    let harness = TestService::over(db.store.clone());

    let page = harness
        .service
        .fetch_page(&QueryParams::offset(
            RecordFilter::new(),
            SortSpec::default(),
            9,
            5,
        ))
        .await
        .unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.offset_pagination().unwrap().total, TOTAL_RECORDS);
}

#[tokio::test]
async fn test_cursor_pages_are_strictly_monotonic() {
    let db = TestDb::seeded();
    let harness = TestService::over(db.store.clone());

    for order in [SortOrder::Desc, SortOrder::Asc] {
        let pages = cursor_pages(
            &harness.service,
            RecordFilter::new(),
            SortSpec::new(SortField::DomesticAmount, order),
            3,
        )
        .await;

        for pair in pages.windows(2) {
            let previous = domestic_amounts(&pair[0]);
            for amount in domestic_amounts(&pair[1]) {
                match order {
                    SortOrder::Desc => assert!(amount < *previous.iter().min().unwrap()),
                    SortOrder::Asc => assert!(amount > *previous.iter().max().unwrap()),
                }
            }
        }
    }
}

#[tokio::test]
async fn test_cursor_skips_rows_tied_with_the_boundary() {
    let db = TestDb::seeded();
    let harness = TestService::over(db.store.clone());

    // 1000, then one of the two 500s ends page one
    let pages = cursor_pages(
        &harness.service,
        RecordFilter::new(),
        SortSpec::new(SortField::DomesticAmount, SortOrder::Desc),
        2,
    )
    .await;

    assert_eq!(domestic_amounts(&pages[0]), vec![dec("1000"), dec("500")]);
    assert_eq!(domestic_amounts(&pages[1])[0], dec("300"));

    let tied = Decimal::from(TIED_DOMESTIC_AMOUNT);
    let seen: Vec<&InvestmentRecord> = pages.iter().flat_map(|p| p.data.iter()).collect();
    let fives = seen.iter().filter(|r| r.domestic_amount == tied).count();
    assert_eq!(fives, 1);
    assert!((seen.len() as u64) < TOTAL_RECORDS);
}

#[tokio::test]
async fn test_has_more_reports_false_positive_on_exact_boundary() {
    let db = TestDb::seeded();
    let harness = TestService::over(db.store.clone());
    let filter = RecordFilter::new().with_year(2023);
    let sort = SortSpec::new(SortField::Id, SortOrder::Asc);

    let pages = cursor_pages(&harness.service, filter, sort, 2).await;

    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].data.len(), 2);
    assert_eq!(pages[1].data.len(), 2);
    // Full page, nothing left behind it
    assert!(pages[1].cursor_pagination().unwrap().has_more);
    assert!(pages[2].data.is_empty());
    assert!(!pages[2].cursor_pagination().unwrap().has_more);
}

#[tokio::test]
async fn test_lookahead_makes_has_more_exact() {
    let db = TestDb::seeded();
    let paging = PagingSettings {
        cursor_lookahead: true,
        ..Default::default()
    };
    let harness = TestService::with_paging(db.store.clone(), paging);
    let filter = RecordFilter::new().with_year(2023);
    let sort = SortSpec::new(SortField::Id, SortOrder::Asc);

    let pages = cursor_pages(&harness.service, filter, sort, 2).await;

    assert_eq!(pages.len(), 2);
    assert!(pages[0].cursor_pagination().unwrap().has_more);
    let last = pages[1].cursor_pagination().unwrap();
    assert_eq!(pages[1].data.len(), 2);
    assert!(!last.has_more);
    assert_eq!(last.next_cursor, None);
}

#[tokio::test]
async fn test_raw_params_end_to_end() {
    let db = TestDb::seeded();
    let harness = TestService::over(db.store.clone());

    let raw = RawQueryParams::from_pairs([
        ("region", "Jawa"),
        ("status", "PMDN"),
        ("sortBy", "InvestasiRpJuta"),
        ("sortOrder", "asc"),
        ("pageSize", "2"),
    ])
    .unwrap();
    let page = harness.service.fetch_page_from(&raw).await.unwrap();

    assert_eq!(page.offset_pagination().unwrap().total, 4);
    assert_eq!(domestic_amounts(&page), vec![dec("300"), dec("300")]);
}

#[tokio::test]
async fn test_malformed_params_fail_with_invalid_query() {
    let db = TestDb::seeded();
    let harness = TestService::over(db.store.clone());

    for pairs in [
        vec![("year", "2O21")],
        vec![("sortBy", "Tahun "), ("pageSize", "5")],
        vec![("useCursor", "true"), ("cursor", "bm90IGpzb24=")],
    ] {
        let raw = RawQueryParams::from_pairs(pairs.clone()).unwrap();
        let result = harness.service.fetch_page_from(&raw).await;
        assert!(
            matches!(result, Err(DataError::InvalidQuery(_))),
            "{:?} should be rejected",
            pairs
        );
    }

    assert!(matches!(
        RawQueryParams::from_pairs([("limit", "5")]),
        Err(DataError::InvalidQuery(_))
    ));
}
