//! End-to-end tests for retry behavior against a failing store.

mod common;

use common::{flaky_sample_store, TestService, TOTAL_RECORDS};
use investment_data::investment_store::{RecordFilter, SortSpec};
use investment_data::query::QueryParams;
use investment_data::DataError;
use std::time::Duration;

fn first_page() -> QueryParams {
    QueryParams::offset(RecordFilter::new(), SortSpec::default(), 1, 5)
}

#[tokio::test]
async fn test_persistent_failure_exhausts_three_attempts() {
    let store = flaky_sample_store();
    let harness = TestService::over(store.clone());
    store.fail_next_reads(usize::MAX);

    let err = harness.service.fetch_page(&first_page()).await.unwrap_err();

    // The count fails first on every attempt
    assert_eq!(store.read_count(), 3);
    assert_eq!(
        harness.sleeper.sleeps(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    match &err {
        DataError::RetriesExhausted {
            operation,
            attempts,
            ..
        } => {
            assert_eq!(operation, "fetch page");
            assert_eq!(*attempts, 3);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(matches!(err.root_cause(), DataError::Fetch(_)));
}

#[tokio::test]
async fn test_transient_failures_recover() {
    let store = flaky_sample_store();
    let harness = TestService::over(store.clone());
    store.fail_next_reads(2);

    let page = harness.service.fetch_page(&first_page()).await.unwrap();

    assert_eq!(page.data.len(), 5);
    assert_eq!(page.offset_pagination().unwrap().total, TOTAL_RECORDS);
    assert_eq!(harness.sleeper.sleeps().len(), 2);
    // Two failed counts, then a count and a query
    assert_eq!(store.read_count(), 4);
}

#[tokio::test]
async fn test_invalid_query_never_reaches_the_store() {
    let store = flaky_sample_store();
    let harness = TestService::over(store.clone());

    let params = QueryParams::offset(RecordFilter::new(), SortSpec::default(), 0, 5);
    let err = harness.service.fetch_page(&params).await.unwrap_err();

    assert!(matches!(err, DataError::InvalidQuery(_)));
    assert_eq!(store.read_count(), 0);
    assert!(harness.sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_aggregation_is_not_retried() {
    let store = flaky_sample_store();
    let harness = TestService::over(store.clone());
    store.fail_next_reads(1);

    let err = harness
        .service
        .yearly_trend(&RecordFilter::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Fetch(_)));
    assert_eq!(store.read_count(), 1);
    assert!(harness.sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_fetch_all_collects_every_row() {
    let store = flaky_sample_store();
    let harness = TestService::over(store.clone());
    let mut progress = Vec::new();

    let records = harness
        .service
        .fetch_all(&RecordFilter::new(), SortSpec::default(), 5, |p| {
            progress.push((p.loaded, p.page))
        })
        .await
        .unwrap();

    assert_eq!(records.len() as u64, TOTAL_RECORDS);
    assert_eq!(progress, vec![(5, 1), (10, 2), (12, 3)]);
}
