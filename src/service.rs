//! The data-access facade consumed by presentation code.
//!
//! Paginated reads and metadata refreshes run under the retry policy.
//! Aggregations and summaries do not: a failing store surfaces on the first
//! error.

use crate::aggregation::{aggregate, summarize, AggregatedBucket, InvestmentSummary};
use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, PagingSettings};
use crate::currency::ExchangeRateTable;
use crate::error::{DataError, DataResult};
use crate::investment_store::{
    Dimension, InvestmentRecord, InvestmentStore, RecordFilter, RecordQuery, SortSpec,
};
use crate::metadata::{CachedMetadata, MetadataCache, MetadataSnapshot};
use crate::query::{
    Cursor, CursorPagination, OffsetPagination, Page, PageMode, Pagination, QueryParams,
    RawQueryParams,
};
use crate::retry::{with_retries, RetryPolicy, Sleeper, TokioSleeper};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Progress of a multi-page `fetch_all`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchProgress {
    pub loaded: u64,
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

pub struct InvestmentService {
    store: Arc<dyn InvestmentStore>,
    paging: PagingSettings,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    metadata: Arc<MetadataCache>,
    rates: ExchangeRateTable,
}

impl InvestmentService {
    pub fn new(store: Arc<dyn InvestmentStore>, config: &AppConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ttl = config.metadata_cache_ttl();
        Self {
            store,
            paging: config.paging.clone(),
            retry: RetryPolicy::new(&config.retry),
            sleeper: Arc::new(TokioSleeper),
            metadata: Arc::new(MetadataCache::new(ttl, clock.clone())),
            clock,
            rates: ExchangeRateTable::from_settings(&config.exchange_rates),
        }
    }

    /// Service with default settings over `store`.
    pub fn with_defaults(store: Arc<dyn InvestmentStore>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            store,
            paging: PagingSettings::default(),
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            metadata: Arc::new(MetadataCache::new(
                chrono::Duration::seconds(crate::config::DEFAULT_METADATA_CACHE_TTL_SECS as i64),
                clock.clone(),
            )),
            clock,
            rates: ExchangeRateTable::default(),
        }
    }

    pub fn with_paging(mut self, paging: PagingSettings) -> Self {
        self.paging = paging;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the clock. The metadata cache is rebuilt empty around it, keeping its TTL.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.metadata = Arc::new(MetadataCache::new(self.metadata.ttl(), clock.clone()));
        self.clock = clock;
        self
    }

    /// Share a metadata cache between services.
    pub fn with_metadata_cache(mut self, metadata: Arc<MetadataCache>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_exchange_rates(mut self, rates: ExchangeRateTable) -> Self {
        self.rates = rates;
        self
    }

    pub fn paging(&self) -> &PagingSettings {
        &self.paging
    }

    pub fn exchange_rates(&self) -> &ExchangeRateTable {
        &self.rates
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    pub async fn fetch_page(&self, params: &QueryParams) -> DataResult<Page> {
        params.validate(&self.paging)?;
        debug!("Fetching page: {:?}", params);
        with_retries(&self.retry, self.sleeper.as_ref(), "fetch page", move || async move {
            self.read_page(params)
        })
        .await
    }

    pub async fn fetch_page_from(&self, raw: &RawQueryParams) -> DataResult<Page> {
        let params = QueryParams::from_raw(raw, &self.paging)?;
        self.fetch_page(&params).await
    }

    fn read_page(&self, params: &QueryParams) -> DataResult<Page> {
        match &params.mode {
            PageMode::Offset { page } => {
                let total = self.store.count(&params.filter)?;
                let data = self.store.query(&params.to_record_query(false))?;
                debug!("Offset page {}: {} of {} rows", page, data.len(), total);
                Ok(Page {
                    data,
                    pagination: Pagination::Offset(OffsetPagination::new(
                        total,
                        *page,
                        params.page_size,
                    )),
                })
            }
            PageMode::Cursor { .. } => {
                let lookahead = self.paging.cursor_lookahead;
                let mut data = self.store.query(&params.to_record_query(lookahead))?;
                let has_more = if lookahead {
                    let more = data.len() > params.page_size;
                    data.truncate(params.page_size);
                    more
                } else {
                    data.len() == params.page_size
                };
                let next_cursor = match data.last() {
                    Some(last) if has_more => Some(Cursor::after(params.sort.field, last).encode()),
                    _ => None,
                };
                debug!("Cursor page: {} rows, has_more={}", data.len(), has_more);
                Ok(Page {
                    data,
                    pagination: Pagination::Cursor(CursorPagination {
                        next_cursor,
                        has_more,
                        page_size: params.page_size,
                    }),
                })
            }
        }
    }

    /// Every row matching `filter`, read `batch_size` rows at a time through
    /// offset pages. `progress` is called after each page.
    pub async fn fetch_all<P>(
        &self,
        filter: &RecordFilter,
        sort: SortSpec,
        batch_size: usize,
        mut progress: P,
    ) -> DataResult<Vec<InvestmentRecord>>
    where
        P: FnMut(FetchProgress),
    {
        let mut records = Vec::new();
        let mut page: u32 = 1;
        loop {
            let params = QueryParams::offset(filter.clone(), sort, page, batch_size);
            let result = self.fetch_page(&params).await?;
            let (total, total_pages) = match result.offset_pagination() {
                Some(p) => (p.total, p.total_pages),
                None => return Err(DataError::invalid("offset page expected")),
            };
            let fetched = result.data.len();
            records.extend(result.data);
            progress(FetchProgress {
                loaded: records.len() as u64,
                total,
                page,
                total_pages,
            });

            if fetched < batch_size || page as u64 >= total_pages {
                break;
            }
            page += 1;
        }
        info!("Fetched {} records in {} pages", records.len(), page);
        Ok(records)
    }

    // =========================================================================
    // Aggregation
    // =========================================================================

    pub async fn fetch_aggregate(
        &self,
        group_by: Dimension,
        filter: &RecordFilter,
    ) -> DataResult<Vec<AggregatedBucket>> {
        debug!("Aggregating by {:?} with {:?}", group_by, filter);
        let records = self.store.query(&RecordQuery::all(filter.clone()))?;
        aggregate(&records, group_by)
    }

    pub async fn yearly_trend(&self, filter: &RecordFilter) -> DataResult<Vec<AggregatedBucket>> {
        self.fetch_aggregate(Dimension::Year, filter).await
    }

    pub async fn sector_time_series(&self, sector: &str) -> DataResult<Vec<AggregatedBucket>> {
        self.fetch_aggregate(Dimension::Year, &RecordFilter::new().with_sector(sector))
            .await
    }

    pub async fn region_time_series(&self, region: &str) -> DataResult<Vec<AggregatedBucket>> {
        self.fetch_aggregate(Dimension::Year, &RecordFilter::new().with_region(region))
            .await
    }

    pub async fn summary(&self, filter: &RecordFilter) -> DataResult<InvestmentSummary> {
        let records = self.store.query(&RecordQuery::all(filter.clone()))?;
        summarize(&records)
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub async fn fetch_metadata(&self) -> DataResult<CachedMetadata> {
        self.metadata
            .get_or_refresh(move || async move {
                with_retries(
                    &self.retry,
                    self.sleeper.as_ref(),
                    "metadata refresh",
                    move || async move {
                        MetadataSnapshot::load(self.store.as_ref(), self.clock.now())
                            .map_err(DataError::from)
                    },
                )
                .await
            })
            .await
    }

    // =========================================================================
    // Currency
    // =========================================================================

    pub fn to_domestic(&self, amount: Decimal, year: i32) -> DataResult<Decimal> {
        self.rates.to_domestic(amount, year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investment_store::{
        InMemoryInvestmentStore, NewInvestmentRecord, SortField, SortOrder,
    };
    use crate::retry::RecordingSleeper;

    fn service_over(store: Arc<InMemoryInvestmentStore>) -> (InvestmentService, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::new());
        let service = InvestmentService::with_defaults(store).with_sleeper(sleeper.clone());
        (service, sleeper)
    }

    fn store() -> Arc<InMemoryInvestmentStore> {
        Arc::new(
            InMemoryInvestmentStore::with_records(&[
                NewInvestmentRecord::domestic(2021, Decimal::from(500)),
                NewInvestmentRecord::foreign(2021, Decimal::from(10)),
                NewInvestmentRecord::domestic(2022, Decimal::from(300)),
            ])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_offset_page() {
        let (service, _) = service_over(store());
        let params = QueryParams::offset(
            RecordFilter::new(),
            SortSpec::new(SortField::DomesticAmount, SortOrder::Desc),
            1,
            2,
        );

        let page = service.fetch_page(&params).await.unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].domestic_amount, Decimal::from(500));
        assert_eq!(
            page.offset_pagination().unwrap(),
            &OffsetPagination {
                total: 3,
                page: 1,
                page_size: 2,
                total_pages: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_page_read_is_retried() {
        let store = store();
        let (service, sleeper) = service_over(store.clone());
        store.fail_next_reads(2);

        let params = QueryParams::offset(RecordFilter::new(), SortSpec::default(), 1, 10);
        let page = service.fetch_page(&params).await.unwrap();
        assert_eq!(page.data.len(), 3);
        assert_eq!(sleeper.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_no_retry_policy_fails_on_first_error() {
        let store = store();
        let (service, sleeper) = service_over(store.clone());
        let service = service.with_retry_policy(RetryPolicy::no_retry());
        store.fail_next_reads(1);

        let params = QueryParams::offset(RecordFilter::new(), SortSpec::default(), 1, 10);
        let result = service.fetch_page(&params).await;
        assert!(matches!(
            result,
            Err(DataError::RetriesExhausted { attempts: 1, .. })
        ));
        assert_eq!(store.read_count(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_is_not_retried() {
        let store = store();
        let (service, sleeper) = service_over(store.clone());
        store.fail_next_reads(1);

        let result = service
            .fetch_aggregate(Dimension::Year, &RecordFilter::new())
            .await;
        assert!(matches!(result, Err(DataError::Fetch(_))));
        assert_eq!(store.read_count(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_overflow_surfaces_as_error() {
        let store = Arc::new(
            InMemoryInvestmentStore::with_records(&[
                NewInvestmentRecord::domestic(2021, Decimal::MAX),
                NewInvestmentRecord::domestic(2021, Decimal::MAX),
            ])
            .unwrap(),
        );
        let (service, _) = service_over(store);

        let result = service.yearly_trend(&RecordFilter::new()).await;
        assert!(matches!(result, Err(DataError::Overflow(_))));
        let result = service.summary(&RecordFilter::new()).await;
        assert!(matches!(result, Err(DataError::Overflow(_))));
    }

    #[tokio::test]
    async fn test_invalid_params_fail_before_io() {
        let store = store();
        let (service, _) = service_over(store.clone());
        let params = QueryParams::offset(RecordFilter::new(), SortSpec::default(), 0, 10);

        let result = service.fetch_page(&params).await;
        assert!(matches!(result, Err(DataError::InvalidQuery(_))));
        assert_eq!(store.read_count(), 0);
    }

    #[tokio::test]
    async fn test_time_series_helpers_filter_then_group_by_year() {
        let store = Arc::new(
            InMemoryInvestmentStore::with_records(&[
                NewInvestmentRecord::domestic(2020, Decimal::from(1)).with_sector("Mining"),
                NewInvestmentRecord::domestic(2021, Decimal::from(2)).with_sector("Mining"),
                NewInvestmentRecord::domestic(2021, Decimal::from(3)).with_sector("Trade"),
                NewInvestmentRecord::foreign(2021, Decimal::from(4)).with_region("Jawa"),
            ])
            .unwrap(),
        );
        let (service, _) = service_over(store);

        let mining = service.sector_time_series("Mining").await.unwrap();
        assert_eq!(mining.len(), 2);
        assert_eq!(mining[1].domestic_sum, Decimal::from(2));

        let jawa = service.region_time_series("Jawa").await.unwrap();
        assert_eq!(jawa.len(), 1);
        assert_eq!(jawa[0].foreign_sum, Decimal::from(4));

        let trend = service.yearly_trend(&RecordFilter::new()).await.unwrap();
        assert_eq!(trend.iter().map(|b| b.count).sum::<u64>(), 4);
    }

    #[tokio::test]
    async fn test_to_domestic_uses_configured_table() {
        let (service, _) = service_over(store());
        assert_eq!(
            service.to_domestic(Decimal::from(100), 2021).unwrap(),
            Decimal::from(1_430_000)
        );
    }
}
