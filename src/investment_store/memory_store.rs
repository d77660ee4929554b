//! In-memory investment store.
//!
//! Same read semantics as the SQLite store over a plain `Vec`. Used as the
//! test double for the service layer: it counts the reads it serves and can be
//! told to fail a number of upcoming reads.

use super::models::{
    AmountRange, Dimension, GroupKey, InvestmentRecord, NewInvestmentRecord,
};
use super::record_query::{RecordFilter, RecordQuery};
use super::trait_def::InvestmentStore;
use anyhow::{anyhow, bail, Result};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryInvestmentStore {
    records: RwLock<Vec<InvestmentRecord>>,
    reads: AtomicUsize,
    failures_pending: AtomicUsize,
}

impl InMemoryInvestmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: &[NewInvestmentRecord]) -> Result<Self> {
        let store = Self::new();
        store.insert_records(records)?;
        Ok(store)
    }

    /// Append records, assigning sequential ids starting at 1.
    pub fn insert_records(&self, records: &[NewInvestmentRecord]) -> Result<Vec<i64>> {
        for (index, record) in records.iter().enumerate() {
            if let Err(reason) = record.validate() {
                bail!("Record #{} rejected: {}", index, reason);
            }
        }

        let mut stored = self.records.write().unwrap();
        let mut next_id = stored.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            stored.push(record.clone().into_record(next_id));
            ids.push(next_id);
            next_id += 1;
        }
        Ok(ids)
    }

    /// Make the next `count` reads fail with a transient error.
    pub fn fail_next_reads(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Number of reads attempted so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn begin_read(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |pending| {
                pending.checked_sub(1)
            })
            .is_ok();
        if injected {
            return Err(anyhow!("simulated store failure"));
        }
        Ok(())
    }
}

impl InvestmentStore for InMemoryInvestmentStore {
    fn query(&self, query: &RecordQuery) -> Result<Vec<InvestmentRecord>> {
        self.begin_read()?;
        let records = self.records.read().unwrap();

        let mut selected: Vec<InvestmentRecord> = records
            .iter()
            .filter(|r| query.filter.matches(r))
            .filter(|r| query.boundary.as_ref().map_or(true, |b| b.admits(r)))
            .cloned()
            .collect();
        if let Some(sort) = &query.sort {
            selected.sort_by(|a, b| sort.compare(a, b));
        }

        let window = selected.into_iter().skip(query.offset);
        Ok(match query.limit {
            Some(limit) => window.take(limit).collect(),
            None => window.collect(),
        })
    }

    fn count(&self, filter: &RecordFilter) -> Result<u64> {
        self.begin_read()?;
        let records = self.records.read().unwrap();
        Ok(records.iter().filter(|r| filter.matches(r)).count() as u64)
    }

    fn distinct_values(&self, dimension: Dimension) -> Result<Vec<GroupKey>> {
        self.begin_read()?;
        let records = self.records.read().unwrap();

        let values: BTreeSet<GroupKey> = records
            .iter()
            .map(|r| dimension.key_of(r))
            .filter(|key| *key != GroupKey::Null)
            .collect();
        Ok(match dimension {
            Dimension::Year => values.into_iter().rev().collect(),
            _ => values.into_iter().collect(),
        })
    }

    fn domestic_amount_range(&self) -> Result<Option<AmountRange>> {
        self.begin_read()?;
        let records = self.records.read().unwrap();

        let mut positive = records
            .iter()
            .map(|r| r.domestic_amount)
            .filter(|amount| amount.is_sign_positive() && !amount.is_zero());
        let first = match positive.next() {
            Some(first) => first,
            None => return Ok(None),
        };
        let (min, max) = positive.fold((first, first), |(min, max), amount| {
            (min.min(amount), max.max(amount))
        });
        Ok(Some(AmountRange { min, max }))
    }
}
