//! Time-bounded cache for the metadata snapshot.
//!
//! The cache starts empty. A call before expiry is served from memory. A call
//! after expiry runs the refresh it is given; success replaces the snapshot
//! wholesale and pushes expiry to `ttl` after the moment the call started, so
//! time spent in the refresh (retry backoff included) counts against the TTL. A failed refresh falls back to
//! the previous snapshot when there is one, and only errors out otherwise.
//!
//! Concurrent callers that all miss each run their own refresh. The last one
//! to finish wins, and every snapshot is complete, so racing only costs reads.

mod snapshot;

pub use snapshot::MetadataSnapshot;

use crate::clock::Clock;
use crate::error::DataResult;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// How a snapshot was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from memory without I/O.
    Hit,
    /// Freshly loaded.
    Refreshed,
    /// The refresh failed and the previous snapshot was served instead.
    Stale,
}

#[derive(Clone, Debug)]
pub struct CachedMetadata {
    pub snapshot: Arc<MetadataSnapshot>,
    pub outcome: CacheOutcome,
}

struct CacheEntry {
    snapshot: Arc<MetadataSnapshot>,
    expires_at: DateTime<Utc>,
}

pub struct MetadataCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry>>,
}

impl MetadataCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entry: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached snapshot if it has not expired yet.
    pub fn fresh(&self) -> Option<Arc<MetadataSnapshot>> {
        let now = self.clock.now();
        let entry = self.entry.read().unwrap();
        entry
            .as_ref()
            .filter(|e| now < e.expires_at)
            .map(|e| e.snapshot.clone())
    }

    /// Drop the cached snapshot; the next call refreshes.
    pub fn invalidate(&self) {
        *self.entry.write().unwrap() = None;
    }

    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> DataResult<CachedMetadata>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DataResult<MetadataSnapshot>>,
    {
        if let Some(snapshot) = self.fresh() {
            debug!("Metadata cache hit");
            return Ok(CachedMetadata {
                snapshot,
                outcome: CacheOutcome::Hit,
            });
        }

        let started = self.clock.now();
        // No lock is held while the refresh runs
        match refresh().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let expires_at = started
                    .checked_add_signed(self.ttl)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                *self.entry.write().unwrap() = Some(CacheEntry {
                    snapshot: snapshot.clone(),
                    expires_at,
                });
                info!(
                    "Metadata refreshed: {} records, valid until {}",
                    snapshot.total_records, expires_at
                );
                Ok(CachedMetadata {
                    snapshot,
                    outcome: CacheOutcome::Refreshed,
                })
            }
            Err(err) => {
                let previous = self
                    .entry
                    .read()
                    .unwrap()
                    .as_ref()
                    .map(|e| e.snapshot.clone());
                match previous {
                    Some(snapshot) => {
                        warn!(
                            "Metadata refresh failed, serving snapshot from {}: {}",
                            snapshot.last_updated, err
                        );
                        Ok(CachedMetadata {
                            snapshot,
                            outcome: CacheOutcome::Stale,
                        })
                    }
                    None => Err(err),
                }
            }
        }
    }
}
