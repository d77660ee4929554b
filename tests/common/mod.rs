//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestDb, TestService};
//!
//! #[tokio::test]
//! async fn test_metadata() {
//!     let db = TestDb::seeded();
//!     let harness = TestService::over(db.store.clone());
//!     let metadata = harness.service.fetch_metadata().await.unwrap();
//!     assert_eq!(metadata.snapshot.total_records, common::TOTAL_RECORDS);
//! }
//! ```

mod constants;
mod fixtures;

#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{
    dec, flaky_sample_store, reference_records, sample_records, TestDb, TestService,
};
