mod diagnostics;
mod memory_store;
mod models;
mod record_query;
mod schema;
mod store;
mod trait_def;

pub use diagnostics::DatabaseReport;
pub use memory_store::InMemoryInvestmentStore;
pub use models::*;
pub use record_query::{KeysetBoundary, RecordFilter, RecordQuery, SortSpec};
pub use schema::RECORDS_TABLE_NAME;
pub use store::SqliteInvestmentStore;
pub use trait_def::InvestmentStore;
