//! Query, aggregation and caching layer over a flat table of investment records.

pub mod aggregation;
pub mod clock;
pub mod config;
pub mod currency;
pub mod error;
pub mod investment_store;
pub mod metadata;
pub mod query;
pub mod retry;
pub mod service;
pub mod sqlite_persistence;

pub use error::{DataError, DataResult};
pub use service::InvestmentService;
