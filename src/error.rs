//! Error taxonomy for the query, aggregation and metadata layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    /// A filter, sort or pagination parameter could not be interpreted.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The underlying data store failed (connection, I/O, decoding).
    #[error("Fetch failed: {0:#}")]
    Fetch(#[source] anyhow::Error),

    /// A decimal product or sum left the representable range.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("{operation} failed after {attempts} attempts")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<DataError>,
    },
}

impl DataError {
    pub fn invalid(message: impl Into<String>) -> Self {
        DataError::InvalidQuery(message.into())
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        DataError::Overflow(message.into())
    }

    /// Only store failures are worth another attempt; a bad parameter stays bad.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::Fetch(_))
    }

    /// The failure that ended the last attempt, unwrapping `RetriesExhausted`.
    pub fn root_cause(&self) -> &DataError {
        match self {
            DataError::RetriesExhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<anyhow::Error> for DataError {
    fn from(err: anyhow::Error) -> Self {
        DataError::Fetch(err)
    }
}

pub type DataResult<T> = std::result::Result<T, DataError>;
