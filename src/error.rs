use thiserror::Error;

/// Failure reported by a [`QueryService`](crate::services::QueryService).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server returned status {status}")]
    Server { status: u16 },

    #[error("item not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub enum BrowseError {
    /// Network or server failure while paging. Loaded items are kept and the
    /// same offset is retried on the next scroll stop or explicit reload.
    #[error("fetch at offset {offset} failed: {source}")]
    TransientFetch {
        offset: usize,
        #[source]
        source: QueryError,
    },

    /// Unhandled enum combination or nonsensical geometry input.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A completion arrived for a collection generation that is no longer active.
    #[error("discarded result for stale generation {generation}")]
    StaleInstance { generation: u64 },
}

impl BrowseError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TransientFetch { .. } | Self::StaleInstance { .. })
    }
}

pub type Result<T> = std::result::Result<T, BrowseError>;
