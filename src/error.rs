//! Error types for the shard reader

use crate::client::KinesisClientError;
use thiserror::Error;

/// Main error type for shard reading operations
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Failed to get iterator for shard {shard_id}: {source}")]
    GetIteratorFailed {
        shard_id: String,
        #[source]
        source: KinesisClientError,
    },

    #[error("Iterator expired for shard {0} and the refreshed iterator expired as well")]
    IteratorExpired(String),

    #[error("Failed to get records for shard {shard_id}: {source}")]
    GetRecordsFailed {
        shard_id: String,
        #[source]
        source: KinesisClientError,
    },

    #[error("Record filter failed: {0}")]
    FilterFailed(#[source] anyhow::Error),
}

impl ProcessorError {
    /// Whether the failure comes from the Kinesis service or the network
    /// and may succeed if the caller tries again later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProcessorError::GetIteratorFailed { .. }
                | ProcessorError::IteratorExpired(_)
                | ProcessorError::GetRecordsFailed { .. }
        )
    }
}

/// Result type for shard reading operations
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Error type for checkpoint construction
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("Invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    #[error("Invalid sequence number: {0}")]
    InvalidSequenceNumber(String),
}
