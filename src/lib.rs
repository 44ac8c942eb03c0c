//! Go Zoom Kinesis Reader - pull-based record reading for a single Kinesis shard
//!
//! [`ShardRecordsIterator`] reads one shard record by record, keeps a
//! checkpoint right after the last record it handed out and recovers from
//! expired shard iterators by re-deriving them from that checkpoint.

pub mod checkpoint;
pub mod client;
pub mod error;
pub mod filter;
pub mod iterator;
pub mod record;
pub mod retry;

// Make test utilities available for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test;

pub use checkpoint::{Checkpoint, ShardCheckpoint, ShardIteratorKind, StartingPoint};
pub use client::{ClientConfig, GetRecordsResult, KinesisClient, KinesisClientError, KinesisClientTrait};
pub use error::{CheckpointError, ProcessorError, Result};
pub use filter::{DeduplicatingRecordFilter, PassThroughFilter, RecordFilter};
pub use iterator::ShardRecordsIterator;
pub use record::{ExtendedSequenceNumber, KinesisRecord};
pub use retry::{Backoff, ExponentialBackoff, RetryConfig};
