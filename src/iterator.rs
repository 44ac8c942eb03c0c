//! Sequential reader for a single shard
//!
//! [`ShardRecordsIterator`] hands out the records of one shard one at a
//! time and advances its checkpoint after every record it returns:
//!
//! - records are served from a pending batch while it lasts
//! - an empty batch triggers exactly one fetch; an idle shard yields `None`
//!   instead of waiting for data
//! - an expired iterator is replaced once per fetch with a new one derived
//!   from the current checkpoint
//!
//! One iterator reads one shard. To read many shards, run one iterator per
//! shard, each in its own task.

use crate::checkpoint::Checkpoint;
use crate::client::{GetRecordsResult, KinesisClientError, KinesisClientTrait};
use crate::error::{ProcessorError, Result};
use crate::filter::RecordFilter;
use crate::record::KinesisRecord;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Which `GetRecords` call of a fetch is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchAttempt {
    /// Using the iterator held from the previous fetch
    Initial,
    /// Using an iterator re-derived after the first one expired
    Refreshed,
}

/// Pull-based record reader for one shard
///
/// # Examples
///
/// ```rust,no_run
/// use go_zoom_kinesis_reader::{
///     ClientConfig, DeduplicatingRecordFilter, KinesisClient, ShardCheckpoint,
///     ShardRecordsIterator, StartingPoint,
/// };
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// async fn read_shard() -> Result<(), go_zoom_kinesis_reader::ProcessorError> {
///     let client = Arc::new(KinesisClient::from_env(ClientConfig::default()).await);
///     let checkpoint = ShardCheckpoint::new("my-stream", "shardId-000000000000", StartingPoint::TrimHorizon);
///     let mut records = ShardRecordsIterator::new(checkpoint, client, DeduplicatingRecordFilter);
///
///     loop {
///         match records.next().await? {
///             Some(record) => println!("{}: {} bytes", record.sequence_number, record.data.len()),
///             None => tokio::time::sleep(Duration::from_secs(1)).await,
///         }
///     }
/// }
/// ```
pub struct ShardRecordsIterator<C, K, F>
where
    C: Checkpoint,
    K: KinesisClientTrait,
    F: RecordFilter<C>,
{
    checkpoint: C,
    client: Arc<K>,
    filter: F,
    /// Iterator for the next `GetRecords` call, derived lazily
    shard_iterator: Option<String>,
    /// Filtered records not yet handed out
    pending: VecDeque<KinesisRecord>,
    millis_behind_latest: Option<i64>,
}

impl<C, K, F> ShardRecordsIterator<C, K, F>
where
    C: Checkpoint,
    K: KinesisClientTrait,
    F: RecordFilter<C>,
{
    pub fn new(initial_checkpoint: C, client: Arc<K>, filter: F) -> Self {
        Self {
            checkpoint: initial_checkpoint,
            client,
            filter,
            shard_iterator: None,
            pending: VecDeque::new(),
            millis_behind_latest: None,
        }
    }

    /// Return the next record, or `None` if the shard has nothing new
    ///
    /// Performs at most one fetch. On success the checkpoint has moved past
    /// the returned record; on `None` or on error it is unchanged.
    pub async fn next(&mut self) -> Result<Option<KinesisRecord>> {
        if self.pending.is_empty() {
            self.pending = self.fetch().await?.into();
        }

        let Some(record) = self.pending.pop_front() else {
            return Ok(None);
        };

        self.checkpoint = self.checkpoint.move_after(&record);
        trace!(
            shard_id = %self.checkpoint.shard_id(),
            sequence = %record.sequence_number,
            remaining = self.pending.len(),
            "Delivering record"
        );

        Ok(Some(record))
    }

    /// Position right after the last record returned by [`next`](Self::next)
    pub fn checkpoint(&self) -> &C {
        &self.checkpoint
    }

    pub fn stream_name(&self) -> &str {
        self.checkpoint.stream_name()
    }

    pub fn shard_id(&self) -> &str {
        self.checkpoint.shard_id()
    }

    /// Lag reported by the last successful fetch
    pub fn millis_behind_latest(&self) -> Option<i64> {
        self.millis_behind_latest
    }

    pub fn into_checkpoint(self) -> C {
        self.checkpoint
    }

    /// Fetch and filter the next batch. Only called with an empty buffer.
    async fn fetch(&mut self) -> Result<Vec<KinesisRecord>> {
        let mut shard_iterator = match &self.shard_iterator {
            Some(it) => it.clone(),
            None => {
                let it = self.derive_shard_iterator().await?;
                self.shard_iterator = Some(it.clone());
                it
            }
        };

        let mut attempt = FetchAttempt::Initial;
        let result = loop {
            match self.get_records(&shard_iterator).await {
                Ok(result) => break result,
                Err(e) if e.is_expired_iterator() => match attempt {
                    FetchAttempt::Initial => {
                        warn!(
                            shard_id = %self.checkpoint.shard_id(),
                            "Iterator expired, deriving a new one from the checkpoint"
                        );
                        shard_iterator = self.derive_shard_iterator().await?;
                        self.shard_iterator = Some(shard_iterator.clone());
                        attempt = FetchAttempt::Refreshed;
                    }
                    FetchAttempt::Refreshed => {
                        warn!(
                            shard_id = %self.checkpoint.shard_id(),
                            "Refreshed iterator expired as well"
                        );
                        return Err(ProcessorError::IteratorExpired(
                            self.checkpoint.shard_id().to_string(),
                        ));
                    }
                },
                Err(source) => {
                    return Err(ProcessorError::GetRecordsFailed {
                        shard_id: self.checkpoint.shard_id().to_string(),
                        source,
                    })
                }
            }
        };

        let GetRecordsResult {
            records,
            next_shard_iterator,
            millis_behind_latest,
        } = result;
        self.millis_behind_latest = Some(millis_behind_latest);

        // a rejected batch keeps the held iterator so the next call reads it again
        let fetched = records.len();
        let filtered = self
            .filter
            .apply(records, &self.checkpoint)
            .map_err(ProcessorError::FilterFailed)?;

        // rotate even on an empty batch, otherwise the drained position is read forever
        match next_shard_iterator {
            Some(next) => self.shard_iterator = Some(next),
            None => debug!(
                shard_id = %self.checkpoint.shard_id(),
                "No next iterator returned, shard is closed"
            ),
        }

        debug!(
            shard_id = %self.checkpoint.shard_id(),
            fetched = fetched,
            kept = filtered.len(),
            millis_behind_latest = millis_behind_latest,
            "Fetched batch"
        );

        Ok(filtered)
    }

    async fn get_records(
        &self,
        shard_iterator: &str,
    ) -> std::result::Result<GetRecordsResult, KinesisClientError> {
        self.client
            .get_records(
                shard_iterator,
                self.checkpoint.stream_name(),
                self.checkpoint.shard_id(),
            )
            .await
    }

    async fn derive_shard_iterator(&self) -> Result<String> {
        self.checkpoint
            .shard_iterator(self.client.as_ref())
            .await
            .map_err(|source| ProcessorError::GetIteratorFailed {
                shard_id: self.checkpoint.shard_id().to_string(),
                source,
            })
    }
}
