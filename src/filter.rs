//! Filters applied to every fetched batch before records are handed out

use crate::checkpoint::ShardCheckpoint;
use crate::record::KinesisRecord;
use anyhow::Context;
use tracing::debug;

/// Drops records from a freshly fetched batch
///
/// Implementations may remove records but must keep the survivors in their
/// original order and must never add records. The checkpoint passed in is
/// the reader's position before the batch.
pub trait RecordFilter<C>: Send + Sync {
    fn apply(&self, records: Vec<KinesisRecord>, checkpoint: &C)
        -> anyhow::Result<Vec<KinesisRecord>>;
}

/// Drops records the checkpoint has already moved past
///
/// Re-reading an aggregated record from its start, or an at-least-once
/// redelivery, yields records that were consumed before. They are removed
/// here so the reader hands out each position once.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeduplicatingRecordFilter;

impl RecordFilter<ShardCheckpoint> for DeduplicatingRecordFilter {
    fn apply(
        &self,
        records: Vec<KinesisRecord>,
        checkpoint: &ShardCheckpoint,
    ) -> anyhow::Result<Vec<KinesisRecord>> {
        let fetched = records.len();
        let mut kept = Vec::with_capacity(fetched);

        for record in records {
            let pending = checkpoint.is_before_or_at(&record).with_context(|| {
                format!(
                    "Failed to compare record {} with checkpoint {}",
                    record.sequence_number, checkpoint
                )
            })?;
            if pending {
                kept.push(record);
            }
        }

        if kept.len() < fetched {
            debug!(
                checkpoint = %checkpoint,
                fetched = fetched,
                dropped = fetched - kept.len(),
                "Dropped already consumed records"
            );
        }

        Ok(kept)
    }
}

/// Keeps every record
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughFilter;

impl<C> RecordFilter<C> for PassThroughFilter {
    fn apply(&self, records: Vec<KinesisRecord>, _checkpoint: &C) -> anyhow::Result<Vec<KinesisRecord>> {
        Ok(records)
    }
}

impl<C, F> RecordFilter<C> for F
where
    F: Fn(Vec<KinesisRecord>, &C) -> anyhow::Result<Vec<KinesisRecord>> + Send + Sync,
{
    fn apply(&self, records: Vec<KinesisRecord>, checkpoint: &C) -> anyhow::Result<Vec<KinesisRecord>> {
        self(records, checkpoint)
    }
}
