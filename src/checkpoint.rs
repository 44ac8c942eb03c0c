//! Positions inside a shard
//!
//! A checkpoint is an immutable cursor. Consuming a record never mutates a
//! checkpoint; it produces the next one with [`Checkpoint::move_after`].
//! Checkpoints also know how to turn themselves back into a service-side
//! iterator, which is what lets a reader recover from expired iterators.

use crate::client::{KinesisClientError, KinesisClientTrait};
use crate::error::CheckpointError;
use crate::record::{normalize_sequence_number, ExtendedSequenceNumber, KinesisRecord};
use async_trait::async_trait;
use aws_sdk_kinesis::types::ShardIteratorType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Capabilities a shard reader needs from its position marker
#[async_trait]
pub trait Checkpoint: Clone + Send + Sync {
    /// Ask the service for an iterator starting at this position
    async fn shard_iterator(
        &self,
        client: &dyn KinesisClientTrait,
    ) -> Result<String, KinesisClientError>;

    fn stream_name(&self) -> &str;

    fn shard_id(&self) -> &str;

    /// The position immediately after `record`
    fn move_after(&self, record: &KinesisRecord) -> Self;
}

/// Serializable mirror of the SDK's `ShardIteratorType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShardIteratorKind {
    AtSequenceNumber,
    AfterSequenceNumber,
    AtTimestamp,
    TrimHorizon,
    Latest,
}

impl ShardIteratorKind {
    fn is_sequence_based(self) -> bool {
        matches!(
            self,
            ShardIteratorKind::AtSequenceNumber | ShardIteratorKind::AfterSequenceNumber
        )
    }
}

impl From<ShardIteratorKind> for ShardIteratorType {
    fn from(kind: ShardIteratorKind) -> Self {
        match kind {
            ShardIteratorKind::AtSequenceNumber => ShardIteratorType::AtSequenceNumber,
            ShardIteratorKind::AfterSequenceNumber => ShardIteratorType::AfterSequenceNumber,
            ShardIteratorKind::AtTimestamp => ShardIteratorType::AtTimestamp,
            ShardIteratorKind::TrimHorizon => ShardIteratorType::TrimHorizon,
            ShardIteratorKind::Latest => ShardIteratorType::Latest,
        }
    }
}

impl fmt::Display for ShardIteratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShardIteratorKind::AtSequenceNumber => "AT_SEQUENCE_NUMBER",
            ShardIteratorKind::AfterSequenceNumber => "AFTER_SEQUENCE_NUMBER",
            ShardIteratorKind::AtTimestamp => "AT_TIMESTAMP",
            ShardIteratorKind::TrimHorizon => "TRIM_HORIZON",
            ShardIteratorKind::Latest => "LATEST",
        };
        f.write_str(name)
    }
}

/// Where to start reading a shard that has no sequence-number checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartingPoint {
    /// Start from the newest record
    Latest,
    /// Start from the oldest available record
    TrimHorizon,
    /// Start from the first record that arrived at or after the timestamp
    AtTimestamp(DateTime<Utc>),
}

/// Checkpoint for one shard of one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardCheckpoint {
    stream_name: String,
    shard_id: String,
    iterator_type: ShardIteratorKind,
    sequence_number: Option<String>,
    sub_sequence_number: Option<i64>,
    timestamp: Option<DateTime<Utc>>,
}

impl ShardCheckpoint {
    pub fn new(
        stream_name: impl Into<String>,
        shard_id: impl Into<String>,
        starting_point: StartingPoint,
    ) -> Self {
        let (iterator_type, timestamp) = match starting_point {
            StartingPoint::Latest => (ShardIteratorKind::Latest, None),
            StartingPoint::TrimHorizon => (ShardIteratorKind::TrimHorizon, None),
            StartingPoint::AtTimestamp(ts) => (ShardIteratorKind::AtTimestamp, Some(ts)),
        };

        Self {
            stream_name: stream_name.into(),
            shard_id: shard_id.into(),
            iterator_type,
            sequence_number: None,
            sub_sequence_number: None,
            timestamp,
        }
    }

    /// Checkpoint at or after a known sequence number
    ///
    /// `iterator_type` must be `AtSequenceNumber` or `AfterSequenceNumber`.
    pub fn at_sequence_number(
        stream_name: impl Into<String>,
        shard_id: impl Into<String>,
        iterator_type: ShardIteratorKind,
        sequence_number: &str,
        sub_sequence_number: Option<i64>,
    ) -> Result<Self, CheckpointError> {
        if !iterator_type.is_sequence_based() {
            return Err(CheckpointError::InvalidCheckpoint(format!(
                "{iterator_type} does not take a sequence number"
            )));
        }
        if let Some(sub) = sub_sequence_number {
            if sub < 0 {
                return Err(CheckpointError::InvalidCheckpoint(format!(
                    "negative sub-sequence number {sub}"
                )));
            }
        }
        normalize_sequence_number(sequence_number)?;

        Ok(Self {
            stream_name: stream_name.into(),
            shard_id: shard_id.into(),
            iterator_type,
            sequence_number: Some(sequence_number.to_string()),
            sub_sequence_number,
            timestamp: None,
        })
    }

    pub fn iterator_type(&self) -> ShardIteratorKind {
        self.iterator_type
    }

    pub fn sequence_number(&self) -> Option<&str> {
        self.sequence_number.as_deref()
    }

    pub fn sub_sequence_number(&self) -> Option<i64> {
        self.sub_sequence_number
    }

    pub fn timestamp(&self) -> Option<&DateTime<Utc>> {
        self.timestamp.as_ref()
    }

    /// Whether `record` lies at or beyond this position, i.e. has not been
    /// consumed yet.
    pub fn is_before_or_at(&self, record: &KinesisRecord) -> Result<bool, CheckpointError> {
        match self.iterator_type {
            ShardIteratorKind::Latest | ShardIteratorKind::TrimHorizon => Ok(true),
            ShardIteratorKind::AtTimestamp => {
                let arrival = record.approximate_arrival_timestamp.as_ref();
                Ok(match (self.timestamp.as_ref(), arrival) {
                    (Some(start), Some(arrival)) => start <= arrival,
                    _ => true,
                })
            }
            ShardIteratorKind::AtSequenceNumber | ShardIteratorKind::AfterSequenceNumber => {
                let own = self.extended_sequence_number()?;
                let other = record.extended_sequence_number()?;
                Ok(if self.iterator_type == ShardIteratorKind::AtSequenceNumber {
                    own <= other
                } else {
                    own < other
                })
            }
        }
    }

    fn extended_sequence_number(&self) -> Result<ExtendedSequenceNumber, CheckpointError> {
        let sequence_number = self.sequence_number.as_deref().ok_or_else(|| {
            CheckpointError::InvalidCheckpoint(format!(
                "{} checkpoint without a sequence number",
                self.iterator_type
            ))
        })?;
        ExtendedSequenceNumber::parse(sequence_number, self.sub_sequence_number.unwrap_or(0))
    }

    /// An `AfterSequenceNumber` checkpoint with a sub-sequence number may sit
    /// inside an aggregated record. The service cannot start mid-record, so
    /// the whole record is read again and the filter drops the consumed part.
    /// Every checkpoint produced by `move_after` carries one.
    fn is_inside_aggregated_record(&self) -> bool {
        self.iterator_type == ShardIteratorKind::AfterSequenceNumber
            && self.sub_sequence_number.is_some()
    }
}

#[async_trait]
impl Checkpoint for ShardCheckpoint {
    async fn shard_iterator(
        &self,
        client: &dyn KinesisClientTrait,
    ) -> Result<String, KinesisClientError> {
        let iterator_type = if self.is_inside_aggregated_record() {
            ShardIteratorKind::AtSequenceNumber
        } else {
            self.iterator_type
        };

        debug!(
            stream = %self.stream_name,
            shard_id = %self.shard_id,
            checkpoint = %self,
            requested = %iterator_type,
            "Deriving shard iterator from checkpoint"
        );

        client
            .get_shard_iterator(
                &self.stream_name,
                &self.shard_id,
                iterator_type.into(),
                self.sequence_number.as_deref(),
                self.timestamp.as_ref(),
            )
            .await
    }

    fn stream_name(&self) -> &str {
        &self.stream_name
    }

    fn shard_id(&self) -> &str {
        &self.shard_id
    }

    fn move_after(&self, record: &KinesisRecord) -> Self {
        Self {
            stream_name: self.stream_name.clone(),
            shard_id: self.shard_id.clone(),
            iterator_type: ShardIteratorKind::AfterSequenceNumber,
            sequence_number: Some(record.sequence_number.clone()),
            sub_sequence_number: Some(record.sub_sequence_number),
            timestamp: None,
        }
    }
}

impl fmt::Display for ShardCheckpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iterator_type)?;
        if let Some(seq) = &self.sequence_number {
            write!(f, " {seq}")?;
            if let Some(sub) = self.sub_sequence_number {
                write!(f, ":{sub}")?;
            }
        }
        if let Some(ts) = &self.timestamp {
            write!(f, " {}", ts.to_rfc3339())?;
        }
        write!(f, " @ {}/{}", self.stream_name, self.shard_id)
    }
}
