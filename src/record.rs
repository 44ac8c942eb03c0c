//! Records read from a Kinesis shard

use crate::error::CheckpointError;
use aws_sdk_kinesis::types::Record;
use aws_smithy_types_convert::date_time::DateTimeExt;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tracing::warn;

/// A single record read from a shard, tagged with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct KinesisRecord {
    pub data: Bytes,
    pub sequence_number: String,
    /// Position inside an aggregated record, 0 for plain records
    pub sub_sequence_number: i64,
    pub partition_key: String,
    pub approximate_arrival_timestamp: Option<DateTime<Utc>>,
    /// When this reader received the record
    pub read_time: DateTime<Utc>,
    pub stream_name: String,
    pub shard_id: String,
}

impl KinesisRecord {
    /// Convert a record returned by `GetRecords`
    pub fn from_sdk(record: &Record, stream_name: &str, shard_id: &str) -> Self {
        let approximate_arrival_timestamp =
            record
                .approximate_arrival_timestamp()
                .and_then(|ts| match ts.to_chrono_utc() {
                    Ok(ts) => Some(ts),
                    Err(e) => {
                        warn!(
                            shard_id = %shard_id,
                            sequence = %record.sequence_number(),
                            error = %e,
                            "Dropping unrepresentable arrival timestamp"
                        );
                        None
                    }
                });

        Self {
            data: Bytes::copy_from_slice(record.data().as_ref()),
            sequence_number: record.sequence_number().to_string(),
            sub_sequence_number: 0,
            partition_key: record.partition_key().unwrap_or_default().to_string(),
            approximate_arrival_timestamp,
            read_time: Utc::now(),
            stream_name: stream_name.to_string(),
            shard_id: shard_id.to_string(),
        }
    }

    pub fn extended_sequence_number(&self) -> Result<ExtendedSequenceNumber, CheckpointError> {
        ExtendedSequenceNumber::parse(&self.sequence_number, self.sub_sequence_number)
    }
}

/// Sequence number plus sub-sequence number, ordered lexicographically
///
/// Kinesis sequence numbers are decimal strings of up to 128 digits, wider
/// than any integer type, so they are kept as normalized digit strings and
/// compared by length first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedSequenceNumber {
    sequence_number: String,
    sub_sequence_number: i64,
}

impl ExtendedSequenceNumber {
    pub fn parse(sequence_number: &str, sub_sequence_number: i64) -> Result<Self, CheckpointError> {
        Ok(Self {
            sequence_number: normalize_sequence_number(sequence_number)?,
            sub_sequence_number,
        })
    }

    pub fn sequence_number(&self) -> &str {
        &self.sequence_number
    }
}

impl Ord for ExtendedSequenceNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence_number
            .len()
            .cmp(&other.sequence_number.len())
            .then_with(|| self.sequence_number.cmp(&other.sequence_number))
            .then(self.sub_sequence_number.cmp(&other.sub_sequence_number))
    }
}

impl PartialOrd for ExtendedSequenceNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Validate a decimal sequence number and strip its leading zeros
pub(crate) fn normalize_sequence_number(sequence_number: &str) -> Result<String, CheckpointError> {
    if sequence_number.is_empty() || !sequence_number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CheckpointError::InvalidSequenceNumber(
            sequence_number.to_string(),
        ));
    }
    let trimmed = sequence_number.trim_start_matches('0');
    Ok(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
}
