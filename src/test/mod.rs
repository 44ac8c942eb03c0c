//! Test utilities and mock implementations for testing shard readers


use crate::client::GetRecordsResult;
use crate::record::KinesisRecord;
use bytes::Bytes;
use chrono::Utc;

pub const TEST_STREAM: &str = "test-stream";
pub const TEST_SHARD: &str = "shard-1";

/// Helper functions for creating test data
pub struct TestUtils;

impl TestUtils {
    /// Create a record on `test-stream/shard-1` with the given sequence number
    pub fn create_test_record(sequence_number: &str, data: &[u8]) -> KinesisRecord {
        Self::create_shard_record(TEST_SHARD, sequence_number, data)
    }

    pub fn create_shard_record(shard_id: &str, sequence_number: &str, data: &[u8]) -> KinesisRecord {
        KinesisRecord {
            data: Bytes::copy_from_slice(data),
            sequence_number: sequence_number.to_string(),
            sub_sequence_number: 0,
            partition_key: "test-partition-key".to_string(),
            approximate_arrival_timestamp: None,
            read_time: Utc::now(),
            stream_name: TEST_STREAM.to_string(),
            shard_id: shard_id.to_string(),
        }
    }

    /// `count` records with consecutive sequence numbers starting at `start`
    pub fn create_test_records(start: u64, count: usize) -> Vec<KinesisRecord> {
        (start..start + count as u64)
            .map(|seq| Self::create_test_record(&seq.to_string(), format!("data-{seq}").as_bytes()))
            .collect()
    }

    pub fn records_result(records: Vec<KinesisRecord>, next_shard_iterator: &str) -> GetRecordsResult {
        GetRecordsResult {
            records,
            next_shard_iterator: Some(next_shard_iterator.to_string()),
            millis_behind_latest: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_record() {
        let record = TestUtils::create_test_record("7", b"test-data");
        assert_eq!(record.sequence_number, "7");
        assert_eq!(record.data.as_ref(), b"test-data");
        assert_eq!(record.partition_key, "test-partition-key");
        assert_eq!(record.stream_name, TEST_STREAM);
        assert_eq!(record.shard_id, TEST_SHARD);
    }

    #[test]
    fn test_create_test_records() {
        let records = TestUtils::create_test_records(5, 3);
        let sequences: Vec<_> = records.iter().map(|r| r.sequence_number.as_str()).collect();
        assert_eq!(sequences, vec!["5", "6", "7"]);
        assert_eq!(records[0].data.as_ref(), b"data-5");
    }
}
