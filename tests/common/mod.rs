// tests/common/mod.rs
#![allow(dead_code)]

use go_zoom_kinesis_reader::test::mocks::MockKinesisClient;
use go_zoom_kinesis_reader::test::TestUtils;
use go_zoom_kinesis_reader::{KinesisRecord, ShardCheckpoint, StartingPoint};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive("go_zoom_kinesis_reader=debug".parse().unwrap()),
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn trim_horizon(shard_id: &str) -> ShardCheckpoint {
    ShardCheckpoint::new("test-stream", shard_id, StartingPoint::TrimHorizon)
}

/// Script `batches` as a chain of iterators `<shard>-0`, `<shard>-1`, ...
/// followed by an idle tail. The first derived iterator is `<shard>-0`.
pub async fn script_shard(client: &MockKinesisClient, shard_id: &str, batches: Vec<Vec<KinesisRecord>>) {
    client.mock_get_iterator(Ok(format!("{shard_id}-0"))).await;

    let tail = batches.len();
    for (i, batch) in batches.into_iter().enumerate() {
        client
            .mock_records_for(
                &format!("{shard_id}-{i}"),
                Ok(TestUtils::records_result(batch, &format!("{shard_id}-{}", i + 1))),
            )
            .await;
    }
    client
        .mock_records_for(
            &format!("{shard_id}-{tail}"),
            Ok(TestUtils::records_result(vec![], &format!("{shard_id}-{tail}"))),
        )
        .await;
}

/// Records for `shard_id` with sequence numbers `start..start + count`
pub fn shard_records(shard_id: &str, start: u64, count: usize) -> Vec<KinesisRecord> {
    (start..start + count as u64)
        .map(|seq| TestUtils::create_shard_record(shard_id, &seq.to_string(), b"payload"))
        .collect()
}
