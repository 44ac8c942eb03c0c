use crate::record::KinesisRecord;
use crate::retry::{RetryConfig, RetryError, RetryHandle, Retryable};
use async_trait::async_trait;
use aws_sdk_kinesis::{
    error::{DisplayErrorContext, SdkError},
    operation::{
        get_records::{GetRecordsError, GetRecordsOutput},
        get_shard_iterator::{GetShardIteratorError, GetShardIteratorOutput},
    },
    types::ShardIteratorType,
    Client,
};
use aws_smithy_types_convert::date_time::DateTimeExt;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, trace};

/// Errors reported by a Kinesis client
///
/// `ExpiredIterator` is kept apart from everything else because the shard
/// reader recovers from it by deriving a new iterator from its checkpoint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KinesisClientError {
    #[error("Iterator expired")]
    ExpiredIterator,

    #[error("Provisioned throughput exceeded")]
    ThroughputExceeded,

    #[error("Access denied")]
    AccessDenied,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("KMS error: {0}")]
    KmsError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("{0}")]
    Other(String),
}

impl KinesisClientError {
    pub fn is_expired_iterator(&self) -> bool {
        matches!(self, KinesisClientError::ExpiredIterator)
    }
}

impl Retryable for KinesisClientError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            KinesisClientError::ThroughputExceeded
                | KinesisClientError::Timeout(_)
                | KinesisClientError::ConnectionError(_)
        )
    }
}

/// One batch returned by `GetRecords`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetRecordsResult {
    pub records: Vec<KinesisRecord>,
    /// Iterator for the following call. Present even when `records` is
    /// empty; absent only once a closed shard has been fully read.
    pub next_shard_iterator: Option<String>,
    pub millis_behind_latest: i64,
}

/// The Kinesis operations a shard reader needs
#[async_trait]
pub trait KinesisClientTrait: Send + Sync {
    async fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        iterator_type: ShardIteratorType,
        starting_sequence_number: Option<&str>,
        timestamp: Option<&DateTime<Utc>>,
    ) -> Result<String, KinesisClientError>;

    async fn get_records(
        &self,
        shard_iterator: &str,
        stream_name: &str,
        shard_id: &str,
    ) -> Result<GetRecordsResult, KinesisClientError>;
}

/// Configuration for [`KinesisClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum number of records per `GetRecords` call, 0 for the service default
    pub batch_size: i32,
    /// Timeout for a single API call
    pub api_timeout: Duration,
    /// Retry policy for throttling and network failures
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            api_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

/// [`KinesisClientTrait`] on top of the AWS SDK client
#[derive(Debug, Clone)]
pub struct KinesisClient {
    client: Client,
    config: ClientConfig,
}

impl KinesisClient {
    pub fn new(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Build the SDK client from the default credential and region chain
    pub async fn from_env(config: ClientConfig) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config), config)
    }

    async fn call<T, Fut>(&self, fut: Fut) -> Result<T, KinesisClientError>
    where
        Fut: Future<Output = Result<T, KinesisClientError>>,
    {
        match tokio::time::timeout(self.config.api_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(KinesisClientError::Timeout(format!(
                "no response within {:?}",
                self.config.api_timeout
            ))),
        }
    }

    fn retry_handle(&self) -> RetryHandle<crate::retry::ExponentialBackoff> {
        RetryHandle::new(self.config.retry.clone(), self.config.retry.backoff())
    }
}

#[async_trait]
impl KinesisClientTrait for KinesisClient {
    #[instrument(skip(self, timestamp))]
    async fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        iterator_type: ShardIteratorType,
        starting_sequence_number: Option<&str>,
        timestamp: Option<&DateTime<Utc>>,
    ) -> Result<String, KinesisClientError> {
        let timestamp = timestamp.map(|ts| aws_smithy_types::DateTime::from_chrono_utc(*ts));

        let output = self
            .retry_handle()
            .retry(move || {
                let req = self
                    .client
                    .get_shard_iterator()
                    .stream_name(stream_name)
                    .shard_id(shard_id)
                    .shard_iterator_type(iterator_type.clone())
                    .set_starting_sequence_number(starting_sequence_number.map(String::from))
                    .set_timestamp(timestamp.clone());
                self.call(async move {
                    req.send()
                        .await
                        .map_err(|e| classify_sdk_error(e, classify_get_shard_iterator))
                })
            })
            .await
            .map_err(RetryError::into_inner)?;

        let iterator = shard_iterator_from_output(&output)?;

        debug!(stream = %stream_name, shard_id = %shard_id, "Acquired shard iterator");
        Ok(iterator)
    }

    #[instrument(skip(self, shard_iterator))]
    async fn get_records(
        &self,
        shard_iterator: &str,
        stream_name: &str,
        shard_id: &str,
    ) -> Result<GetRecordsResult, KinesisClientError> {
        let output = self
            .retry_handle()
            .retry(move || {
                let mut req = self.client.get_records().shard_iterator(shard_iterator);
                if self.config.batch_size > 0 {
                    req = req.limit(self.config.batch_size);
                }
                self.call(async move {
                    req.send()
                        .await
                        .map_err(|e| classify_sdk_error(e, classify_get_records))
                })
            })
            .await
            .map_err(RetryError::into_inner)?;

        let result = records_from_output(&output, stream_name, shard_id);
        trace!(
            shard_id = %shard_id,
            count = result.records.len(),
            millis_behind_latest = result.millis_behind_latest,
            "Fetched records"
        );

        Ok(result)
    }
}

fn shard_iterator_from_output(output: &GetShardIteratorOutput) -> Result<String, KinesisClientError> {
    output.shard_iterator().map(String::from).ok_or_else(|| {
        KinesisClientError::Other("GetShardIterator returned no iterator".to_string())
    })
}

fn records_from_output(output: &GetRecordsOutput, stream_name: &str, shard_id: &str) -> GetRecordsResult {
    GetRecordsResult {
        records: output
            .records()
            .iter()
            .map(|record| KinesisRecord::from_sdk(record, stream_name, shard_id))
            .collect(),
        next_shard_iterator: output.next_shard_iterator().map(String::from),
        millis_behind_latest: output.millis_behind_latest().unwrap_or(0),
    }
}

fn classify_sdk_error<E, R>(
    err: SdkError<E, R>,
    service: impl FnOnce(E) -> KinesisClientError,
) -> KinesisClientError
where
    E: std::error::Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(e) => service(e.into_err()),
        SdkError::TimeoutError(_) => KinesisClientError::Timeout("SDK request timed out".to_string()),
        SdkError::DispatchFailure(e) => KinesisClientError::ConnectionError(format!("{e:?}")),
        other => KinesisClientError::Other(DisplayErrorContext(&other).to_string()),
    }
}

fn classify_get_records(err: GetRecordsError) -> KinesisClientError {
    let message = err.to_string();
    match err {
        GetRecordsError::ExpiredIteratorException(_) => KinesisClientError::ExpiredIterator,
        GetRecordsError::ProvisionedThroughputExceededException(_)
        | GetRecordsError::KmsThrottlingException(_) => KinesisClientError::ThroughputExceeded,
        GetRecordsError::AccessDeniedException(_) => KinesisClientError::AccessDenied,
        GetRecordsError::InvalidArgumentException(_) => KinesisClientError::InvalidArgument(message),
        GetRecordsError::ResourceNotFoundException(_) => {
            KinesisClientError::ResourceNotFound(message)
        }
        GetRecordsError::KmsAccessDeniedException(_)
        | GetRecordsError::KmsDisabledException(_)
        | GetRecordsError::KmsInvalidStateException(_)
        | GetRecordsError::KmsNotFoundException(_)
        | GetRecordsError::KmsOptInRequired(_) => KinesisClientError::KmsError(message),
        _ => KinesisClientError::Other(message),
    }
}

fn classify_get_shard_iterator(err: GetShardIteratorError) -> KinesisClientError {
    let message = err.to_string();
    match err {
        GetShardIteratorError::ProvisionedThroughputExceededException(_) => {
            KinesisClientError::ThroughputExceeded
        }
        GetShardIteratorError::AccessDeniedException(_) => KinesisClientError::AccessDenied,
        GetShardIteratorError::InvalidArgumentException(_) => {
            KinesisClientError::InvalidArgument(message)
        }
        GetShardIteratorError::ResourceNotFoundException(_) => {
            KinesisClientError::ResourceNotFound(message)
        }
        _ => KinesisClientError::Other(message),
    }
}
