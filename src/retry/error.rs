use thiserror::Error;

/// Outcome of a [`RetryHandle`](super::RetryHandle) that gave up
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("Maximum retries ({0}) exceeded: {1}")]
    MaxRetriesExceeded(u32, E),

    #[error("Non-retryable failure: {0}")]
    NonRetryable(E),
}

impl<E> RetryError<E> {
    pub fn is_max_retries(&self) -> bool {
        matches!(self, RetryError::MaxRetriesExceeded(_, _))
    }

    /// The error returned by the last attempt
    pub fn into_inner(self) -> E {
        match self {
            RetryError::MaxRetriesExceeded(_, e) | RetryError::NonRetryable(e) => e,
        }
    }
}
