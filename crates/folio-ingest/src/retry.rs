use std::time::Duration;

use crate::error::IngestError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

fn is_retryable(err: &IngestError) -> bool {
    matches!(
        err,
        IngestError::Embedding(_) | IngestError::Storage(_) | IngestError::Timeout
    )
}

/// Run one external call under a timeout, retrying transient failures with
/// exponential backoff. Config and extraction failures surface immediately.
pub(crate) async fn external_call<T, E, F, Fut>(
    policy: &RetryPolicy,
    timeout: Duration,
    operation: &str,
    mut f: F,
) -> Result<T, IngestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<IngestError>,
{
    let mut attempt = 0;
    loop {
        let failure = match tokio::time::timeout(timeout, f()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e.into(),
            Err(_) => IngestError::Timeout,
        };
        if attempt < policy.max_retries && is_retryable(&failure) {
            let delay = policy.base_delay * 2u32.saturating_pow(attempt);
            tracing::warn!(operation, attempt, error = %failure, ?delay, "retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        } else {
            return Err(failure);
        }
    }
}
