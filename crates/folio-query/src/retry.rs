use std::time::Duration;

use crate::error::QueryError;

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

fn is_retryable(err: &QueryError) -> bool {
    matches!(
        err,
        QueryError::Retrieval(_) | QueryError::Llm(_) | QueryError::Timeout
    )
}

/// Retry a fallible call with exponential backoff. Config, parse, and
/// cancellation failures surface immediately.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, QueryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, QueryError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && is_retryable(&e) => {
                let delay = policy.base_delay * 2u32.saturating_pow(attempt);
                tracing::warn!(operation, attempt, error = %e, ?delay, "retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
