use crate::constants::RETRYABLE_STATUS_CODES;
use crate::types::{ObservedError, PanelError, Result};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
        }
    }

    pub async fn execute_with_retry<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match operation().await {
                Ok(val) => return Ok(val),
                Err(e) if attempts < self.max_attempts && is_retryable(&e) => {
                    let delay = self.backoff(attempts);
                    tracing::warn!(
                        "Request failed (attempt {}): {}. Retrying in {:?} (jittered)...",
                        attempts,
                        e.inner,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base_delay = self.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt - 1));
        // ±25% jitter
        let jitter_range = base_delay / 4;
        let jitter = if jitter_range > 0 {
            fastrand::i64(-(jitter_range as i64)..jitter_range as i64)
        } else {
            0
        };
        Duration::from_millis((base_delay as i64 + jitter).max(1) as u64)
    }
}

pub fn is_retryable(err: &ObservedError) -> bool {
    match &err.inner {
        PanelError::Network(_) | PanelError::Io(_) => true,
        PanelError::Upstream(status, _) => RETRYABLE_STATUS_CODES.contains(&status.as_u16()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_retry_classification() {
        let busy: ObservedError =
            PanelError::Upstream(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down".into())
                .into();
        assert!(is_retryable(&busy));

        let denied: ObservedError =
            PanelError::Upstream(reqwest::StatusCode::UNAUTHORIZED, "bad key".into()).into();
        assert!(!is_retryable(&denied));

        let short: ObservedError = PanelError::Degenerate(3).into();
        assert!(!is_retryable(&short));
    }

    #[test]
    fn test_backoff_stays_within_jitter_band() {
        let policy = RetryPolicy::new(4, 100);
        for attempt in 1..=3 {
            let expected = 100 * 2u64.pow(attempt - 1);
            let delay = policy.backoff(attempt).as_millis() as u64;
            assert!(delay >= expected - expected / 4, "attempt {}: {}", attempt, delay);
            assert!(delay <= expected + expected / 4, "attempt {}: {}", attempt, delay);
        }
    }
}
