//! Bounded retry of port calls.

use std::future::Future;

use tracing::warn;

use crate::config::RetryPolicy;

use super::ports::PortError;

/// The last error of a call that ran out of attempts or failed permanently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure {
    /// Attempts made, including the first.
    pub attempts: u32,
    /// The error from the final attempt.
    pub error: PortError,
}

/// Calls `call` until it succeeds, fails permanently, or `policy` runs out
/// of attempts, sleeping with exponential backoff between attempts.
///
/// # Example
///
/// ```
/// use attendance_reconciler::config::RetryPolicy;
/// use attendance_reconciler::engine::{PortError, retry};
///
/// # tokio_test_block(async {
/// let mut calls = 0;
/// let result = retry(&RetryPolicy::immediate(3), "fetch", || {
///     calls += 1;
///     let outcome = if calls < 3 { Err(PortError::transient("busy")) } else { Ok(calls) };
///     async move { outcome }
/// })
/// .await;
/// assert_eq!(result, Ok(3));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PortError>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                return Err(RetryFailure {
                    attempts: attempt,
                    error,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted(
        outcomes: Vec<Result<u32, PortError>>,
    ) -> impl FnMut() -> std::future::Ready<Result<u32, PortError>> {
        let mut outcomes = outcomes.into_iter();
        move || {
            std::future::ready(
                outcomes
                    .next()
                    .unwrap_or_else(|| Err(PortError::permanent("script exhausted"))),
            )
        }
    }

    #[tokio::test]
    async fn test_first_success_is_returned() {
        let result = retry(&RetryPolicy::immediate(3), "test", scripted(vec![Ok(7)])).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let result = retry(
            &RetryPolicy::immediate(3),
            "test",
            scripted(vec![
                Err(PortError::transient("timeout")),
                Err(PortError::transient("timeout")),
                Ok(1),
            ]),
        )
        .await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let result = retry(
            &RetryPolicy::immediate(2),
            "test",
            scripted(vec![
                Err(PortError::transient("timeout")),
                Err(PortError::transient("still down")),
                Ok(1),
            ]),
        )
        .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.attempts, 2);
        assert_eq!(failure.error.message, "still down");
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let result = retry(
            &RetryPolicy::immediate(5),
            "test",
            scripted(vec![Err(PortError::permanent("rejected")), Ok(1)]),
        )
        .await;

        assert_eq!(result.unwrap_err().attempts, 1);
    }

    #[tokio::test]
    async fn test_backoff_sleeps_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay_ms: 10,
            max_delay_ms: 100,
            multiplier: 2.0,
        };
        let started = std::time::Instant::now();

        let result = retry(
            &policy,
            "test",
            scripted(vec![
                Err(PortError::transient("timeout")),
                Err(PortError::transient("timeout")),
                Ok(1),
            ]),
        )
        .await;

        assert_eq!(result, Ok(1));
        assert!(started.elapsed() >= std::time::Duration::from_millis(30));
    }
}
