use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    #[error("lookup timed out")]
    TimedOut,

    #[error("lookup cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            interval: Duration::from_secs(2),
            timeout,
        }
    }
}

/// Calls `probe` until it yields a value, sleeping `interval` between tries.
/// Gives up after `timeout` (measured from the call) or as soon as `cancel`
/// completes, whichever happens first.
pub async fn poll_until<T, F, Fut, C>(
    policy: &RetryPolicy,
    mut probe: F,
    cancel: C,
) -> Result<T, LookupError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
    C: Future<Output = ()>,
{
    let search = async {
        tokio::time::sleep(policy.initial_delay).await;
        loop {
            if let Some(found) = probe().await {
                return found;
            }
            tokio::time::sleep(policy.interval).await;
        }
    };

    tokio::select! {
        found = tokio::time::timeout(policy.timeout, search) => found.map_err(|_| LookupError::TimedOut),
        _ = cancel => Err(LookupError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_policy(timeout_ms: u64) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(1),
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test]
    async fn test_returns_once_probe_succeeds() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let found = poll_until(
            &fast_policy(2_000),
            move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    (n >= 3).then_some(n)
                }
            },
            std::future::pending::<()>(),
        )
        .await;
        assert_eq!(found, Ok(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_when_nothing_appears() {
        let result = poll_until(
            &fast_policy(30),
            || async { None::<()> },
            std::future::pending::<()>(),
        )
        .await;
        assert_eq!(result, Err(LookupError::TimedOut));
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_lookup() {
        let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel::<()>();
        cancel_tx.send(()).unwrap();
        let result = poll_until(
            &fast_policy(5_000),
            || async { None::<()> },
            async move {
                let _ = cancel_rx.await;
            },
        )
        .await;
        assert_eq!(result, Err(LookupError::Cancelled));
    }
}
