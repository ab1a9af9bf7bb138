//! Bounded retry / bounded wait primitives.
//!
//! Every wait in the pipeline goes through [`poll_until`] and every
//! recoverable failure site (CAPTCHA cycle, row retrieval, dropdown
//! population) goes through [`bounded`]. Nothing in the crate blocks
//! indefinitely.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::warn;

/// Run `op` up to `attempts` times, returning the first `Ok`. The last error
/// is returned once the budget is spent. Failed attempts are logged at warn
/// level under `what`.
pub async fn bounded<T, E, F, Fut>(what: &str, attempts: u32, op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    bounded_when(what, attempts, |_| true, op).await
}

/// [`bounded`] with a retryability predicate: an error `retryable` rejects
/// is returned immediately with the remaining budget unspent.
pub async fn bounded_when<T, E, F, Fut, P>(
    what: &str,
    attempts: u32,
    retryable: P,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    debug_assert!(attempts > 0);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                if !retryable(&e) {
                    return Err(e);
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.expect("at least one attempt was made"))
}

/// Poll `probe` every `interval` until it yields `Some`, or `timeout`
/// expires. Returns `None` on expiry; the caller decides what kind of
/// timeout that is.
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(interval.min(deadline - Instant::now())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn bounded_stops_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = bounded("always-fails", 3, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope") }
        })
        .await;
        assert_eq!(result.unwrap_err(), "nope");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn bounded_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = bounded("third-time-lucky", 5, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err("not yet")
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_spends_one_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = bounded_when(
            "hard-stop",
            5,
            |e: &&str| *e != "broken",
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("broken") }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "broken");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn poll_until_times_out() {
        let result: Option<()> = poll_until(
            Duration::from_millis(30),
            Duration::from_millis(5),
            || async { None },
        )
        .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn poll_until_sees_late_value() {
        let calls = AtomicU32::new(0);
        let result = poll_until(Duration::from_secs(1), Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { (n >= 4).then_some(n) }
        })
        .await;
        assert_eq!(result, Some(4));
    }
}
