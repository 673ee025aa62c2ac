//! Retry with exponential backoff for opening the source

use std::time::Duration;

use indicatif::ProgressBar;

use crate::error::Retryable;

/// Exponential backoff: `base * 2^(retry-1)` (1s, 2s, 4s, ... for a 1s base)
pub fn backoff_duration(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
}

/// Retry a fallible operation with exponential backoff.
///
/// On retryable errors, logs the failure, updates the progress bar, sleeps,
/// and retries up to `max_retries` times after the first attempt.
///
/// Returns `Ok(T)` on first success, or the final `Err` on exhaustion / non-retryable error.
pub fn retry_with_backoff<T, E>(
    label: &str,
    max_retries: u32,
    base: Duration,
    pb: &ProgressBar,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
{
    let mut retry = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if retry < max_retries && e.is_retryable() => {
                retry += 1;
                let delay = backoff_duration(base, retry);
                pb.set_message(format!("retry {retry}/{max_retries}..."));
                log::warn!(
                    "{label}: attempt {retry}/{} failed: {e}, retrying in {:.1}s",
                    max_retries + 1,
                    delay.as_secs_f64()
                );
                std::thread::sleep(delay);
            }
            Err(e) => {
                log::error!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamError;

    fn http_err(status: u16) -> StreamError {
        StreamError::Http {
            status: Some(status),
            message: "test".to_string(),
            transient: false,
        }
    }

    #[test]
    fn backoff_exponential() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_duration(base, 1), Duration::from_secs(1));
        assert_eq!(backoff_duration(base, 2), Duration::from_secs(2));
        assert_eq!(backoff_duration(base, 3), Duration::from_secs(4));
    }

    #[test]
    fn backoff_scales_with_base() {
        let base = Duration::from_millis(5);
        assert_eq!(backoff_duration(base, 3), Duration::from_millis(20));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = retry_with_backoff(
            "test",
            3,
            Duration::ZERO,
            &ProgressBar::hidden(),
            || {
                calls += 1;
                if calls < 3 { Err(http_err(503)) } else { Ok(calls) }
            },
        );
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_after_budget() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_backoff(
            "test",
            3,
            Duration::ZERO,
            &ProgressBar::hidden(),
            || {
                calls += 1;
                Err(http_err(502))
            },
        );
        assert_eq!(result.unwrap_err().status(), Some(502));
        assert_eq!(calls, 4);
    }

    #[test]
    fn fatal_error_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = retry_with_backoff(
            "test",
            3,
            Duration::ZERO,
            &ProgressBar::hidden(),
            || {
                calls += 1;
                Err(http_err(404))
            },
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
