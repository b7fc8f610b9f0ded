//! Bounded retry with exponential backoff
//!
//! A range that fails with a transient error is re-attempted at most
//! [`RetryConfig::max_attempts`] times, with the delay growing by
//! `backoff_multiplier` after each try and capped at `max_delay`. Optional jitter
//! spreads the retries of many ranges hitting the same server.
//!
//! # Example
//!
//! ```no_run
//! use range_dl::retry::{IsRetryable, fetch_with_retry};
//! use range_dl::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! fetch_with_retry(&config, || async {
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{RangeError, TransportError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, overloaded servers) return `true`.
/// Failures that will repeat on every attempt (server ignores ranges, truncated
/// payload on a successful status) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for TransportError {
    fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout | TransportError::Connect(_) => true,
            // Body reads fail mid-transfer when the connection drops
            TransportError::Body(_) => true,
            TransportError::Request(_) => false,
        }
    }
}

impl IsRetryable for RangeError {
    fn is_retryable(&self) -> bool {
        match self {
            RangeError::Transport(e) => e.is_retryable(),
            RangeError::ContentMismatch { status } => is_transient_status(*status),
            RangeError::RangeMismatch { .. } | RangeError::LengthMismatch { .. } => false,
        }
    }
}

/// Returns `true` for statuses a server uses to say "try again later"
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..=599).contains(&status)
}

/// Run `operation` until it succeeds, fails permanently, or runs out of retries
///
/// The first attempt is free; after that at most `config.max_attempts` retries follow,
/// each preceded by a backoff pause. The error of the last attempt is returned.
pub async fn fetch_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut retries_left = config.max_attempts;
    let mut pause = config.initial_delay;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_retryable() {
            return Err(error);
        }
        if retries_left == 0 {
            tracing::debug!(
                error = %error,
                retries = config.max_attempts,
                "Giving up on transient failure"
            );
            return Err(error);
        }
        retries_left -= 1;

        let wait = if config.jitter { add_jitter(pause) } else { pause };
        tracing::warn!(
            error = %error,
            retry = config.max_attempts - retries_left,
            of = config.max_attempts,
            wait_ms = wait.as_millis() as u64,
            "Transient failure, backing off"
        );
        tokio::time::sleep(wait).await;

        pause = next_pause(pause, config);
    }
}

/// Grow `pause` by the backoff multiplier, never past `max_delay`
fn next_pause(pause: Duration, config: &RetryConfig) -> Duration {
    let grown = pause.as_secs_f64() * config.backoff_multiplier;
    if grown >= config.max_delay.as_secs_f64() {
        config.max_delay
    } else {
        Duration::from_secs_f64(grown)
    }
}

/// Add up to 100% random jitter, so the result lies in `[delay, 2 * delay]`
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
