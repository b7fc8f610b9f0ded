//! Common test utilities for range-dl HTTP tests

#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use range_dl::{Config, RetryConfig};
use std::time::Duration;

/// Config with `chunk_count` ranges and fast, jitter-free retries
pub fn fast_config(chunk_count: usize) -> Config {
    Config {
        chunk_count,
        retry: RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Default::default()
    }
}
