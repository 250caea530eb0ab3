use std::fmt::Debug;

use crate::error::DbError;

pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Decides whether a failed attempt of a logical query is tried again.
pub trait RetryPolicy: Debug + Send + Sync {
    /// `attempts` counts the attempts made so far, the failed one included.
    fn should_retry(&self, attempts: u32, error: &DbError) -> bool;
}

/// Retries any failure up to `num_retries` times, immediately and without
/// looking at the error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleRetryPolicy {
    pub num_retries: u32,
}

impl SimpleRetryPolicy {
    pub const fn new(num_retries: u32) -> Self {
        Self { num_retries }
    }
}

impl Default for SimpleRetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy for SimpleRetryPolicy {
    fn should_retry(&self, attempts: u32, _error: &DbError) -> bool {
        attempts <= self.num_retries
    }
}
