use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;

#[derive(Debug, Default)]
pub struct Counters {
    pub requests: AtomicU64,
    pub increment_failures: AtomicU64,
    pub read_failures: AtomicU64,
    pub timeouts: AtomicU64,
}

impl Counters {
    pub fn inc_request(&self) {
        let _ = self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, err: &Error) {
        let slot = match err {
            Error::Increment { .. } => &self.increment_failures,
            Error::Read { .. } => &self.read_failures,
            Error::Timeout { .. } => &self.timeouts,
            _ => return,
        };
        let _ = slot.fetch_add(1, Ordering::Relaxed);
    }
}
