use std::sync::atomic::{AtomicU64, Ordering};

/// Request totals shared by the middleware stages
#[derive(Debug, Default)]
pub struct RequestCounters {
    total: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
}

impl RequestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Request refused by admission control
    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Request that ended in a server error
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}
