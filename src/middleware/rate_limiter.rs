use crate::error::AdmissionError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Keys kept before idle windows are swept
const MAX_TRACKED_KEYS: usize = 10_000;

/// State of one key's window after counting a request against it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub admitted: bool,
    /// Requests counted in the current window, including this one if admitted
    pub count: u32,
    /// Time until the oldest counted request leaves the window
    pub reset_after: Duration,
}

/// Backend holding per-key request windows
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count a request against `key` unless the window is already full
    async fn hit(&self, key: &str, limit: u32, window: Duration) -> Result<WindowState, AdmissionError>;
}

/// Sliding-log window kept in process memory.
///
/// Rejected requests are not recorded, so a client hammering a full window
/// does not extend its own lockout.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }

    pub(crate) fn hit_at(&self, key: &str, limit: u32, window: Duration, now: Instant) -> WindowState {
        let mut windows = self.windows.lock();

        if windows.len() >= MAX_TRACKED_KEYS && !windows.contains_key(key) {
            windows.retain(|_, hits| {
                hits.back()
                    .is_some_and(|last| now.saturating_duration_since(*last) < window)
            });
        }

        let hits = windows.entry(key.to_string()).or_default();
        while hits
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= window)
        {
            hits.pop_front();
        }

        let admitted = (hits.len() as u32) < limit;
        if admitted {
            hits.push_back(now);
        }

        let reset_after = hits
            .front()
            .map(|first| window.saturating_sub(now.saturating_duration_since(*first)))
            .unwrap_or(window);

        WindowState {
            admitted,
            count: hits.len() as u32,
            reset_after,
        }
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, key: &str, limit: u32, window: Duration) -> Result<WindowState, AdmissionError> {
        Ok(self.hit_at(key, limit, window, Instant::now()))
    }
}
