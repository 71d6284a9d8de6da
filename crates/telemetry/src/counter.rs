//! Shared rate-limit counter.
//!
//! Incremented by the retry wrapper on every classified rate-limit error,
//! read by the CLI and by tests. Clones share the same underlying count.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default)]
pub struct RateLimitCounter {
    hits: Arc<AtomicU64>,
}

impl RateLimitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one rate-limit hit and return the new total.
    pub fn increment(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_count() {
        let counter = RateLimitCounter::new();
        let clone = counter.clone();

        assert_eq!(counter.increment(), 1);
        assert_eq!(clone.increment(), 2);
        assert_eq!(counter.get(), 2);

        clone.reset();
        assert_eq!(counter.get(), 0);
    }
}
