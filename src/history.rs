//! The bounded trend window of recent readings.

use std::sync::{Arc, RwLock};

use crate::models::Reading;

/// A bounded, noise-filtered window of recent readings feeding the trend
/// charts.
///
/// Every poll delivers a full authoritative snapshot from the feed, so the
/// window is replaced wholesale rather than merged. Readers hold a cheap
/// `Arc` clone and never observe a partially-updated window.
pub struct HistoryWindow {
    capacity: usize,
    window: RwLock<Arc<Vec<Reading>>>,
}

impl HistoryWindow {
    /// Creates an empty window retaining at most `capacity` readings.
    pub fn new(capacity: usize) -> Self {
        Self { capacity, window: RwLock::new(Arc::new(Vec::new())) }
    }

    /// Replaces the window with the trend-worthy tail of `readings`.
    ///
    /// Input order is arrival order (oldest first) and is preserved.
    pub fn replace(&self, readings: &[Reading]) {
        let filtered: Vec<Reading> =
            readings.iter().copied().filter(Reading::is_trend_worthy).collect();
        let start = filtered.len().saturating_sub(self.capacity);
        let next = Arc::new(filtered[start..].to_vec());

        let mut window = self.window.write().expect("history window lock poisoned");
        *window = next;
    }

    /// The current window, oldest first, at most `capacity` entries.
    pub fn current(&self) -> Arc<Vec<Reading>> {
        Arc::clone(&self.window.read().expect("history window lock poisoned"))
    }

    /// Maximum number of readings retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
