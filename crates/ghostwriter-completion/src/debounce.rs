//! Request debouncing
//!
//! Of N rapid calls within the delay window, exactly the last proceeds,
//! and only after the full delay has elapsed with no newer call arriving.
//! Each call takes a fresh token and overwrites the "most recent" marker;
//! when its sleep ends it proceeds only if it is still the most recent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Coalesces rapid triggers into the latest one
#[derive(Debug, Default)]
pub struct Debouncer {
    counter: AtomicU64,
    latest: AtomicU64,
}

impl Debouncer {
    /// Create a new debouncer with no pending call
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait out the delay; report whether this call was superseded
    ///
    /// Returns `true` ("skip") when a newer call arrived during the delay
    /// or [`Debouncer::clear`] ran; the caller must then produce no
    /// output. Returns `false` ("proceed") otherwise, clearing the marker.
    pub async fn should_skip(&self, delay: Duration) -> bool {
        let token = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest.store(token, Ordering::SeqCst);

        tokio::time::sleep(delay).await;

        if self.latest.load(Ordering::SeqCst) != token {
            return true;
        }
        self.latest.store(0, Ordering::SeqCst);
        false
    }

    /// Cancel any pending call without letting it proceed
    pub fn clear(&self) {
        self.latest.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_single_call_proceeds() {
        let debouncer = Debouncer::new();
        assert!(!debouncer.should_skip(Duration::from_millis(50)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_of_rapid_calls_proceeds() {
        let debouncer = Arc::new(Debouncer::new());
        let delay = Duration::from_millis(50);

        let first = tokio::spawn({
            let debouncer = debouncer.clone();
            async move { debouncer.should_skip(delay).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = tokio::spawn({
            let debouncer = debouncer.clone();
            async move { debouncer.should_skip(delay).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let third = tokio::spawn({
            let debouncer = debouncer.clone();
            async move { debouncer.should_skip(delay).await }
        });

        assert!(first.await.unwrap());
        assert!(second.await.unwrap());
        assert!(!third.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending_call() {
        let debouncer = Arc::new(Debouncer::new());
        let pending = tokio::spawn({
            let debouncer = debouncer.clone();
            async move { debouncer.should_skip(Duration::from_millis(50)).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.clear();
        assert!(pending.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_outside_window_both_proceed() {
        let debouncer = Debouncer::new();
        let delay = Duration::from_millis(50);
        assert!(!debouncer.should_skip(delay).await);
        assert!(!debouncer.should_skip(delay).await);
    }
}
