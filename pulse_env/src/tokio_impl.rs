//! Production implementation of PulseContext using Tokio.

use crate::PulseContext;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Production context backed by Tokio and thread-local entropy.
///
/// Time comes from the monotonic system clock, the pid from the OS.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PulseContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn random_in(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }

    fn pid(&self) -> u32 {
        std::process::id()
    }

    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_context_time() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[test]
    fn test_tokio_context_random_in_bounds() {
        let ctx = TokioContext::new();
        for _ in 0..200 {
            let v = ctx.random_in(10, 15);
            assert!((10..=15).contains(&v));
        }

        // Degenerate ranges collapse to the lower bound
        assert_eq!(ctx.random_in(7, 7), 7);
        assert_eq!(ctx.random_in(9, 3), 9);
    }

    #[test]
    fn test_tokio_context_pid_and_seed() {
        let ctx = TokioContext::new();
        assert_eq!(ctx.pid(), std::process::id());
        assert_eq!(ctx.seed(), 0);
    }
}
