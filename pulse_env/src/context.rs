//! Core environment context trait for the heartbeat simulator.

use async_trait::async_trait;
use std::time::Duration;

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so the simulator's state machine
/// can run against wall-clock time or against a virtual clock.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, `thread_rng`
/// - **Simulation**: `SimContext` - virtual clock, `ChaCha8Rng(seed)`
#[async_trait]
pub trait PulseContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Elapsed run time is measured against this clock.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Draws a value uniformly from `low..=high`.
    ///
    /// Returns `low` when the range is empty.
    fn random_in(&self, low: u64, high: u64) -> u64;

    /// Returns the id of the process the simulator speaks for.
    fn pid(&self) -> u32;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;
}
