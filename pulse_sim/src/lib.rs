//! Pulse Deterministic Simulation Testing (DST) Harness
//!
//! Runs the heartbeat simulator against a virtual clock so a full
//! observation window (minutes of wall time) replays in microseconds.
//!
//! # Core Principle: The Reactor Pattern
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: Virtual clock advances only when the simulator sleeps
//! - **Network**: Datagrams are recorded, with injectable send failures
//! - **Randomness**: Jitter drawn from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 ScenarioRunner                   │
//! │  ┌────────────┐   step()   ┌──────────────────┐  │
//! │  │ SimContext │◄──────────►│HeartbeatSimulator│  │
//! │  │ (clock,rng)│            └────────┬─────────┘  │
//! │  └────────────┘                     │ send()     │
//! │                            ┌────────▼─────────┐  │
//! │                            │  RecordingSink   │  │
//! │                            └──────────────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pulse_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::StallWindow).await;
//! assert!(result.passed);
//! ```

mod context;
mod runner;
mod sink;
pub mod scenarios;

pub use context::SimContext;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner, Trace, DEFAULT_HORIZON_SECS};
pub use scenarios::ScenarioId;
pub use sink::{RecordingSink, SentDatagram};
