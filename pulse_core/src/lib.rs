//! Pulse Core - a configurable liveness-signal emitter
//!
//! Simulates a worker process under watchdog supervision:
//! 1. **Config**: per-instance timing read through a section/key accessor
//! 2. **Loop**: jittered `p<pid>` UDP heartbeats to the supervisor
//! 3. **Failure injection**: at a computed ceiling, crash or fall silent

pub mod config;
pub mod error;
pub mod instance;
pub mod palette;
pub mod payload;
pub mod role;
pub mod simulator;
pub mod timing;

// Re-export key types for convenience
pub use config::{ConfigAccessor, IniConfig};
pub use error::{ArgumentError, ConfigError, ConfigWarning};
pub use instance::{InstanceConfig, InstanceLayout, Resolved};
pub use palette::Palette;
pub use payload::Payload;
pub use role::{parse_index, parse_role, Role};
pub use simulator::{Exit, HeartbeatSimulator, Phase, RunState, StepEvent};
pub use timing::{StallPlan, Timing};
