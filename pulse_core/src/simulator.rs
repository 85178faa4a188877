//! HeartbeatSimulator - the send loop and failure-injection state machine.
//!
//! # State Machine
//!
//! ```text
//!  InitialDelay ──► Looping ──(elapsed >= max_runtime)──► Ceiling
//!                     ▲                                      │
//!                     │            ┌─────────────────────────┼──────────────┐
//!                     │            ▼ NoHeartbeat             ▼ Crash        ▼ other
//!                     └──────── Stalling{remaining}       Crashed       (back to Looping)
//! ```
//!
//! Each call to [`HeartbeatSimulator::step`] performs exactly one transition
//! and reports what happened as a [`StepEvent`], which keeps the machine
//! drivable from a virtual clock.
//!
//! # Usage
//!
//! ```ignore
//! use pulse_core::{HeartbeatSimulator, Role};
//! use pulse_env::{TokioContext, UdpSink};
//!
//! let sink = UdpSink::connect_localhost(config.udp_port).await?;
//! let mut sim = HeartbeatSimulator::new(TokioContext::shared(), sink, config, Role::Crash);
//! let exit = sim.run().await;
//! std::process::exit(exit.code());
//! ```

use crate::instance::InstanceConfig;
use crate::palette::Palette;
use crate::payload::Payload;
use crate::role::Role;
use crate::timing::Timing;

use pulse_env::{DatagramSink, PulseContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Idle period of one loop iteration while heartbeats are disabled.
pub const DISABLED_IDLE: Duration = Duration::from_secs(1);

/// Yield used instead of a zero-length jitter wait.
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// Mutable scheduling state of the send loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    /// Own process id, as sent in the payload
    pub pid: String,

    /// Seconds waited before the next heartbeat
    pub wait_time: u64,

    /// Context time at which the loop started
    pub start_time: Duration,

    /// Run time measured at the last ceiling check
    pub elapsed: Duration,

    pub heartbeat_enabled: bool,
}

/// Where the state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    InitialDelay,
    Looping,
    /// Ceiling reached, role action pending
    Ceiling,
    Stalling { remaining: u64 },
    Crashed,
}

/// What a single [`HeartbeatSimulator::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent {
    /// The one-off initial delay elapsed and the loop clock started
    InitialDelay { slept: Duration },

    /// A heartbeat went out; `wait_time` preceded it, `next_wait` follows it
    HeartbeatSent {
        payload: Payload,
        wait_time: u64,
        next_wait: u64,
    },

    /// The transport refused the datagram; the loop carries on
    SendFailed { error: String, next_wait: u64 },

    /// Heartbeats disabled; one idle tick
    Idle,

    /// The ceiling was evaluated and the role applied
    CeilingReached { elapsed: Duration, role: Role },

    /// One silent stall iteration
    Stalled { remaining: u64 },

    /// The bounded stall is over; back to the loop
    StallFinished,

    /// Terminal: the process should now exit
    Crashed,
}

/// How a finished run ends the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Crashed,
}

impl Exit {
    /// Process exit status.
    pub fn code(&self) -> i32 {
        match self {
            Exit::Crashed => 0,
        }
    }
}

/// A simulated monitored worker.
///
/// Generic over the context and sink so the same machine runs against
/// wall-clock time and a real socket, or a virtual clock and a recorder.
/// The sink is owned and released whenever the simulator is dropped.
pub struct HeartbeatSimulator<Ctx, Sink>
where
    Ctx: PulseContext,
    Sink: DatagramSink,
{
    context: Arc<Ctx>,
    sink: Sink,
    config: InstanceConfig,
    role: Role,
    timing: Timing,
    state: RunState,
    phase: Phase,
    label: String,
    ceiling_noted: bool,
}

impl<Ctx, Sink> HeartbeatSimulator<Ctx, Sink>
where
    Ctx: PulseContext,
    Sink: DatagramSink,
{
    pub fn new(context: Arc<Ctx>, sink: Sink, config: InstanceConfig, role: Role) -> Self {
        let timing = Timing::derive(&config);
        let state = RunState {
            pid: context.pid().to_string(),
            wait_time: timing.initial_wait_time,
            start_time: context.now(),
            elapsed: Duration::ZERO,
            heartbeat_enabled: timing.heartbeat_enabled,
        };

        info!(
            "{}: max runtime {}s, heartbeats {}, role {}",
            config.name,
            timing.max_runtime.as_secs(),
            if timing.heartbeat_enabled { "enabled" } else { "disabled" },
            role
        );

        Self {
            label: config.name.clone(),
            context,
            sink,
            config,
            role,
            timing,
            state,
            phase: Phase::InitialDelay,
            ceiling_noted: false,
        }
    }

    /// Renders the instance name with the given palette in log lines.
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.label = palette.paint(&self.config.name);
        self
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    /// Runs until the crash transition; never returns for other roles.
    pub async fn run(&mut self) -> Exit {
        loop {
            if let StepEvent::Crashed = self.step().await {
                return Exit::Crashed;
            }
        }
    }

    /// Performs one state transition.
    pub async fn step(&mut self) -> StepEvent {
        match self.phase {
            Phase::InitialDelay => self.initial_delay().await,
            Phase::Looping => {
                let event = self.iterate().await;
                self.check_ceiling();
                event
            }
            Phase::Ceiling => self.apply_role(),
            Phase::Stalling { remaining } => self.stall(remaining).await,
            Phase::Crashed => StepEvent::Crashed,
        }
    }

    async fn initial_delay(&mut self) -> StepEvent {
        let slept = self.timing.initial_sleep.unwrap_or(Duration::ZERO);
        if self.timing.initial_sleep.is_some() {
            info!("{} Waiting {} seconds heartbeat_delay...", self.label, slept.as_secs());
            self.context.sleep(slept).await;
        }

        self.state.start_time = self.context.now();
        self.phase = Phase::Looping;
        StepEvent::InitialDelay { slept }
    }

    async fn iterate(&mut self) -> StepEvent {
        let Some((low, high)) = self.timing.jitter.filter(|_| self.state.heartbeat_enabled) else {
            self.context.sleep(DISABLED_IDLE).await;
            return StepEvent::Idle;
        };

        let payload = Payload::heartbeat(self.context.pid());
        let sent = self.sink.send(payload.as_bytes()).await;
        let wait_time = self.state.wait_time;
        let next_wait = self.context.random_in(low, high);

        let event = match sent {
            Ok(_) => {
                info!(
                    "{} Heartbeat sent to {}: {} after {} seconds",
                    self.label,
                    self.sink.destination(),
                    payload,
                    wait_time
                );
                StepEvent::HeartbeatSent {
                    payload,
                    wait_time,
                    next_wait,
                }
            }
            Err(e) => {
                warn!("{} Heartbeat to {} failed: {}", self.label, self.sink.destination(), e);
                StepEvent::SendFailed {
                    error: e.to_string(),
                    next_wait,
                }
            }
        };

        self.state.wait_time = next_wait;
        if next_wait > 0 {
            self.context.sleep(Duration::from_secs(next_wait)).await;
        } else {
            self.context.sleep(MIN_TICK).await;
        }

        event
    }

    fn check_ceiling(&mut self) {
        self.state.elapsed = self.context.now().saturating_sub(self.state.start_time);
        if self.state.elapsed >= self.timing.max_runtime {
            self.phase = Phase::Ceiling;
        }
    }

    fn apply_role(&mut self) -> StepEvent {
        let elapsed = self.state.elapsed;

        match &self.role {
            Role::Crash => {
                info!("{} Program stopped after {}s", self.label, elapsed.as_secs());
                self.phase = Phase::Crashed;
                return StepEvent::Crashed;
            }
            Role::NoHeartbeat => {
                let plan = self.timing.stall;
                info!(
                    "{} Stalling: {} x {:.1}s without heartbeats",
                    self.label, plan.repeats, plan.interval
                );
                self.phase = Phase::Stalling {
                    remaining: plan.repeats,
                };
            }
            Role::Unrecognized(raw) => {
                if !self.ceiling_noted {
                    warn!("{} Role {:?} has no ceiling action, continuing", self.label, raw);
                }
                self.phase = Phase::Looping;
            }
        }

        self.ceiling_noted = true;
        StepEvent::CeilingReached {
            elapsed,
            role: self.role.clone(),
        }
    }

    async fn stall(&mut self, remaining: u64) -> StepEvent {
        if remaining == 0 {
            debug!("{} Stall window over, resuming", self.label);
            // The next send follows the last jitter wait plus the whole stall
            let silence = self.timing.stall.window().as_secs_f64().round() as u64;
            self.state.wait_time = self.state.wait_time.saturating_add(silence);
            self.phase = Phase::Looping;
            return StepEvent::StallFinished;
        }

        // Log, then sleep: the line marks the start of each silent iteration
        info!("{} No more heartbeats", self.label);
        self.context.sleep(self.timing.stall.step()).await;

        let remaining = remaining - 1;
        self.phase = Phase::Stalling { remaining };
        StepEvent::Stalled { remaining }
    }
}
