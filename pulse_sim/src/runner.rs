//! Scenario runner - drives the heartbeat state machine in virtual time.

use crate::context::SimContext;
use crate::scenarios::ScenarioId;
use crate::sink::{RecordingSink, SentDatagram};

use pulse_core::{
    ConfigError, HeartbeatSimulator, IniConfig, InstanceConfig, InstanceLayout, Payload, Role,
    StepEvent,
};
use pulse_env::PulseContext;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Virtual seconds a scenario may run before it is cut off.
pub const DEFAULT_HORIZON_SECS: f64 = 900.0;

/// Guard against a machine that stops advancing the clock.
const MAX_STEPS: u64 = 1_000_000;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// State machine steps executed
    pub total_steps: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Datagrams delivered to the sink
    pub heartbeats_sent: u64,

    /// Sends refused by the sink
    pub send_failures: u64,

    /// Silent stall iterations
    pub stall_iterations: u64,

    /// Times the ceiling was evaluated and the role applied
    pub ceiling_hits: u64,

    /// Virtual time of the crash transition, if any
    pub crashed_at_secs: Option<f64>,
}

/// Everything observed while driving one simulator.
#[derive(Clone)]
pub struct Trace {
    /// Step events stamped with the virtual time after the step
    pub events: Vec<(Duration, StepEvent)>,

    pub sink: RecordingSink,

    pub pid: u32,

    pub max_runtime: Duration,
}

impl Trace {
    /// Virtual time at which the crash transition happened.
    pub fn crashed_at(&self) -> Option<Duration> {
        self.events
            .iter()
            .find(|(_, e)| matches!(e, StepEvent::Crashed))
            .map(|(t, _)| *t)
    }

    /// Virtual time at which the loop clock started.
    pub fn loop_started_at(&self) -> Option<Duration> {
        self.events
            .iter()
            .find(|(_, e)| matches!(e, StepEvent::InitialDelay { .. }))
            .map(|(t, _)| *t)
    }

    pub fn count(&self, pred: impl Fn(&StepEvent) -> bool) -> u64 {
        self.events.iter().filter(|(_, e)| pred(e)).count() as u64
    }

    pub fn sent(&self) -> Vec<SentDatagram> {
        self.sink.sent()
    }

    /// Time between consecutive delivered datagrams.
    pub fn gaps(&self) -> Vec<Duration> {
        self.sent().windows(2).map(|w| w[1].at - w[0].at).collect()
    }

    pub fn metrics(&self) -> ScenarioMetrics {
        ScenarioMetrics {
            heartbeats_sent: self.sink.sent_count() as u64,
            send_failures: self.sink.failure_count(),
            stall_iterations: self.count(|e| matches!(e, StepEvent::Stalled { .. })),
            ceiling_hits: self.count(|e| matches!(e, StepEvent::CeilingReached { .. })),
            crashed_at_secs: self.crashed_at().map(|t| t.as_secs_f64()),
        }
    }
}

/// Runs scenarios against a fresh virtual environment each time.
pub struct ScenarioRunner {
    seed: u64,
    horizon: Duration,
}

impl ScenarioRunner {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            horizon: Duration::from_secs_f64(DEFAULT_HORIZON_SECS),
        }
    }

    /// Sets the virtual-time cutoff in seconds.
    pub fn with_horizon(mut self, secs: f64) -> Self {
        self.horizon = Duration::from_secs_f64(secs);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Resolves `ini` for `index` and steps a simulator until it crashes or
    /// the horizon passes.
    ///
    /// Configuration is resolved before the clock or the sink exist, so a
    /// fatal error leaves no trace of I/O behind.
    pub async fn drive(
        &self,
        ini: &str,
        index: u32,
        role: Role,
        fail_every: u64,
    ) -> Result<Trace, ConfigError> {
        let store = IniConfig::from_ini_str(ini)?;
        let resolved = InstanceConfig::resolve(&store, index, InstanceLayout::Auto)?;

        let context = SimContext::shared(self.seed);
        let sink = RecordingSink::new(context.clone(), resolved.config.udp_port)
            .with_fail_every(fail_every);
        let mut sim = HeartbeatSimulator::new(context.clone(), sink.clone(), resolved.config, role);
        let max_runtime = sim.timing().max_runtime;

        let mut events = Vec::new();
        let mut steps = 0;
        while context.now() < self.horizon && steps < MAX_STEPS {
            let event = sim.step().await;
            steps += 1;
            let crashed = matches!(event, StepEvent::Crashed);
            events.push((context.now(), event));
            if crashed {
                break;
            }
        }
        debug!("Drove {} steps to t={:.1}s", steps, context.now().as_secs_f64());

        Ok(Trace {
            events,
            sink,
            pid: context.pid(),
            max_runtime,
        })
    }

    /// Runs one scenario and checks its expectations.
    pub async fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Running {} (seed={}): {}", scenario, self.seed, scenario.description());

        let outcome = match scenario {
            ScenarioId::CrashCeiling => self.crash_ceiling().await,
            ScenarioId::SilentStall => self.silent_stall().await,
            ScenarioId::MissingPort => self.missing_port().await,
            ScenarioId::StallWindow => self.stall_window().await,
            ScenarioId::HealthyRole => self.healthy_role().await,
            ScenarioId::LossyTransport => self.lossy_transport().await,
        };

        let (trace, failure_reason) = match outcome {
            Ok(trace) => (trace, None),
            Err((trace, reason)) => (trace, Some(reason)),
        };

        let (total_steps, final_time_secs, metrics) = match &trace {
            Some(t) => (
                t.events.len() as u64,
                t.events.last().map(|(at, _)| at.as_secs_f64()).unwrap_or(0.0),
                t.metrics(),
            ),
            None => (0, 0.0, ScenarioMetrics::default()),
        };

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure_reason.is_none(),
            total_steps,
            final_time_secs,
            failure_reason,
            metrics,
        }
    }

    async fn crash_ceiling(&self) -> Outcome {
        let trace = self
            .drive(
                "[processWatchdog]\nudp_port = 12345\n1_name = worker\n\
                 1_heartbeat_delay = 2\n1_heartbeat_interval = 30\n",
                1,
                Role::Crash,
                0,
            )
            .await
            .map_err(rejected)?;

        let sent = trace.sent();
        let start = trace.loop_started_at();
        check(&trace, start == Some(Duration::from_secs(1)), || {
            format!("loop started at {:?}, expected 1s", start)
        })?;
        check(&trace, sent.first().map(|d| d.at) == start, || {
            "first heartbeat not sent right after the initial delay".to_string()
        })?;
        check(&trace, all_payloads_carry(&sent, trace.pid), || {
            "payload does not carry the sender pid".to_string()
        })?;
        check(&trace, gaps_within(&trace.gaps(), 10, 15), || {
            format!("heartbeat gaps outside 10-15s: {:?}", trace.gaps())
        })?;

        let crashed_at = trace.crashed_at();
        let earliest = Duration::from_secs(181);
        let latest = Duration::from_secs(181 + 15);
        check(
            &trace,
            crashed_at.is_some_and(|t| t >= earliest && t <= latest),
            || format!("crash at {:?}, expected within 181-196s", crashed_at),
        )?;
        Ok(Some(trace))
    }

    async fn silent_stall(&self) -> Outcome {
        let trace = self
            .drive(
                "[processWatchdog]\nudp_port = 12345\n2_name = idler\n2_heartbeat_interval = 0\n",
                2,
                Role::NoHeartbeat,
                0,
            )
            .await
            .map_err(rejected)?;

        check(&trace, trace.sink.sent_count() == 0, || {
            format!("{} datagrams sent with heartbeats disabled", trace.sink.sent_count())
        })?;
        check(&trace, trace.crashed_at().is_none(), || {
            "process exited on the noheartbeat path".to_string()
        })?;
        check(&trace, trace.metrics().stall_iterations > 0, || {
            "ceiling never triggered a stall".to_string()
        })?;
        Ok(Some(trace))
    }

    async fn missing_port(&self) -> Outcome {
        match self
            .drive("[processWatchdog]\n1_heartbeat_interval = 30\n", 1, Role::Crash, 0)
            .await
        {
            Err(e) if e.is_missing() => Ok(None),
            Err(e) => Err(rejected(e)),
            Ok(trace) => Err((Some(trace), "started without udp_port".to_string())),
        }
    }

    async fn stall_window(&self) -> Outcome {
        let trace = self
            .drive(
                "[processWatchdog]\nudp_port = 12345\n\n[app:steady]\nheartbeat_interval = 60\n",
                1,
                Role::NoHeartbeat,
                0,
            )
            .await
            .map_err(rejected)?;

        let Some(ceiling) = trace
            .events
            .iter()
            .position(|(_, e)| matches!(e, StepEvent::CeilingReached { .. }))
        else {
            return Err((Some(trace), "ceiling never reached".to_string()));
        };

        let window: Vec<&(Duration, StepEvent)> = trace.events[ceiling + 1..]
            .iter()
            .take_while(|(_, e)| !matches!(e, StepEvent::StallFinished))
            .collect();
        let stalls = window
            .iter()
            .filter(|(_, e)| matches!(e, StepEvent::Stalled { .. }))
            .count();
        check(&trace, stalls == 49, || format!("{} stall iterations, expected 49", stalls))?;

        let spaced = window
            .windows(2)
            .all(|w| ((w[1].0 - w[0].0).as_secs_f64() - 6.1).abs() < 1e-3);
        check(&trace, spaced, || "stall iterations not 6.1s apart".to_string())?;

        let stall_start = trace.events[ceiling].0;
        let stall_end = window.last().map(|(t, _)| *t).unwrap_or(stall_start);
        let leaked = trace
            .sent()
            .iter()
            // The resumed beat goes out at exactly `stall_end`
            .filter(|d| d.at > stall_start && d.at < stall_end)
            .count();
        check(&trace, leaked == 0, || format!("{} heartbeats leaked into the stall", leaked))?;

        let resumed = trace.events[ceiling + 1 + window.len()..]
            .iter()
            .skip(1)
            .find(|(_, e)| !matches!(e, StepEvent::StallFinished))
            .map(|(_, e)| matches!(e, StepEvent::HeartbeatSent { .. }));
        check(&trace, resumed == Some(true), || {
            "loop did not resume heartbeats after the stall".to_string()
        })?;
        check(&trace, trace.crashed_at().is_none(), || "process exited".to_string())?;
        Ok(Some(trace))
    }

    async fn healthy_role(&self) -> Outcome {
        let trace = self
            .drive(
                "[processWatchdog]\nudp_port = 12345\n1_heartbeat_interval = 20\n",
                1,
                Role::parse("healthy"),
                0,
            )
            .await
            .map_err(rejected)?;

        check(&trace, trace.crashed_at().is_none(), || "process exited".to_string())?;
        check(&trace, trace.metrics().ceiling_hits > 0, || {
            "ceiling never evaluated".to_string()
        })?;
        let late = trace
            .sent()
            .iter()
            .filter(|d| d.at > trace.max_runtime + Duration::from_secs(60))
            .count();
        check(&trace, late > 0, || "heartbeats stopped after the ceiling".to_string())?;
        check(&trace, gaps_within(&trace.gaps(), 6, 10), || {
            format!("heartbeat gaps outside 6-10s: {:?}", trace.gaps())
        })?;
        Ok(Some(trace))
    }

    async fn lossy_transport(&self) -> Outcome {
        let trace = self
            .drive(
                "[processWatchdog]\nudp_port = 12345\n1_heartbeat_interval = 10\n",
                1,
                Role::Crash,
                3,
            )
            .await
            .map_err(rejected)?;

        let failures = trace.count(|e| matches!(e, StepEvent::SendFailed { .. }));
        check(&trace, failures > 0 && failures == trace.sink.failure_count(), || {
            format!("{} failures observed", failures)
        })?;
        let delivered = trace.count(|e| matches!(e, StepEvent::HeartbeatSent { .. }));
        // Every third attempt fails, so two deliveries per failure (+ a partial round)
        check(&trace, (2 * failures..=2 * failures + 2).contains(&delivered), || {
            format!("{} delivered vs {} failed", delivered, failures)
        })?;
        check(&trace, trace.crashed_at().is_some(), || {
            "crash never fired under transport failures".to_string()
        })?;
        Ok(Some(trace))
    }
}

/// A failed expectation, with whatever trace was gathered.
type Failure = (Option<Trace>, String);

type Outcome = Result<Option<Trace>, Failure>;

fn check(trace: &Trace, ok: bool, reason: impl FnOnce() -> String) -> Result<(), Failure> {
    if ok {
        Ok(())
    } else {
        Err((Some(trace.clone()), reason()))
    }
}

fn rejected(e: ConfigError) -> Failure {
    (None, format!("config rejected: {}", e))
}

fn all_payloads_carry(sent: &[SentDatagram], pid: u32) -> bool {
    sent.iter().all(|d| Payload::parse(&d.bytes) == Some(pid))
}

fn gaps_within(gaps: &[Duration], low: u64, high: u64) -> bool {
    gaps.iter()
        .all(|g| *g >= Duration::from_secs(low) && *g <= Duration::from_secs(high))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drive_stops_at_horizon() {
        let runner = ScenarioRunner::new(7).with_horizon(60.0);
        let trace = runner
            .drive(
                "[processWatchdog]\nudp_port = 9\n1_heartbeat_interval = 30\n",
                1,
                Role::Crash,
                0,
            )
            .await
            .unwrap();

        let (last, _) = trace.events.last().unwrap();
        assert!(*last >= Duration::from_secs(60));
        assert!(*last < Duration::from_secs(60 + 16));
        assert!(trace.crashed_at().is_none());
    }

    #[tokio::test]
    async fn test_same_seed_same_trace() {
        let ini = "[processWatchdog]\nudp_port = 9\n1_heartbeat_interval = 30\n";
        let a = ScenarioRunner::new(3).drive(ini, 1, Role::Crash, 0).await.unwrap();
        let b = ScenarioRunner::new(3).drive(ini, 1, Role::Crash, 0).await.unwrap();
        assert_eq!(a.sent(), b.sent());
        assert_eq!(a.crashed_at(), b.crashed_at());
    }

    #[tokio::test]
    async fn test_stall_window_passes_across_seeds() {
        for seed in [1, 2, 7, 42, 1337] {
            let result = ScenarioRunner::new(seed).run(ScenarioId::StallWindow).await;
            assert!(result.passed, "seed={} failed: {:?}", seed, result.failure_reason);
            assert!(result.metrics.stall_iterations >= 49);
            assert!(result.metrics.heartbeats_sent > 0);
        }
    }

    #[tokio::test]
    async fn test_missing_port_result_has_no_metrics() {
        let result = ScenarioRunner::new(1).run(ScenarioId::MissingPort).await;
        assert!(result.passed);
        assert_eq!(result.total_steps, 0);
        assert_eq!(result.metrics.heartbeats_sent, 0);
    }
}
