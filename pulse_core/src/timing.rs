//! Derived timing: observation ceiling, jitter window, stall plan.
//!
//! All values are computed once from an [`InstanceConfig`] and never change
//! for the rest of the run.

use crate::instance::InstanceConfig;
use std::time::Duration;

/// Floor of the observation window in seconds.
pub const MIN_OBSERVATION_SECS: u64 = 180;

/// Heartbeat cycles observed before the ceiling fires.
pub const CEILING_MULTIPLIER: u64 = 5;

/// Floor of the total stall window in seconds.
pub const MIN_STALL_SECS: f64 = 100.0;

/// Floor of one stall iteration in seconds.
pub const MIN_STALL_INTERVAL_SECS: f64 = 2.0;

/// `max(|interval| * 5, 180)` seconds.
pub fn max_runtime_secs(heartbeat_interval: i64) -> u64 {
    heartbeat_interval
        .unsigned_abs()
        .saturating_mul(CEILING_MULTIPLIER)
        .max(MIN_OBSERVATION_SECS)
}

/// Inclusive jitter window `[interval / 3, interval / 2]` in whole seconds.
///
/// `None` when heartbeats are disabled (`interval <= 0`).
pub fn jitter_bounds(heartbeat_interval: i64) -> Option<(u64, u64)> {
    if heartbeat_interval <= 0 {
        return None;
    }
    let interval = heartbeat_interval as u64;
    Some((interval / 3, interval / 2))
}

/// The bounded silence injected by the `NoHeartbeat` role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StallPlan {
    /// Total stall window, `max(|interval| * 5, 100)` seconds
    pub sleep_time: f64,

    /// One stall iteration, `max(|interval + 1| / 10, 2)` seconds
    pub interval: f64,

    /// `floor(sleep_time / interval)`
    pub repeats: u64,
}

impl StallPlan {
    pub fn for_interval(heartbeat_interval: i64) -> Self {
        let sleep_time = (heartbeat_interval
            .unsigned_abs()
            .saturating_mul(CEILING_MULTIPLIER) as f64)
            .max(MIN_STALL_SECS);
        let interval =
            (heartbeat_interval.saturating_add(1).unsigned_abs() as f64 / 10.0).max(MIN_STALL_INTERVAL_SECS);

        Self {
            sleep_time,
            interval,
            repeats: (sleep_time / interval).floor() as u64,
        }
    }

    /// Length of one stall iteration.
    pub fn step(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }

    /// Silence spent across all `repeats` iterations.
    pub fn window(&self) -> Duration {
        self.step().mul_f64(self.repeats as f64)
    }
}

/// Timing derived from one instance's configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Timing {
    /// Elapsed run time after which the role's failure mode fires
    pub max_runtime: Duration,

    /// False for the whole run when `heartbeat_interval <= 0`
    pub heartbeat_enabled: bool,

    /// One-off sleep before the loop, `heartbeat_delay - 1` seconds
    pub initial_sleep: Option<Duration>,

    /// `wait_time` reported with the first heartbeat
    pub initial_wait_time: u64,

    pub jitter: Option<(u64, u64)>,

    pub stall: StallPlan,
}

impl Timing {
    pub fn derive(config: &InstanceConfig) -> Self {
        let delay = config.heartbeat_delay;
        let initial_sleep = (delay > 0).then(|| Duration::from_secs((delay - 1) as u64));

        Self {
            max_runtime: Duration::from_secs(max_runtime_secs(config.heartbeat_interval)),
            heartbeat_enabled: config.heartbeat_interval > 0,
            initial_sleep,
            initial_wait_time: delay.max(0) as u64,
            jitter: jitter_bounds(config.heartbeat_interval),
            stall: StallPlan::for_interval(config.heartbeat_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn instance(delay: i64, interval: i64) -> InstanceConfig {
        InstanceConfig {
            index: 1,
            name: "alpha".into(),
            heartbeat_delay: delay,
            heartbeat_interval: interval,
            udp_port: 12345,
        }
    }

    #[test]
    fn test_max_runtime_floor_and_scaling() {
        assert_eq!(max_runtime_secs(30), 180);
        assert_eq!(max_runtime_secs(0), 180);
        assert_eq!(max_runtime_secs(36), 180);
        assert_eq!(max_runtime_secs(37), 185);
        assert_eq!(max_runtime_secs(-100), 500);
        assert_eq!(max_runtime_secs(i64::MIN), u64::MAX);
    }

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(jitter_bounds(30), Some((10, 15)));
        assert_eq!(jitter_bounds(1), Some((0, 0)));
        assert_eq!(jitter_bounds(7), Some((2, 3)));
        assert_eq!(jitter_bounds(0), None);
        assert_eq!(jitter_bounds(-30), None);
    }

    #[test]
    fn test_stall_plan_for_sixty_second_interval() {
        let plan = StallPlan::for_interval(60);
        assert_relative_eq!(plan.sleep_time, 300.0);
        assert_relative_eq!(plan.interval, 6.1);
        assert_eq!(plan.repeats, 49);
        assert_relative_eq!(plan.window().as_secs_f64(), 298.9, epsilon = 1e-6);
    }

    #[test]
    fn test_stall_plan_floors() {
        let plan = StallPlan::for_interval(0);
        assert_relative_eq!(plan.sleep_time, 100.0);
        assert_relative_eq!(plan.interval, 2.0);
        assert_eq!(plan.repeats, 50);
        assert_eq!(plan.step(), Duration::from_secs(2));
    }

    #[test]
    fn test_initial_delay_subtracts_one_second() {
        let timing = Timing::derive(&instance(2, 30));
        assert_eq!(timing.initial_sleep, Some(Duration::from_secs(1)));
        assert_eq!(timing.initial_wait_time, 2);
        assert!(timing.heartbeat_enabled);
    }

    #[test]
    fn test_zero_and_negative_delay_do_not_sleep() {
        let zero = Timing::derive(&instance(0, 30));
        assert_eq!(zero.initial_sleep, None);
        assert_eq!(zero.initial_wait_time, 0);

        let negative = Timing::derive(&instance(-4, 30));
        assert_eq!(negative.initial_sleep, None);
        assert_eq!(negative.initial_wait_time, 0);
    }

    #[test]
    fn test_non_positive_interval_disables_heartbeats() {
        for interval in [0, -1, -60] {
            let timing = Timing::derive(&instance(0, interval));
            assert!(!timing.heartbeat_enabled);
            assert_eq!(timing.jitter, None);
        }
    }

    proptest! {
        #[test]
        fn prop_max_runtime_formula(interval in -100_000i64..100_000) {
            let expected = (interval.abs() * 5).max(180) as u64;
            prop_assert_eq!(max_runtime_secs(interval), expected);
        }

        #[test]
        fn prop_jitter_window_is_ordered_and_non_negative(interval in 1i64..1_000_000) {
            let (low, high) = jitter_bounds(interval).unwrap();
            prop_assert!(low <= high);
            prop_assert_eq!(low, (interval / 3) as u64);
            prop_assert_eq!(high, (interval / 2) as u64);
        }

        #[test]
        fn prop_stall_plan_never_empty(interval in -100_000i64..100_000) {
            let plan = StallPlan::for_interval(interval);
            prop_assert!(plan.interval >= MIN_STALL_INTERVAL_SECS);
            prop_assert!(plan.sleep_time >= MIN_STALL_SECS);
            prop_assert!(plan.repeats >= 1);
        }
    }
}
