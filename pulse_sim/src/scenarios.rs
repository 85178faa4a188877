//! Supervisor-facing scenarios for DST.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// HB-001: crash role terminates cleanly at the ceiling
    CrashCeiling,

    /// HB-002: disabled heartbeats, never a datagram, never an exit
    SilentStall,

    /// HB-003: missing udp_port aborts before any I/O
    MissingPort,

    /// HB-004: bounded "no more heartbeats" window, then resume
    StallWindow,

    /// HB-005: unrecognized role keeps beating past the ceiling
    HealthyRole,

    /// HB-006: transport failures never stop the loop
    LossyTransport,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::CrashCeiling,
            ScenarioId::SilentStall,
            ScenarioId::MissingPort,
            ScenarioId::StallWindow,
            ScenarioId::HealthyRole,
            ScenarioId::LossyTransport,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::CrashCeiling => "crash_ceiling",
            ScenarioId::SilentStall => "silent_stall",
            ScenarioId::MissingPort => "missing_port",
            ScenarioId::StallWindow => "stall_window",
            ScenarioId::HealthyRole => "healthy_role",
            ScenarioId::LossyTransport => "lossy_transport",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::CrashCeiling => "delay=2 interval=30 role=crash: 10-15s beats, exit 0 after 180s",
            ScenarioId::SilentStall => "interval=0 role=noheartbeat: no datagrams, process stays up",
            ScenarioId::MissingPort => "no udp_port key: ConfigError before socket or timer",
            ScenarioId::StallWindow => "interval=60 role=noheartbeat: 49 silent 6.1s ticks, then resume",
            ScenarioId::HealthyRole => "unrecognized role: heartbeats continue past the ceiling",
            ScenarioId::LossyTransport => "every 3rd send fails: loop continues, crash still fires",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crash_ceiling" | "crash" | "hb-001" => Ok(ScenarioId::CrashCeiling),
            "silent_stall" | "silent" | "hb-002" => Ok(ScenarioId::SilentStall),
            "missing_port" | "hb-003" => Ok(ScenarioId::MissingPort),
            "stall_window" | "stall" | "hb-004" => Ok(ScenarioId::StallWindow),
            "healthy_role" | "healthy" | "hb-005" => Ok(ScenarioId::HealthyRole),
            "lossy_transport" | "lossy" | "hb-006" => Ok(ScenarioId::LossyTransport),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>().unwrap(), id);
            assert!(!id.description().is_empty());
        }
        assert_eq!("HB-004".parse::<ScenarioId>().unwrap(), ScenarioId::StallWindow);
        assert!("meltdown".parse::<ScenarioId>().is_err());
    }
}
