//! Per-instance parameter resolution.
//!
//! Two configuration shapes are understood:
//!
//! ```text
//! Flat                              AppSections
//! ----                              -----------
//! [processWatchdog]                 [processWatchdog]
//! udp_port = 12345                  udp_port = 12345
//! 1_name = worker                   [app:worker]          <- index 1
//! 1_heartbeat_delay = 10            heartbeat_delay = 10
//! 1_heartbeat_interval = 20         heartbeat_interval = 20
//! ```

use crate::config::ConfigAccessor;
use crate::error::{ConfigError, ConfigWarning};
use std::str::FromStr;

/// Section holding the supervisor-wide keys.
pub const WATCHDOG_SECTION: &str = "processWatchdog";

/// Prefix of the per-application sections.
pub const APP_SECTION_PREFIX: &str = "app:";

/// Parameters for one simulated instance. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    /// 1-based instance index
    pub index: u32,

    /// Display name
    pub name: String,

    /// Seconds before the first heartbeat
    pub heartbeat_delay: i64,

    /// Nominal heartbeat period in seconds (`<= 0` disables heartbeats)
    pub heartbeat_interval: i64,

    /// Supervisor port on localhost
    pub udp_port: u16,
}

/// Which configuration shape to read instance parameters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceLayout {
    /// `AppSections` if any `app:` section is declared, otherwise `Flat`
    #[default]
    Auto,

    /// `{index}_name`, `{index}_heartbeat_*` keys in `[processWatchdog]`
    Flat,

    /// The index-th declared `[app:<name>]` section
    AppSections,
}

impl InstanceLayout {
    pub fn name(&self) -> &'static str {
        match self {
            InstanceLayout::Auto => "auto",
            InstanceLayout::Flat => "flat",
            InstanceLayout::AppSections => "sections",
        }
    }

    /// Resolves `Auto` against the sections actually declared.
    pub fn effective(self, accessor: &impl ConfigAccessor) -> InstanceLayout {
        match self {
            InstanceLayout::Auto if app_sections(accessor).is_empty() => InstanceLayout::Flat,
            InstanceLayout::Auto => InstanceLayout::AppSections,
            other => other,
        }
    }
}

impl std::fmt::Display for InstanceLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for InstanceLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(InstanceLayout::Auto),
            "flat" | "keys" => Ok(InstanceLayout::Flat),
            "sections" | "app" | "app_sections" => Ok(InstanceLayout::AppSections),
            _ => Err(format!("Unknown layout: {}", s)),
        }
    }
}

/// A resolved instance plus the warnings produced on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub config: InstanceConfig,
    pub layout: InstanceLayout,
    pub warnings: Vec<ConfigWarning>,
}

impl InstanceConfig {
    /// Reads the parameters of instance `index` from `accessor`.
    ///
    /// Pure read: resolving twice from the same store yields the same result.
    ///
    /// # Errors
    /// `udp_port` is the only required key. It must be present and lie in
    /// `1..=65535`. Everything else falls back to a default with a warning.
    pub fn resolve(
        accessor: &impl ConfigAccessor,
        index: u32,
        layout: InstanceLayout,
    ) -> Result<Resolved, ConfigError> {
        let port = accessor.get_int(WATCHDOG_SECTION, "udp_port")?;
        let udp_port = u16::try_from(port)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| ConfigError::invalid(WATCHDOG_SECTION, "udp_port", port.to_string()))?;

        let layout = layout.effective(accessor);
        let mut warnings = Vec::new();

        let (name, heartbeat_delay, heartbeat_interval) = match layout {
            InstanceLayout::AppSections => {
                let sections = app_sections(accessor);
                let section = index.checked_sub(1).and_then(|i| sections.get(i as usize));
                match section {
                    Some(section) => (
                        Some(section[APP_SECTION_PREFIX.len()..].to_string()),
                        optional_int(accessor, section, "heartbeat_delay", &mut warnings),
                        optional_int(accessor, section, "heartbeat_interval", &mut warnings),
                    ),
                    None => {
                        warnings.push(ConfigWarning::NoAppSection {
                            index,
                            declared: sections.len(),
                        });
                        (None, 0, 0)
                    }
                }
            }
            _ => (
                accessor.get_string(WATCHDOG_SECTION, &format!("{}_name", index)).ok(),
                optional_int(
                    accessor,
                    WATCHDOG_SECTION,
                    &format!("{}_heartbeat_delay", index),
                    &mut warnings,
                ),
                optional_int(
                    accessor,
                    WATCHDOG_SECTION,
                    &format!("{}_heartbeat_interval", index),
                    &mut warnings,
                ),
            ),
        };

        let name = match name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => {
                let fallback = format!("Process{}", index);
                warnings.push(ConfigWarning::SynthesizedName {
                    index,
                    fallback: fallback.clone(),
                });
                fallback
            }
        };

        Ok(Resolved {
            config: InstanceConfig {
                index,
                name,
                heartbeat_delay,
                heartbeat_interval,
                udp_port,
            },
            layout,
            warnings,
        })
    }
}

/// Declared `app:` sections in declaration order.
fn app_sections(accessor: &impl ConfigAccessor) -> Vec<String> {
    accessor
        .sections()
        .into_iter()
        .filter(|s| {
            s.get(..APP_SECTION_PREFIX.len())
                .is_some_and(|p| p.eq_ignore_ascii_case(APP_SECTION_PREFIX))
        })
        .collect()
}

fn optional_int(
    accessor: &impl ConfigAccessor,
    section: &str,
    key: &str,
    warnings: &mut Vec<ConfigWarning>,
) -> i64 {
    match accessor.get_int(section, key) {
        Ok(value) => value,
        Err(ConfigError::InvalidValue { value, .. }) => {
            warnings.push(ConfigWarning::Unparsable {
                section: section.to_string(),
                key: key.to_string(),
                value,
                default: 0,
            });
            0
        }
        Err(_) => {
            warnings.push(ConfigWarning::Defaulted {
                section: section.to_string(),
                key: key.to_string(),
                default: 0,
            });
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IniConfig;

    const FLAT: &str = "\
[processWatchdog]
udp_port = 12345
1_name = alpha
1_heartbeat_delay = 2
1_heartbeat_interval = 30
2_name =
2_heartbeat_interval = 0
";

    const SECTIONS: &str = "\
[processWatchdog]
udp_port = 23456

[app:alpha]
heartbeat_delay = 10
heartbeat_interval = 20

[app:beta]
heartbeat_interval = 60
";

    #[test]
    fn test_resolve_flat_keys() {
        let cfg = IniConfig::from_ini_str(FLAT).unwrap();
        let resolved = InstanceConfig::resolve(&cfg, 1, InstanceLayout::Auto).unwrap();

        assert_eq!(resolved.layout, InstanceLayout::Flat);
        assert!(resolved.warnings.is_empty());
        assert_eq!(
            resolved.config,
            InstanceConfig {
                index: 1,
                name: "alpha".into(),
                heartbeat_delay: 2,
                heartbeat_interval: 30,
                udp_port: 12345,
            }
        );
    }

    #[test]
    fn test_blank_name_and_missing_delay_fall_back() {
        let cfg = IniConfig::from_ini_str(FLAT).unwrap();
        let resolved = InstanceConfig::resolve(&cfg, 2, InstanceLayout::Flat).unwrap();

        assert_eq!(resolved.config.name, "Process2");
        assert_eq!(resolved.config.heartbeat_delay, 0);
        assert_eq!(resolved.config.heartbeat_interval, 0);
        assert!(resolved.warnings.contains(&ConfigWarning::Defaulted {
            section: WATCHDOG_SECTION.into(),
            key: "2_heartbeat_delay".into(),
            default: 0,
        }));
        assert!(resolved.warnings.contains(&ConfigWarning::SynthesizedName {
            index: 2,
            fallback: "Process2".into(),
        }));
    }

    #[test]
    fn test_resolve_app_sections_positionally() {
        let cfg = IniConfig::from_ini_str(SECTIONS).unwrap();

        let first = InstanceConfig::resolve(&cfg, 1, InstanceLayout::Auto).unwrap();
        assert_eq!(first.layout, InstanceLayout::AppSections);
        assert_eq!(first.config.name, "alpha");
        assert_eq!(first.config.heartbeat_delay, 10);
        assert_eq!(first.config.heartbeat_interval, 20);
        assert_eq!(first.config.udp_port, 23456);

        let second = InstanceConfig::resolve(&cfg, 2, InstanceLayout::AppSections).unwrap();
        assert_eq!(second.config.name, "beta");
        assert_eq!(second.config.heartbeat_delay, 0);
        assert_eq!(second.config.heartbeat_interval, 60);
        assert_eq!(second.warnings.len(), 1);
    }

    #[test]
    fn test_index_beyond_declared_sections() {
        let cfg = IniConfig::from_ini_str(SECTIONS).unwrap();
        let resolved = InstanceConfig::resolve(&cfg, 5, InstanceLayout::AppSections).unwrap();

        assert_eq!(resolved.config.name, "Process5");
        assert_eq!(resolved.config.heartbeat_interval, 0);
        assert_eq!(
            resolved.warnings[0],
            ConfigWarning::NoAppSection { index: 5, declared: 2 }
        );
    }

    #[test]
    fn test_forced_flat_layout_ignores_sections() {
        let cfg = IniConfig::from_ini_str(SECTIONS).unwrap();
        let resolved = InstanceConfig::resolve(&cfg, 1, InstanceLayout::Flat).unwrap();
        assert_eq!(resolved.config.name, "Process1");
        assert_eq!(resolved.config.heartbeat_interval, 0);
    }

    #[test]
    fn test_missing_udp_port_is_fatal() {
        let cfg = IniConfig::from_ini_str("[processWatchdog]\n1_name = alpha\n").unwrap();
        let err = InstanceConfig::resolve(&cfg, 1, InstanceLayout::Auto).unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn test_out_of_range_udp_port_is_fatal() {
        for port in ["0", "70000", "-5", "http"] {
            let text = format!("[processWatchdog]\nudp_port = {}\n", port);
            let cfg = IniConfig::from_ini_str(&text).unwrap();
            let err = InstanceConfig::resolve(&cfg, 1, InstanceLayout::Auto).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }), "port {}", port);
        }
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let cfg = IniConfig::from_ini_str(FLAT).unwrap();
        let a = InstanceConfig::resolve(&cfg, 1, InstanceLayout::Auto).unwrap();
        let b = InstanceConfig::resolve(&cfg, 1, InstanceLayout::Auto).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("flat".parse::<InstanceLayout>().unwrap(), InstanceLayout::Flat);
        assert_eq!("Sections".parse::<InstanceLayout>().unwrap(), InstanceLayout::AppSections);
        assert!("tree".parse::<InstanceLayout>().is_err());
    }
}
