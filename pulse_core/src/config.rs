//! Configuration accessor: section/key lookups over an INI document.
//!
//! The simulator never touches the file format directly. It asks a
//! [`ConfigAccessor`] for typed values, so any key-value store that can
//! answer `get_int` / `get_string` / `sections` will do.

use crate::error::ConfigError;
use config::{Config, File, FileFormat, Source};
use std::path::Path;
use tracing::debug;

/// Typed, read-only section/key lookups.
///
/// Section and key names match ASCII case-insensitively.
pub trait ConfigAccessor {
    /// Returns the integer stored under `[section] key`.
    ///
    /// # Errors
    /// * `ConfigError::MissingKey` - the section or key is absent
    /// * `ConfigError::InvalidValue` - the value is not an integer
    fn get_int(&self, section: &str, key: &str) -> Result<i64, ConfigError>;

    /// Returns the string stored under `[section] key`.
    fn get_string(&self, section: &str, key: &str) -> Result<String, ConfigError>;

    /// Returns every declared section name, in declaration order.
    fn sections(&self) -> Vec<String>;

    /// Like `get_int`, but a missing key yields `default`.
    fn get_int_or(&self, section: &str, key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.get_int(section, key) {
            Err(e) if e.is_missing() => Ok(default),
            other => other,
        }
    }

    /// Like `get_string`, but a missing key yields `default`.
    fn get_string_or(&self, section: &str, key: &str, default: &str) -> Result<String, ConfigError> {
        match self.get_string(section, key) {
            Err(e) if e.is_missing() => Ok(default.to_string()),
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IniSection {
    name: String,
    entries: Vec<(String, String)>,
}

/// INI-backed configuration loaded through the `config` crate.
///
/// The document is read once; lookups never touch the file again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniConfig {
    sections: Vec<IniSection>,
}

impl IniConfig {
    /// Loads an INI file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Reading ini file {}", path.display());

        let cfg = Config::builder()
            .add_source(File::from(path).format(FileFormat::Ini).required(true))
            .build()?;
        Self::from_config(&cfg)
    }

    /// Parses an INI document held in memory.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::from_str(text, FileFormat::Ini))
            .build()?;
        Self::from_config(&cfg)
    }

    fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let mut sections = Vec::new();

        for (name, value) in cfg.collect()? {
            let table = match value.into_table() {
                Ok(table) => table,
                Err(_) => {
                    debug!("Ignoring key {} outside any section", name);
                    continue;
                }
            };

            let mut entries = Vec::with_capacity(table.len());
            for (key, value) in table {
                entries.push((key, value.into_string()?));
            }
            sections.push(IniSection { name, entries });
        }

        debug!("{} sections found", sections.len());
        Ok(Self { sections })
    }

    fn raw(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(section))?
            .entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

impl ConfigAccessor for IniConfig {
    fn get_int(&self, section: &str, key: &str) -> Result<i64, ConfigError> {
        let raw = self
            .raw(section, key)
            .ok_or_else(|| ConfigError::missing(section, key))?;
        raw.trim()
            .parse()
            .map_err(|_| ConfigError::invalid(section, key, raw))
    }

    fn get_string(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        self.raw(section, key)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::missing(section, key))
    }

    fn sections(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[processWatchdog]
udp_port = 12345
1_name = alpha
1_heartbeat_interval = 30

[app:first]
heartbeat_delay = 10

[app:second]
heartbeat_interval = oops
";

    #[test]
    fn test_get_int_and_string() {
        let cfg = IniConfig::from_ini_str(SAMPLE).unwrap();
        assert_eq!(cfg.get_int("processWatchdog", "udp_port").unwrap(), 12345);
        assert_eq!(cfg.get_int("processWatchdog", "1_heartbeat_interval").unwrap(), 30);
        assert_eq!(cfg.get_string("processWatchdog", "1_name").unwrap(), "alpha");
    }

    #[test]
    fn test_lookup_ignores_case() {
        let cfg = IniConfig::from_ini_str(SAMPLE).unwrap();
        assert_eq!(cfg.get_int("PROCESSWATCHDOG", "UDP_PORT").unwrap(), 12345);
    }

    #[test]
    fn test_missing_and_invalid() {
        let cfg = IniConfig::from_ini_str(SAMPLE).unwrap();

        let err = cfg.get_int("processWatchdog", "2_heartbeat_delay").unwrap_err();
        assert!(err.is_missing());

        let err = cfg.get_int("nowhere", "udp_port").unwrap_err();
        assert!(err.is_missing());

        let err = cfg.get_int("app:second", "heartbeat_interval").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref value, .. } if value == "oops"));
    }

    #[test]
    fn test_defaults_only_cover_missing_keys() {
        let cfg = IniConfig::from_ini_str(SAMPLE).unwrap();
        assert_eq!(cfg.get_int_or("app:first", "heartbeat_interval", 0).unwrap(), 0);
        assert_eq!(cfg.get_int_or("app:first", "heartbeat_delay", 0).unwrap(), 10);
        assert!(cfg.get_int_or("app:second", "heartbeat_interval", 0).is_err());
        assert_eq!(cfg.get_string_or("app:first", "cmd", "none").unwrap(), "none");
    }

    #[test]
    fn test_sections_keep_declaration_order() {
        let cfg = IniConfig::from_ini_str(SAMPLE).unwrap();
        let names: Vec<String> = cfg
            .sections()
            .into_iter()
            .map(|s| s.to_ascii_lowercase())
            .collect();
        assert_eq!(names, vec!["processwatchdog", "app:first", "app:second"]);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = IniConfig::load("/definitely/not/here/config.ini").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
