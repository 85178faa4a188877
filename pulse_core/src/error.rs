//! Error taxonomy for configuration loading and startup arguments.
//!
//! Only [`ConfigError`] is fatal. Warnings and argument errors are
//! recovered locally and carried back to the caller so they can be logged.

use thiserror::Error;

/// Fatal configuration errors. Startup aborts before any socket is opened.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing key [{section}] {key}")]
    MissingKey { section: String, key: String },

    #[error("Invalid value for [{section}] {key}: {value:?}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("Cannot load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn missing(section: &str, key: &str) -> Self {
        Self::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub fn invalid(section: &str, key: &str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.into(),
        }
    }

    /// True when the error only means "the key is not there".
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingKey { .. })
    }
}

/// Recoverable configuration problems, resolved with a default value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigWarning {
    #[error("[{section}] {key} not set, using {default}")]
    Defaulted {
        section: String,
        key: String,
        default: i64,
    },

    #[error("[{section}] {key} = {value:?} is not an integer, using {default}")]
    Unparsable {
        section: String,
        key: String,
        value: String,
        default: i64,
    },

    #[error("No app section #{index} ({declared} declared), timing defaults to 0")]
    NoAppSection { index: u32, declared: usize },

    #[error("No name for instance {index}, using {fallback}")]
    SynthesizedName { index: u32, fallback: String },
}

/// Unusable startup parameters, replaced by their documented defaults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("Index {raw:?} is not a positive integer, using {fallback}")]
    Index { raw: String, fallback: u32 },

    #[error("Role is empty, using {fallback}")]
    Role { fallback: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_display() {
        let err = ConfigError::missing("processWatchdog", "udp_port");
        assert_eq!(err.to_string(), "Missing key [processWatchdog] udp_port");
        assert!(err.is_missing());
        assert!(!ConfigError::invalid("a", "b", "c").is_missing());
    }

    #[test]
    fn test_warning_display() {
        let warning = ConfigWarning::Unparsable {
            section: "app:worker".into(),
            key: "heartbeat_interval".into(),
            value: "soon".into(),
            default: 0,
        };
        assert_eq!(
            warning.to_string(),
            "[app:worker] heartbeat_interval = \"soon\" is not an integer, using 0"
        );
    }
}
