//! Injected failure role and startup parameter parsing.

use crate::error::ArgumentError;

/// Index used when none (or garbage) is supplied.
pub const DEFAULT_INDEX: u32 = 1;

/// Failure mode applied once the observation ceiling is reached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Role {
    /// Terminate immediately with success status
    #[default]
    Crash,

    /// Stop sending for a bounded window while staying alive
    NoHeartbeat,

    /// Any other role: nothing happens at the ceiling
    Unrecognized(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "crash" => Role::Crash,
            "noheartbeat" | "noping" => Role::NoHeartbeat,
            other => Role::Unrecognized(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Role::Crash => "crash",
            Role::NoHeartbeat => "noheartbeat",
            Role::Unrecognized(raw) => raw.as_str(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parses the positional `index` parameter.
///
/// Absent yields the default silently; anything that is not a positive
/// integer yields the default plus an [`ArgumentError`].
pub fn parse_index(raw: Option<&str>) -> (u32, Option<ArgumentError>) {
    let Some(raw) = raw else {
        return (DEFAULT_INDEX, None);
    };
    match raw.trim().parse::<u32>() {
        Ok(index) if index > 0 => (index, None),
        _ => (
            DEFAULT_INDEX,
            Some(ArgumentError::Index {
                raw: raw.to_string(),
                fallback: DEFAULT_INDEX,
            }),
        ),
    }
}

/// Parses the positional `role` parameter.
pub fn parse_role(raw: Option<&str>) -> (Role, Option<ArgumentError>) {
    match raw.map(str::trim) {
        None => (Role::default(), None),
        Some("") => (
            Role::default(),
            Some(ArgumentError::Role {
                fallback: Role::default().to_string(),
            }),
        ),
        Some(raw) => (Role::parse(raw), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("crash"), Role::Crash);
        assert_eq!(Role::parse("noheartbeat"), Role::NoHeartbeat);
        assert_eq!(Role::parse("noping"), Role::NoHeartbeat);
        assert_eq!(Role::parse("healthy"), Role::Unrecognized("healthy".into()));
        assert_eq!(Role::parse("CRASH"), Role::Unrecognized("CRASH".into()));
    }

    #[test]
    fn test_index_defaults() {
        assert_eq!(parse_index(None), (1, None));
        assert_eq!(parse_index(Some("3")), (3, None));

        for raw in ["0", "-2", "two", ""] {
            let (index, err) = parse_index(Some(raw));
            assert_eq!(index, 1);
            assert_eq!(
                err,
                Some(ArgumentError::Index {
                    raw: raw.to_string(),
                    fallback: 1
                })
            );
        }
    }

    #[test]
    fn test_role_defaults() {
        assert_eq!(parse_role(None), (Role::Crash, None));
        assert_eq!(parse_role(Some("noping")), (Role::NoHeartbeat, None));

        let (role, err) = parse_role(Some("  "));
        assert_eq!(role, Role::Crash);
        assert!(err.is_some());
    }
}
