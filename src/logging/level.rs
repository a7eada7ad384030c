//! Severity levels and deployment profiles.
//!
//! Severities are ranked numerically: a larger number is more severe. A
//! logger emits a record when the record's severity is at least the logger's
//! threshold, so lowering a threshold makes a facility more verbose.
//!
//! Two levels, `userError` and `ops`, change rank with the deployment
//! [`Profile`]: in development they sit among the informational levels, in
//! production they sit above `warn` so they always surface.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deployment profile selecting the numeric rank of profile-sensitive levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Development,
    Production,
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            other => Err(ConfigError::UnknownProfile {
                name: other.to_string(),
            }),
        }
    }
}

/// Named log severity.
///
/// # Example
///
/// ```rust
/// use strand::logging::{Level, Profile};
///
/// assert!(Level::Warn.severity(Profile::Development) > Level::Info.severity(Profile::Development));
/// assert_eq!(Level::Ops.severity(Profile::Development), 28);
/// assert_eq!(Level::Ops.severity(Profile::Production), 45);
/// assert_eq!("userError".parse::<Level>().unwrap(), Level::UserError);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    Trace,
    Debug,
    Progress,
    Info,
    UserError,
    Ops,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Every level, in canonical order.
    pub const ALL: [Level; 9] = [
        Level::Trace,
        Level::Debug,
        Level::Progress,
        Level::Info,
        Level::UserError,
        Level::Ops,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    /// Numeric rank of this level under `profile`.
    pub fn severity(self, profile: Profile) -> u8 {
        match (self, profile) {
            (Self::Trace, _) => 10,
            (Self::Debug, _) => 20,
            (Self::Progress, _) => 25,
            (Self::Info, _) => 30,
            (Self::UserError, Profile::Development) => 32,
            (Self::UserError, Profile::Production) => 42,
            (Self::Ops, Profile::Development) => 28,
            (Self::Ops, Profile::Production) => 45,
            (Self::Warn, _) => 40,
            (Self::Error, _) => 50,
            (Self::Fatal, _) => 60,
        }
    }

    /// Canonical name, as accepted by the configuration grammar.
    pub fn name(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Progress => "progress",
            Self::Info => "info",
            Self::UserError => "userError",
            Self::Ops => "ops",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// True when this level would suppress more than `other` does.
    pub fn stricter_than(self, other: Level, profile: Profile) -> bool {
        self.severity(profile) > other.severity(profile)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "progress" => Ok(Self::Progress),
            "info" => Ok(Self::Info),
            "usererror" => Ok(Self::UserError),
            "ops" => Ok(Self::Ops),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            _ => Err(ConfigError::UnknownLevel {
                name: s.trim().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip_through_from_str() {
        for level in Level::ALL {
            assert_eq!(level.name().parse::<Level>().unwrap(), level);
        }
    }

    #[test]
    fn parsing_accepts_common_spellings() {
        assert_eq!("user_error".parse::<Level>().unwrap(), Level::UserError);
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!(" info ".parse::<Level>().unwrap(), Level::Info);
    }

    #[test]
    fn unknown_level_is_a_configuration_error() {
        let err = "verbose".parse::<Level>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLevel { ref name } if name == "verbose"));
    }

    #[test]
    fn profile_moves_user_error_and_ops() {
        let dev = Profile::Development;
        let prod = Profile::Production;

        assert!(Level::Ops.severity(dev) < Level::Info.severity(dev));
        assert!(Level::UserError.severity(dev) < Level::Warn.severity(dev));
        assert!(Level::UserError.severity(prod) > Level::Warn.severity(prod));
        assert!(Level::Ops.severity(prod) > Level::UserError.severity(prod));
    }

    #[test]
    fn stricter_than_compares_by_rank() {
        assert!(Level::Error.stricter_than(Level::Warn, Profile::Development));
        assert!(!Level::Debug.stricter_than(Level::Info, Profile::Development));
        assert!(!Level::Info.stricter_than(Level::Info, Profile::Development));
    }

    #[test]
    fn profile_parses_short_and_long_names() {
        assert_eq!("prod".parse::<Profile>().unwrap(), Profile::Production);
        assert_eq!("Development".parse::<Profile>().unwrap(), Profile::Development);
        assert!("staging".parse::<Profile>().is_err());
    }
}
