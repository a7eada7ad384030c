//! Logging configuration.
//!
//! Configuration comes from three settings:
//!
//! - [`LEVELS_VAR`]: global floors, `facility[:level],facility[:level],...`;
//!   a bare facility means `info`, the facility `default` sets the global
//!   floor (which is `warn` when absent)
//! - [`CONSOLE_VAR`]: mirror every record to stderr
//! - [`PROFILE_VAR`]: `development` or `production`
//!
//! Parsing accumulates every problem with stillwater's `Validation` instead of
//! stopping at the first one.
//!
//! # Example
//!
//! ```rust
//! use strand::config::LogConfig;
//! use strand::logging::Level;
//!
//! let config = LogConfig::from_lookup(|var| match var {
//!     "STRAND_LOG" => Some("default:info, db:debug, http".to_string()),
//!     "STRAND_LOG_CONSOLE" => Some("yes".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//!
//! assert_eq!(config.base.floor("db"), Level::Debug);
//! assert_eq!(config.base.floor("http"), Level::Info);
//! assert_eq!(config.base.floor("other"), Level::Info);
//! assert!(config.console);
//! ```

pub mod error;

pub use error::{ConfigError, ConfigErrors};

use crate::logging::{BaseLevels, Level, Profile};
use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Environment variable holding the level grammar.
pub const LEVELS_VAR: &str = "STRAND_LOG";
/// Environment variable enabling console mirroring.
pub const CONSOLE_VAR: &str = "STRAND_LOG_CONSOLE";
/// Environment variable selecting the profile.
pub const PROFILE_VAR: &str = "STRAND_PROFILE";

type Checked<T> = Validation<T, NonEmptyVec<ConfigError>>;

/// Validated logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    pub base: BaseLevels,
    pub console: bool,
    pub profile: Profile,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base: BaseLevels::default(),
            console: false,
            profile: Profile::Development,
        }
    }
}

impl LogConfig {
    /// Build a configuration, rejecting a global floor stricter than `warn`.
    pub fn new(base: BaseLevels, profile: Profile) -> Result<Self, ConfigError> {
        base.validate(profile)?;
        Ok(Self {
            base,
            console: false,
            profile,
        })
    }

    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigErrors> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through `lookup`, reporting every problem found.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigErrors>
    where
        F: Fn(&str) -> Option<String>,
    {
        let levels = lookup(LEVELS_VAR)
            .map(|spec| parse_levels(&spec))
            .unwrap_or_else(|| Validation::success(Vec::new()));
        let console = lookup(CONSOLE_VAR)
            .map(|value| parse_flag(CONSOLE_VAR, &value))
            .unwrap_or_else(|| Validation::success(false));
        let profile = lookup(PROFILE_VAR)
            .map(|value| parse_profile(&value))
            .unwrap_or_else(|| Validation::success(Profile::Development));

        match (levels, console, profile) {
            (Validation::Success(entries), Validation::Success(console), Validation::Success(profile)) => {
                let base = entries
                    .into_iter()
                    .fold(BaseLevels::default(), |base, (facility, level)| {
                        base.with_facility(facility, level)
                    });
                Ok(Self::new(base, profile)?.with_console(console))
            }
            (levels, console, profile) => {
                let mut errors = Vec::new();
                collect_failures(levels, &mut errors);
                collect_failures(console, &mut errors);
                collect_failures(profile, &mut errors);
                Err(ConfigErrors(errors))
            }
        }
    }
}

/// Parse the `facility[:level],...` grammar.
pub fn parse_levels(spec: &str) -> Validation<Vec<(String, Level)>, NonEmptyVec<ConfigError>> {
    let entries: Vec<Checked<(String, Level)>> = spec
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_entry)
        .collect();
    Validation::all_vec(entries)
}

fn parse_entry(entry: &str) -> Checked<(String, Level)> {
    let (facility, level) = match entry.split_once(':') {
        Some((facility, level)) => (facility.trim(), level.trim()),
        None => (entry, "info"),
    };
    if facility.is_empty() {
        return Validation::fail(ConfigError::EmptyFacility {
            entry: entry.to_string(),
        });
    }
    match level.parse::<Level>() {
        Ok(level) => Validation::success((facility.to_string(), level)),
        Err(error) => Validation::fail(error),
    }
}

fn parse_flag(var: &str, value: &str) -> Checked<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Validation::success(true),
        "" | "0" | "false" | "no" | "off" => Validation::success(false),
        _ => Validation::fail(ConfigError::InvalidFlag {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_profile(value: &str) -> Checked<Profile> {
    match value.parse::<Profile>() {
        Ok(profile) => Validation::success(profile),
        Err(error) => Validation::fail(error),
    }
}

fn collect_failures<T>(checked: Checked<T>, errors: &mut Vec<ConfigError>) {
    if let Validation::Failure(found) = checked {
        errors.extend(found.iter().cloned());
    }
}
