//! Configuration error types.

use thiserror::Error;

/// A single problem found while reading logging configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A severity name that is not one of the known levels
    #[error("Unknown log level '{name}'")]
    UnknownLevel { name: String },

    /// A profile name other than development/production
    #[error("Unknown profile '{name}', expected 'development' or 'production'")]
    UnknownProfile { name: String },

    /// A global floor that would hide warnings
    #[error("Default log floor '{level}' is stricter than 'warn'")]
    FloorTooStrict { level: String },

    /// A `facility:level` entry with nothing before the colon
    #[error("Log level entry '{entry}' has no facility name")]
    EmptyFacility { entry: String },

    /// A boolean setting with an unrecognized value
    #[error("Setting {var} has non-boolean value '{value}'")]
    InvalidFlag { var: String, value: String },
}

/// Every problem found in one pass over the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid logging configuration: {}", describe(.0))]
pub struct ConfigErrors(pub Vec<ConfigError>);

impl ConfigErrors {
    pub fn errors(&self) -> &[ConfigError] {
        &self.0
    }
}

impl From<ConfigError> for ConfigErrors {
    fn from(error: ConfigError) -> Self {
        Self(vec![error])
    }
}

fn describe(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
