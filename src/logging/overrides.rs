//! Global level floors and scoped level overrides.

use super::level::{Level, Profile};
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key naming the fallback entry of a level map.
pub const DEFAULT_FACILITY: &str = "default";

/// The global minimum-level policy.
///
/// Every facility has a floor: its own entry if present, otherwise the
/// `default` entry. Local overrides may lower a floor (more verbose) but never
/// raise it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseLevels {
    default: Level,
    facilities: BTreeMap<String, Level>,
}

impl Default for BaseLevels {
    fn default() -> Self {
        Self::new(Level::Warn)
    }
}

impl BaseLevels {
    pub fn new(default: Level) -> Self {
        Self {
            default,
            facilities: BTreeMap::new(),
        }
    }

    /// Set the floor for one facility. The key `default` replaces the global
    /// floor.
    pub fn with_facility(mut self, facility: impl Into<String>, level: Level) -> Self {
        let facility = facility.into();
        if facility == DEFAULT_FACILITY {
            self.default = level;
        } else {
            self.facilities.insert(facility, level);
        }
        self
    }

    pub fn default_level(&self) -> Level {
        self.default
    }

    /// Floor for `facility`.
    pub fn floor(&self, facility: &str) -> Level {
        if facility == DEFAULT_FACILITY {
            return self.default;
        }
        self.facilities
            .get(facility)
            .copied()
            .unwrap_or(self.default)
    }

    /// The floor as a plain map, including the `default` entry.
    pub fn to_map(&self) -> BTreeMap<String, Level> {
        let mut map = self.facilities.clone();
        map.insert(DEFAULT_FACILITY.to_string(), self.default);
        map
    }

    /// Reject a global floor that would suppress warnings.
    pub fn validate(&self, profile: Profile) -> Result<(), ConfigError> {
        if self.default.stricter_than(Level::Warn, profile) {
            return Err(ConfigError::FloorTooStrict {
                level: self.default.to_string(),
            });
        }
        Ok(())
    }
}

/// Requested per-facility levels for one forked scope.
///
/// An optional message records why the override exists; it is repeated in
/// the audit entry written when the override takes effect.
///
/// Clamped overrides are audited at `warn` and always surface. Accepted ones
/// are audited at `info` under the `strand.levels` facility, so they only
/// show once that facility is at `info` or below, either in the base levels
/// or in the same override map.
///
/// # Example
///
/// ```rust
/// use strand::logging::{Level, LevelOverrides};
///
/// let overrides = LevelOverrides::new()
///     .set("db", Level::Debug)
///     .set("default", Level::Info)
///     .message("investigating slow queries");
///
/// assert_eq!(overrides.get("db"), Some(Level::Debug));
/// assert_eq!(overrides.reason(), Some("investigating slow queries"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelOverrides {
    levels: BTreeMap<String, Level>,
    #[serde(rename = "_message", default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl LevelOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, facility: impl Into<String>, level: Level) -> Self {
        self.levels.insert(facility.into(), level);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn get(&self, facility: &str) -> Option<Level> {
        self.levels.get(facility).copied()
    }

    pub fn reason(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Level)> {
        self.levels.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn contains(&self, facility: &str) -> bool {
        self.levels.contains_key(facility)
    }
}

impl FromIterator<(String, Level)> for LevelOverrides {
    fn from_iter<T: IntoIterator<Item = (String, Level)>>(iter: T) -> Self {
        Self {
            levels: iter.into_iter().collect(),
            message: None,
        }
    }
}
