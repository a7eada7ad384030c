//! Effective level resolution.
//!
//! Override maps collected from enclosing scopes are merged outermost to
//! innermost (innermost wins per facility), then each requested level is
//! checked against the global floor. A request that would hide messages the
//! floor requires is clamped to the floor. Every decision is recorded as an
//! [`AuditEntry`] so overrides are always traceable.

use super::level::{Level, Profile};
use super::overrides::{BaseLevels, LevelOverrides, DEFAULT_FACILITY};
use std::collections::BTreeMap;

/// One override decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEntry {
    /// The requested level was at least as verbose as the floor.
    Applied {
        facility: String,
        level: Level,
        message: Option<String>,
    },
    /// The requested level would have hidden required messages.
    Clamped {
        facility: String,
        requested: Level,
        floor: Level,
        message: Option<String>,
    },
}

impl AuditEntry {
    pub fn facility(&self) -> &str {
        match self {
            Self::Applied { facility, .. } | Self::Clamped { facility, .. } => facility,
        }
    }

    pub fn is_clamped(&self) -> bool {
        matches!(self, Self::Clamped { .. })
    }
}

/// Resolved level map plus the audit trail that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    levels: BTreeMap<String, Level>,
    audit: Vec<AuditEntry>,
}

impl Resolution {
    /// Effective level for `facility`: its own entry, then `default`, then
    /// `warn`.
    pub fn level_for(&self, facility: &str) -> Level {
        self.levels
            .get(facility)
            .or_else(|| self.levels.get(DEFAULT_FACILITY))
            .copied()
            .unwrap_or(Level::Warn)
    }

    pub fn levels(&self) -> &BTreeMap<String, Level> {
        &self.levels
    }

    pub fn audit(&self) -> &[AuditEntry] {
        &self.audit
    }
}

/// Resolve `layers` (outermost first) against `base`.
pub fn resolve<'a, I>(base: &BaseLevels, layers: I, profile: Profile) -> Resolution
where
    I: IntoIterator<Item = &'a LevelOverrides>,
{
    let mut candidate: BTreeMap<String, (Level, Option<String>)> = BTreeMap::new();
    for layer in layers {
        let message = layer.reason().map(str::to_string);
        for (facility, level) in layer.iter() {
            candidate.insert(facility.to_string(), (level, message.clone()));
        }
    }

    let mut levels = base.to_map();
    let mut audit = Vec::with_capacity(candidate.len());
    for (facility, (requested, message)) in candidate {
        let floor = base.floor(&facility);
        if requested.stricter_than(floor, profile) {
            levels.insert(facility.clone(), floor);
            audit.push(AuditEntry::Clamped {
                facility,
                requested,
                floor,
                message,
            });
        } else {
            levels.insert(facility.clone(), requested);
            audit.push(AuditEntry::Applied {
                facility,
                level: requested,
                message,
            });
        }
    }

    Resolution { levels, audit }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV: Profile = Profile::Development;

    #[test]
    fn no_overrides_uses_base_floor() {
        let base = BaseLevels::new(Level::Warn).with_facility("db", Level::Info);
        let resolution = resolve(&base, [], DEV);

        assert_eq!(resolution.level_for("db"), Level::Info);
        assert_eq!(resolution.level_for("http"), Level::Warn);
        assert!(resolution.audit().is_empty());
    }

    #[test]
    fn innermost_override_wins() {
        let base = BaseLevels::default();
        let outer = LevelOverrides::new().set("db", Level::Info);
        let inner = LevelOverrides::new().set("db", Level::Trace);

        let resolution = resolve(&base, [&outer, &inner], DEV);
        assert_eq!(resolution.level_for("db"), Level::Trace);
    }

    #[test]
    fn override_cannot_loosen_the_floor() {
        let base = BaseLevels::new(Level::Info);
        let overrides = LevelOverrides::new()
            .set("db", Level::Error)
            .message("too noisy");

        let resolution = resolve(&base, [&overrides], DEV);

        assert_eq!(resolution.level_for("db"), Level::Info);
        assert_eq!(
            resolution.audit(),
            &[AuditEntry::Clamped {
                facility: "db".to_string(),
                requested: Level::Error,
                floor: Level::Info,
                message: Some("too noisy".to_string()),
            }]
        );
    }

    #[test]
    fn accepted_override_is_audited_with_its_message() {
        let base = BaseLevels::default();
        let overrides = LevelOverrides::new()
            .set("default", Level::Debug)
            .message("request 7 debugging");

        let resolution = resolve(&base, [&overrides], DEV);

        assert_eq!(resolution.level_for("anything"), Level::Debug);
        assert!(matches!(
            &resolution.audit()[0],
            AuditEntry::Applied { facility, level: Level::Debug, message: Some(m) }
                if facility == "default" && m == "request 7 debugging"
        ));
    }

    #[test]
    fn facility_floor_applies_to_facility_overrides() {
        let base = BaseLevels::new(Level::Warn).with_facility("db", Level::Debug);
        let overrides = LevelOverrides::new().set("db", Level::Info);

        let resolution = resolve(&base, [&overrides], DEV);
        assert_eq!(resolution.level_for("db"), Level::Debug);
        assert!(resolution.audit()[0].is_clamped());
    }
}
