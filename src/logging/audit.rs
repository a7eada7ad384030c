//! Audit trail for level overrides.

use super::logger::{Fields, Logger};
use super::overrides::LevelOverrides;
use super::resolver::{resolve, AuditEntry};
use crate::context::Context;
use serde_json::json;

/// Facility the audit trail is written under.
pub const AUDIT_FACILITY: &str = "strand.levels";

/// Record how the overrides newly introduced at `context` were applied.
///
/// Clamped overrides are written at `warn`, accepted ones at `info`.
pub(crate) fn report(context: &Context, overrides: &LevelOverrides) {
    let settings = context.settings();
    let layers = context.override_layers();
    let resolution = resolve(
        settings.base(),
        layers.iter().map(|layer| layer.as_ref()),
        settings.profile(),
    );
    let logger = Logger::bind(AUDIT_FACILITY.to_string(), context.clone());

    for entry in resolution
        .audit()
        .iter()
        .filter(|entry| overrides.contains(entry.facility()))
    {
        match entry {
            AuditEntry::Applied {
                facility,
                level,
                message,
            } => {
                let detail = json!({ "facility": facility, "level": level });
                logger.info_with(
                    reason(message).detail_value(detail),
                    format_args!("level override applied: {facility} -> {level}"),
                );
            }
            AuditEntry::Clamped {
                facility,
                requested,
                floor,
                message,
            } => {
                let detail = json!({
                    "facility": facility,
                    "requested": requested,
                    "floor": floor,
                });
                logger.warn_with(
                    reason(message).detail_value(detail),
                    format_args!(
                        "level override for {facility} clamped to {floor}: requested {requested} would hide required messages"
                    ),
                );
            }
        }
    }
}

fn reason(message: &Option<String>) -> Fields {
    match message {
        Some(message) => Fields::new().summary(message.clone()),
        None => Fields::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ForkOptions, Settings};
    use crate::logging::{BaseLevels, Level, MemorySink, Profile};
    use std::sync::Arc;

    #[test]
    fn clamped_override_warns_even_at_default_floor() {
        let sink = Arc::new(MemorySink::new());
        let root = Context::root(
            "svc",
            Settings::new(
                BaseLevels::new(Level::Info),
                Profile::Development,
                sink.clone(),
            ),
        );

        let _scope = root.fork_with_context(
            "quiet",
            ForkOptions::new().levels(
                LevelOverrides::new()
                    .set("db", Level::Error)
                    .message("silence db"),
            ),
        );

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::Warn);
        assert_eq!(records[0].facility, AUDIT_FACILITY);
        assert_eq!(records[0].summary.as_deref(), Some("silence db"));
        assert_eq!(records[0].detail.as_ref().unwrap()["floor"], "info");
    }

    #[test]
    fn applied_override_is_info_and_filtered_by_level() {
        let sink = Arc::new(MemorySink::new());
        let root = Context::root(
            "svc",
            Settings::new(BaseLevels::default(), Profile::Development, sink.clone()),
        );

        // The audit facility itself sits at the warn floor, so the info entry
        // is filtered out.
        let _scope = root.fork_with_context(
            "verbose db",
            ForkOptions::new().levels(LevelOverrides::new().set("db", Level::Debug)),
        );

        assert!(sink.is_empty());
    }

    #[test]
    fn applied_override_surfaces_when_audit_facility_is_lowered() {
        let sink = Arc::new(MemorySink::new());
        let root = Context::root(
            "svc",
            Settings::new(
                BaseLevels::default().with_facility(AUDIT_FACILITY, Level::Info),
                Profile::Development,
                sink.clone(),
            ),
        );

        let _scope = root.fork_with_context(
            "verbose db",
            ForkOptions::new().levels(
                LevelOverrides::new()
                    .set("db", Level::Debug)
                    .message("slow queries"),
            ),
        );

        let records = sink.matching("level override applied: db -> debug");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Level::Info);
        assert_eq!(records[0].summary.as_deref(), Some("slow queries"));
    }
}
