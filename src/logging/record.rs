//! Emitted log records.

use super::level::Level;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// A single emitted log statement, already filtered by level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub facility: String,
    pub level: Level,
    /// Numeric rank of `level` under the profile in effect at emission.
    pub severity: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    /// Causal labels of the emitting context, outermost first.
    pub context: Vec<String>,
    /// Id of the context node the emitting logger is bound to.
    pub node: Uuid,
}

impl LogRecord {
    pub fn has_context(&self, label: &str) -> bool {
        self.context.iter().any(|c| c == label)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<9} [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level.name(),
            self.facility,
            self.message
        )?;
        if let Some(summary) = &self.summary {
            write!(f, " ({summary})")?;
        }
        if !self.context.is_empty() {
            write!(f, " <{}>", self.context.join(" > "))?;
        }
        if let Some(detail) = &self.detail {
            write!(f, " {detail}")?;
        }
        Ok(())
    }
}
