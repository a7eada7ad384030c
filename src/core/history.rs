//! Transition history tracking.
//!
//! Provides immutable tracking of completed transitions over time, used for
//! introspection and carried in checkpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single completed state change.
///
/// # Example
///
/// ```rust
/// use strand::core::TransitionRecord;
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     transition: "submit".to_string(),
///     from: "draft".to_string(),
///     to: "review".to_string(),
///     generation: 2,
///     timestamp: Utc::now(),
/// };
/// assert!(!record.is_re_entry());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Name of the transition taken
    pub transition: String,
    /// The state being left
    pub from: String,
    /// The state entered
    pub to: String,
    /// Machine generation after the change
    pub generation: u64,
    /// When the state changed
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    /// Whether the transition looped back into the state it left.
    pub fn is_re_entry(&self) -> bool {
        self.from == self.to
    }
}

/// Ordered history of transitions.
///
/// History is immutable - the `record` method returns a new history
/// with the transition added.
///
/// # Example
///
/// ```rust
/// use strand::core::{History, TransitionRecord};
/// use chrono::Utc;
///
/// let step = |transition: &str, from: &str, to: &str, generation| TransitionRecord {
///     transition: transition.to_string(),
///     from: from.to_string(),
///     to: to.to_string(),
///     generation,
///     timestamp: Utc::now(),
/// };
///
/// let history = History::new()
///     .record(step("submit", "draft", "review", 2))
///     .record(step("approve", "review", "done", 3));
///
/// assert_eq!(history.path(), vec!["draft", "review", "done"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    records: Vec<TransitionRecord>,
}

impl History {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition, returning a new history.
    ///
    /// The existing history is left untouched.
    pub fn record(&self, record: TransitionRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        Self { records }
    }

    /// States traversed: the first origin, then the target of each record.
    ///
    /// A machine's startup is recorded as a re-entry of its default state,
    /// so that state appears twice at the head of the path.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.records.len() + 1);
        if let Some(first) = self.records.first() {
            path.push(first.from.as_str());
        }
        path.extend(self.records.iter().map(|r| r.to.as_str()));
        path
    }

    /// Time from the first to the last recorded transition.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.first()?, self.records.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(transition: &str, from: &str, to: &str, generation: u64) -> TransitionRecord {
        TransitionRecord {
            transition: transition.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            generation,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = History::new();
        assert!(history.is_empty());
        assert!(history.path().is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn record_is_immutable() {
        let history = History::new();
        let new_history = history.record(record("start", "idle", "running", 1));

        assert_eq!(history.len(), 0);
        assert_eq!(new_history.len(), 1);
    }

    #[test]
    fn path_returns_state_sequence() {
        let history = History::new()
            .record(record("start", "idle", "running", 1))
            .record(record("finish", "running", "done", 2));

        assert_eq!(history.path(), vec!["idle", "running", "done"]);
        assert_eq!(history.last().unwrap().generation, 2);
    }

    #[test]
    fn duration_calculates_elapsed_time() {
        let history = History::new().record(record("start", "idle", "running", 1));
        std::thread::sleep(std::time::Duration::from_millis(10));
        let history = history.record(record("finish", "running", "done", 2));

        assert!(history.duration().unwrap() >= std::time::Duration::from_millis(10));
    }

    #[test]
    fn single_transition_has_duration_zero() {
        let history = History::new().record(record("start", "idle", "running", 1));
        assert_eq!(history.duration(), Some(std::time::Duration::from_secs(0)));
    }

    #[test]
    fn re_entry_is_detected() {
        assert!(record("retry", "running", "running", 3).is_re_entry());
        assert!(!record("start", "idle", "running", 1).is_re_entry());
    }

    #[test]
    fn history_serializes_correctly() {
        let history = History::new().record(record("start", "idle", "running", 1));
        let json = serde_json::to_string(&history).unwrap();
        let restored: History = serde_json::from_str(&json).unwrap();
        assert_eq!(history, restored);
    }
}
