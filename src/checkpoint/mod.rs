//! Checkpoint and resume functionality for machines.
//!
//! A [`Snapshot`] captures everything about an instance except its hooks and
//! target object, which are code. Restoring binds a snapshot back to a
//! factory's definition and a fresh target.

use crate::context::Context;
use crate::core::History;
use crate::effects::{Machine, MachineFactory, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable state of one machine instance.
/// Does NOT include hooks or the target object (not serializable).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Checkpoint format version
    pub version: u32,

    /// Name the machine was created under
    pub machine: String,

    /// Instance identifier, kept across restores
    pub instance: Uuid,

    pub current_state: String,

    pub generation: u64,

    /// Whether the startup transition had run
    pub started: bool,

    /// When the instance was created
    pub created: DateTime<Utc>,

    /// Complete transition history
    pub history: History,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    /// Compact binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    fn check_version(self) -> Result<Self, CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        Ok(self)
    }
}

impl<C> Machine<C> {
    /// Capture the instance's current state.
    pub fn snapshot(&self) -> Snapshot {
        let status = self.status();
        Snapshot {
            version: CHECKPOINT_VERSION,
            machine: self.name().to_string(),
            instance: self.instance_id(),
            current_state: status.current.clone(),
            generation: self.generation(),
            started: status.started,
            created: self.created(),
            history: status.history.clone(),
            taken_at: Utc::now(),
        }
    }
}

impl<C: Send + Sync + 'static> MachineFactory<C> {
    /// Rebuild an instance from `snapshot`, bound to `target` and attributed
    /// to the current context.
    ///
    /// The factory's base definition is used; an enhancement applied to the
    /// original instance has to be scheduled again.
    pub fn restore(&self, target: C, snapshot: &Snapshot) -> Result<Machine<C>, CheckpointError> {
        self.restore_in(target, snapshot, &Context::current())
    }

    pub fn restore_in(
        &self,
        target: C,
        snapshot: &Snapshot,
        context: &Context,
    ) -> Result<Machine<C>, CheckpointError> {
        if snapshot.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: snapshot.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        if snapshot.machine != self.name() {
            return Err(CheckpointError::MachineMismatch {
                expected: self.name().to_string(),
                found: snapshot.machine.clone(),
            });
        }
        if !self.definition().contains(&snapshot.current_state) {
            return Err(CheckpointError::UnknownState {
                machine: self.name().to_string(),
                state: snapshot.current_state.clone(),
            });
        }
        if !snapshot.started && snapshot.current_state != self.default_state() {
            return Err(CheckpointError::ValidationFailed(format!(
                "unstarted machine is in '{}' rather than its default state '{}'",
                snapshot.current_state,
                self.default_state()
            )));
        }

        let status = Status {
            current: snapshot.current_state.clone(),
            started: snapshot.started,
            history: snapshot.history.clone(),
        };
        Ok(Machine::assemble(
            self,
            snapshot.instance,
            Arc::new(target),
            context.clone(),
            status,
            snapshot.generation,
            snapshot.created,
        ))
    }
}
