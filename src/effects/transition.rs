//! Transition outcomes and errors.

use crate::builder::BuildError;
use crate::context::ContextualError;
use crate::logging::Logger;
use std::fmt;

/// Which hook of a transition failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Predicate,
    Effect,
    Entry,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Predicate => "predicate",
            Self::Effect => "effect",
            Self::Entry => "onEntry",
        })
    }
}

/// Coarse classification of a [`MachineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The definition or machine setup is wrong. Not retriable.
    Configuration,
    /// A predicate blocked the transition. Expected control flow.
    UnmetPredicate,
    /// The transition is not valid from the current state.
    InvalidTransition,
    /// A predicate or effect failed.
    Hook,
    /// The integration hook failed.
    Integration,
    /// Enhancement was misused or its source failed.
    Enhancement,
}

/// Errors that can occur while driving a machine.
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    #[error("Machine '{machine}' is misconfigured: {message}")]
    Configuration { machine: String, message: String },

    #[error("Invalid definition: {0}")]
    Definition(#[from] BuildError),

    #[error("Transition '{transition}' from state '{state}' of machine '{machine}' blocked by its predicate")]
    UnmetPredicate {
        machine: String,
        state: String,
        transition: String,
    },

    #[error("Invalid transition '{transition}' from state '{state}' of machine '{machine}': {reason}")]
    InvalidTransition {
        machine: String,
        state: String,
        transition: String,
        reason: String,
    },

    #[error("The {phase} of transition '{transition}' failed: {source}")]
    Hook {
        phase: HookPhase,
        transition: String,
        #[source]
        source: ContextualError,
    },

    #[error("Integration hook for transition '{transition}' of machine '{machine}' failed: {source:#}")]
    Integration {
        machine: String,
        transition: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Enhancement redirects transition '{transition}' of state '{state}' from '{base}' to '{enhancement}'")]
    MergeConflict {
        state: String,
        transition: String,
        base: String,
        enhancement: String,
    },

    #[error("Machine '{machine}' has already been enhanced")]
    EnhancementAlreadyTriggered { machine: String },

    #[error("Enhancement of machine '{machine}' failed: {source:#}")]
    Enhancement {
        machine: String,
        #[source]
        source: anyhow::Error,
    },
}

impl MachineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } | Self::Definition(_) | Self::MergeConflict { .. } => {
                ErrorKind::Configuration
            }
            Self::UnmetPredicate { .. } => ErrorKind::UnmetPredicate,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Hook { .. } => ErrorKind::Hook,
            Self::Integration { .. } => ErrorKind::Integration,
            Self::EnhancementAlreadyTriggered { .. } | Self::Enhancement { .. } => ErrorKind::Enhancement,
        }
    }

    /// Failures [`optional_transition`](crate::effects::Machine::optional_transition)
    /// turns into `false`.
    pub fn is_expected(&self) -> bool {
        matches!(self.kind(), ErrorKind::UnmetPredicate | ErrorKind::InvalidTransition)
    }
}

/// What the integration hook is told after a transition completes.
#[derive(Debug, Clone)]
pub struct TransitionNotice {
    pub machine: String,
    pub transition: String,
    /// State the machine is in now.
    pub current_state: String,
    /// State the transition started from.
    pub from_state: String,
    pub generation: u64,
    pub logger: Logger,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_classify_errors() {
        let blocked = MachineError::UnmetPredicate {
            machine: "doc".to_string(),
            state: "draft".to_string(),
            transition: "submit".to_string(),
        };
        assert_eq!(blocked.kind(), ErrorKind::UnmetPredicate);
        assert!(blocked.is_expected());

        let conflict = MachineError::MergeConflict {
            state: "draft".to_string(),
            transition: "submit".to_string(),
            base: "review".to_string(),
            enhancement: "cancelled".to_string(),
        };
        assert_eq!(conflict.kind(), ErrorKind::Configuration);
        assert!(!conflict.is_expected());

        let twice = MachineError::EnhancementAlreadyTriggered {
            machine: "doc".to_string(),
        };
        assert_eq!(twice.kind(), ErrorKind::Enhancement);
    }

    #[test]
    fn messages_name_the_transition() {
        let err = MachineError::InvalidTransition {
            machine: "doc".to_string(),
            state: "done".to_string(),
            transition: "submit".to_string(),
            reason: "state 'done' is terminal".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition 'submit' from state 'done' of machine 'doc': state 'done' is terminal"
        );
        assert_eq!(HookPhase::Entry.to_string(), "onEntry");
    }
}
