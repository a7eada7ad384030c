//! Errors for definition builders.

use thiserror::Error;

/// Problems found while building or validating a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Definition has no states")]
    NoStates,

    #[error("No default state. Mark one state as default or name a state 'default'")]
    NoDefaultState,

    #[error("More than one default state: {}", .states.join(", "))]
    MultipleDefaultStates { states: Vec<String> },

    #[error("State '{state}' is defined more than once")]
    DuplicateState { state: String },

    #[error("Transition '{transition}' of state '{state}' has no next state. Call .to(state)")]
    MissingNextState { state: String, transition: String },

    #[error("{} problems: {}", .problems.len(), .problems.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid { problems: Vec<BuildError> },
}

impl BuildError {
    /// The individual problems, flattening [`BuildError::Invalid`].
    pub fn problems(&self) -> Vec<&BuildError> {
        match self {
            Self::Invalid { problems } => problems.iter().collect(),
            single => vec![single],
        }
    }
}
