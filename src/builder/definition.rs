//! Builder for constructing definitions.

use crate::builder::error::BuildError;
use crate::builder::state::StateBuilder;
use crate::core::{into_result, Definition, StateDef};
use crate::effects::{MachineError, MachineFactory};
use std::collections::BTreeSet;
use stillwater::validation::Validation;

/// Builder for a whole definition with a fluent API.
///
/// Declaring the same state twice is an error rather than a silent
/// replacement.
pub struct DefinitionBuilder<C> {
    definition: Definition<C>,
    duplicates: BTreeSet<String>,
}

impl<C: Send + Sync + 'static> DefinitionBuilder<C> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            definition: Definition::new(),
            duplicates: BTreeSet::new(),
        }
    }

    /// Add a state configured by `configure`.
    pub fn state<F>(self, name: impl Into<String>, configure: F) -> Self
    where
        F: FnOnce(StateBuilder<C>) -> StateBuilder<C>,
    {
        self.add_state(name, configure(StateBuilder::new()).build())
    }

    /// Add a pre-built state.
    pub fn add_state(mut self, name: impl Into<String>, state: StateDef<C>) -> Self {
        let name = name.into();
        if self.definition.contains(&name) {
            self.duplicates.insert(name.clone());
        }
        self.definition.states.insert(name, state);
        self
    }

    /// Build a complete definition, reporting every problem found.
    pub fn build(self) -> Result<Definition<C>, BuildError> {
        let mut checks = vec![self.definition.validate()];
        checks.extend(self.duplicate_checks());
        into_result(Validation::all_vec(checks).map(|_| ()))?;
        Ok(self.definition)
    }

    /// Build a definition meant only as an enhancement. It may omit the
    /// default state, but every transition still needs a target.
    pub fn build_fragment(self) -> Result<Definition<C>, BuildError> {
        let mut checks = self.definition.transition_checks();
        checks.extend(self.duplicate_checks());
        into_result(Validation::all_vec(checks).map(|_| ()))?;
        Ok(self.definition)
    }

    /// Build the definition and bind it to `name`.
    pub fn machine(self, name: impl Into<String>) -> Result<MachineFactory<C>, MachineError> {
        MachineFactory::new(name, self.build()?)
    }

    fn duplicate_checks(&self) -> Vec<Validation<(), stillwater::NonEmptyVec<BuildError>>> {
        self.duplicates
            .iter()
            .map(|state| Validation::fail(BuildError::DuplicateState { state: state.clone() }))
            .collect()
    }
}

impl<C: Send + Sync + 'static> Default for DefinitionBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
