//! Builder API for ergonomic definition construction.
//!
//! This module provides fluent builders and the [`definition!`](crate::definition)
//! macro for assembling [`Definition`]s, validating them with every problem
//! reported at once.

pub mod definition;
pub mod error;
pub mod macros;
pub mod state;
pub mod transition;

pub use definition::DefinitionBuilder;
pub use error::BuildError;
pub use state::StateBuilder;
pub use transition::TransitionBuilder;

use crate::core::Definition;

/// A definition made of bare transitions, given as `(state, transition,
/// next_state)` triples, starting in `default_state`.
///
/// # Example
///
/// ```
/// use strand::builder::simple_definition;
/// use strand::core::Definition;
///
/// let definition: Definition<()> = simple_definition(
///     "idle",
///     &[("idle", "start", "running"), ("running", "stop", "idle")],
/// )
/// .unwrap();
///
/// assert_eq!(definition.state("running").unwrap().transition_names(), vec!["stop"]);
/// ```
pub fn simple_definition<C>(
    default_state: &str,
    edges: &[(&str, &str, &str)],
) -> Result<Definition<C>, BuildError>
where
    C: Send + Sync + 'static,
{
    let mut definition = Definition::new();
    definition
        .states
        .entry(default_state.to_string())
        .or_default()
        .default = true;
    for (state, transition, next) in edges {
        definition
            .states
            .entry(state.to_string())
            .or_default()
            .transitions
            .insert(transition.to_string(), (*next).into());
        definition.states.entry(next.to_string()).or_default();
    }
    definition.check()?;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_definition_adds_targets_as_states() {
        let definition: Definition<()> =
            simple_definition("start", &[("start", "go", "middle"), ("middle", "go", "end")]).unwrap();

        assert_eq!(definition.state_names(), vec!["end", "middle", "start"]);
        assert!(definition.state("end").unwrap().is_terminal());
        assert_eq!(definition.default_state().unwrap(), "start");
    }
}
