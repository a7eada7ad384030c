//! State machine definitions.
//!
//! A [`Definition`] maps state names to [`StateDef`]s; each state maps
//! transition names to [`TransitionDef`]s. Definitions are plain data: they
//! are never mutated once handed to a machine, and enhancement produces a new
//! definition rather than editing one in place.

use super::hook::{Hook, Predicate};
use crate::builder::BuildError;
use std::collections::BTreeMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Name of the implicit startup transition, and of the fallback default
/// state.
pub const DEFAULT_TRANSITION: &str = "default";

/// One named edge out of a state.
pub struct TransitionDef<C> {
    pub(crate) next_state: Option<String>,
    pub(crate) predicate: Option<Predicate<C>>,
    pub(crate) effect: Option<Hook<C>>,
    pub(crate) re_entry: bool,
}

impl<C> Clone for TransitionDef<C> {
    fn clone(&self) -> Self {
        Self {
            next_state: self.next_state.clone(),
            predicate: self.predicate.clone(),
            effect: self.effect.clone(),
            re_entry: self.re_entry,
        }
    }
}

impl<C> Default for TransitionDef<C> {
    fn default() -> Self {
        Self {
            next_state: None,
            predicate: None,
            effect: None,
            re_entry: false,
        }
    }
}

impl<C> TransitionDef<C> {
    /// A bare edge to `next_state`.
    pub fn to(next_state: impl Into<String>) -> Self {
        Self {
            next_state: Some(next_state.into()),
            ..Self::default()
        }
    }

    pub fn next_state(&self) -> Option<&str> {
        self.next_state.as_deref()
    }

    pub fn predicate(&self) -> Option<&Predicate<C>> {
        self.predicate.as_ref()
    }

    pub fn effect(&self) -> Option<&Hook<C>> {
        self.effect.as_ref()
    }

    /// Whether the entry hook runs even when the target is the current state.
    pub fn re_entry(&self) -> bool {
        self.re_entry
    }
}

impl<C> From<&str> for TransitionDef<C> {
    fn from(next_state: &str) -> Self {
        Self::to(next_state)
    }
}

impl<C> From<String> for TransitionDef<C> {
    fn from(next_state: String) -> Self {
        Self::to(next_state)
    }
}

/// One state: its flags, entry hook and outgoing transitions.
pub struct StateDef<C> {
    pub(crate) default: bool,
    pub(crate) label: Option<String>,
    pub(crate) on_entry: Option<Hook<C>>,
    pub(crate) transitions: BTreeMap<String, TransitionDef<C>>,
}

impl<C> Clone for StateDef<C> {
    fn clone(&self) -> Self {
        Self {
            default: self.default,
            label: self.label.clone(),
            on_entry: self.on_entry.clone(),
            transitions: self.transitions.clone(),
        }
    }
}

impl<C> Default for StateDef<C> {
    fn default() -> Self {
        Self {
            default: false,
            label: None,
            on_entry: None,
            transitions: BTreeMap::new(),
        }
    }
}

impl<C> StateDef<C> {
    pub fn is_default(&self) -> bool {
        self.default
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn on_entry(&self) -> Option<&Hook<C>> {
        self.on_entry.as_ref()
    }

    pub fn transition(&self, name: &str) -> Option<&TransitionDef<C>> {
        self.transitions.get(name)
    }

    pub fn transition_names(&self) -> Vec<&str> {
        self.transitions.keys().map(String::as_str).collect()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (&str, &TransitionDef<C>)> {
        self.transitions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A state with no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// A complete state machine definition.
pub struct Definition<C> {
    pub(crate) states: BTreeMap<String, StateDef<C>>,
}

impl<C> Clone for Definition<C> {
    fn clone(&self) -> Self {
        Self {
            states: self.states.clone(),
        }
    }
}

impl<C> std::fmt::Debug for Definition<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("states", &self.states.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> Default for Definition<C> {
    fn default() -> Self {
        Self {
            states: BTreeMap::new(),
        }
    }
}

impl<C> Definition<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a state without validation.
    pub fn with_state(mut self, name: impl Into<String>, state: StateDef<C>) -> Self {
        self.states.insert(name.into(), state);
        self
    }

    pub fn state(&self, name: &str) -> Option<&StateDef<C>> {
        self.states.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn state_names(&self) -> Vec<&str> {
        self.states.keys().map(String::as_str).collect()
    }

    pub fn states(&self) -> impl Iterator<Item = (&str, &StateDef<C>)> {
        self.states.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The single default state: the one flagged `default`, or else a state
    /// literally named `default`.
    pub fn default_state(&self) -> Result<&str, BuildError> {
        let flagged: Vec<&str> = self
            .states
            .iter()
            .filter(|(_, state)| state.default)
            .map(|(name, _)| name.as_str())
            .collect();
        match flagged.as_slice() {
            [single] => Ok(single),
            [] if self.contains(DEFAULT_TRANSITION) => Ok(DEFAULT_TRANSITION),
            [] => Err(BuildError::NoDefaultState),
            many => Err(BuildError::MultipleDefaultStates {
                states: many.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    /// Transitions whose target names no state, as `(state, transition,
    /// target)`. These are not rejected up front; a machine reports them when
    /// they are taken.
    pub fn dangling_targets(&self) -> Vec<(String, String, String)> {
        self.states
            .iter()
            .flat_map(|(state, def)| {
                def.transitions.iter().filter_map(move |(name, transition)| {
                    transition
                        .next_state
                        .as_ref()
                        .filter(|target| !self.contains(target))
                        .map(|target| (state.clone(), name.clone(), target.clone()))
                })
            })
            .collect()
    }

    /// Check the structure, accumulating every problem.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<BuildError>> {
        let mut checks = vec![if self.states.is_empty() {
            Validation::fail(BuildError::NoStates)
        } else {
            match self.default_state() {
                Ok(_) => Validation::success(()),
                Err(error) => Validation::fail(error),
            }
        }];
        checks.extend(self.transition_checks());
        Validation::all_vec(checks).map(|_| ())
    }

    /// [`Definition::validate`] as a `Result`, folding several problems into
    /// [`BuildError::Invalid`].
    pub fn check(&self) -> Result<(), BuildError> {
        into_result(self.validate())
    }

    /// Checks every transition has a target. Enhancement fragments need
    /// nothing more, since they may omit the default state.
    pub(crate) fn transition_checks(&self) -> Vec<Validation<(), NonEmptyVec<BuildError>>> {
        self.states
            .iter()
            .flat_map(|(state, def)| {
                def.transitions.iter().map(move |(name, transition)| {
                    if transition.next_state.is_none() {
                        Validation::fail(BuildError::MissingNextState {
                            state: state.clone(),
                            transition: name.clone(),
                        })
                    } else {
                        Validation::success(())
                    }
                })
            })
            .collect()
    }
}

pub(crate) fn into_result(checked: Validation<(), NonEmptyVec<BuildError>>) -> Result<(), BuildError> {
    match checked {
        Validation::Success(()) => Ok(()),
        Validation::Failure(errors) => {
            let mut errors: Vec<BuildError> = errors.iter().cloned().collect();
            if errors.len() == 1 {
                Err(errors.remove(0))
            } else {
                Err(BuildError::Invalid { problems: errors })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(default: bool, transitions: &[(&str, &str)]) -> StateDef<()> {
        StateDef {
            default,
            transitions: transitions
                .iter()
                .map(|(name, next)| (name.to_string(), TransitionDef::to(*next)))
                .collect(),
            ..StateDef::default()
        }
    }

    #[test]
    fn flagged_state_is_default() {
        let def = Definition::new()
            .with_state("draft", state(true, &[("submit", "review")]))
            .with_state("review", state(false, &[]));

        assert_eq!(def.default_state().unwrap(), "draft");
        assert!(def.state("review").unwrap().is_terminal());
    }

    #[test]
    fn state_named_default_is_fallback() {
        let def = Definition::new()
            .with_state("default", state(false, &[("go", "running")]))
            .with_state("running", state(false, &[]));
        assert_eq!(def.default_state().unwrap(), "default");
    }

    #[test]
    fn missing_or_multiple_defaults_are_rejected() {
        let none = Definition::new().with_state("a", state(false, &[]));
        assert!(matches!(none.default_state(), Err(BuildError::NoDefaultState)));

        let two = Definition::new()
            .with_state("a", state(true, &[]))
            .with_state("b", state(true, &[]));
        assert!(matches!(
            two.default_state(),
            Err(BuildError::MultipleDefaultStates { ref states }) if states.len() == 2
        ));
    }

    #[test]
    fn dangling_targets_are_listed_not_rejected() {
        let def = Definition::new().with_state("a", state(true, &[("go", "nowhere")]));

        assert!(def.check().is_ok());
        assert_eq!(
            def.dangling_targets(),
            vec![("a".to_string(), "go".to_string(), "nowhere".to_string())]
        );
    }

    #[test]
    fn validate_accumulates_every_problem() {
        let mut broken = state(false, &[]);
        broken
            .transitions
            .insert("go".to_string(), TransitionDef::default());
        let def = Definition::new().with_state("a", broken);

        match def.validate() {
            Validation::Failure(errors) => assert_eq!(errors.len(), 2),
            Validation::Success(_) => panic!("expected failures"),
        }
        assert!(matches!(def.check(), Err(BuildError::Invalid { ref problems }) if problems.len() == 2));
    }

    #[test]
    fn empty_definition_is_invalid() {
        let def: Definition<()> = Definition::new();
        assert!(matches!(def.check(), Err(BuildError::NoStates)));
    }

    #[test]
    fn string_shorthand_builds_bare_transition() {
        let t: TransitionDef<()> = "review".into();
        assert_eq!(t.next_state(), Some("review"));
        assert!(t.predicate().is_none());
        assert!(!t.re_entry());
    }
}
