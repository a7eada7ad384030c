//! Builder for constructing states.

use crate::builder::transition::TransitionBuilder;
use crate::core::{Hook, HookContext, StateDef, TransitionDef};
use std::future::Future;

/// Builder for one state with a fluent API.
pub struct StateBuilder<C> {
    def: StateDef<C>,
}

impl<C: Send + Sync + 'static> StateBuilder<C> {
    pub fn new() -> Self {
        Self {
            def: StateDef::default(),
        }
    }

    /// Make this the state new machines start in.
    pub fn default_state(mut self) -> Self {
        self.def.default = true;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.def.label = Some(label.into());
        self
    }

    /// Run `hook` whenever the state is entered.
    pub fn on_entry<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(HookContext<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.def.on_entry = Some(Hook::new(hook));
        self
    }

    pub fn on_entry_sync<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HookContext<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.def.on_entry = Some(Hook::sync(hook));
        self
    }

    /// Add a transition configured by `configure`.
    pub fn transition<F>(mut self, name: impl Into<String>, configure: F) -> Self
    where
        F: FnOnce(TransitionBuilder<C>) -> TransitionBuilder<C>,
    {
        let transition = configure(TransitionBuilder::new()).build();
        self.def.transitions.insert(name.into(), transition);
        self
    }

    /// Add a bare transition to `next_state`.
    pub fn to(mut self, name: impl Into<String>, next_state: impl Into<String>) -> Self {
        self.def
            .transitions
            .insert(name.into(), TransitionDef::to(next_state));
        self
    }

    pub fn build(self) -> StateDef<C> {
        self.def
    }
}

impl<C: Send + Sync + 'static> Default for StateBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_collects_transitions() {
        let state = StateBuilder::<()>::new()
            .default_state()
            .label("Draft")
            .on_entry_sync(|_| Ok(()))
            .to("submit", "review")
            .transition("discard", |t| t.to("trash").re_entry())
            .build();

        assert!(state.is_default());
        assert_eq!(state.label(), Some("Draft"));
        assert!(state.on_entry().is_some());
        assert_eq!(state.transition_names(), vec!["discard", "submit"]);
        assert!(state.transition("discard").unwrap().re_entry());
    }

    #[test]
    fn empty_state_is_terminal() {
        assert!(StateBuilder::<()>::new().build().is_terminal());
    }
}
