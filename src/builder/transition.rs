//! Builder for constructing transitions.

use crate::core::{Hook, HookContext, Predicate, TransitionDef};
use std::future::Future;

/// Builder for one transition with a fluent API.
pub struct TransitionBuilder<C> {
    def: TransitionDef<C>,
}

impl<C: Send + Sync + 'static> TransitionBuilder<C> {
    /// Create a new transition builder.
    pub fn new() -> Self {
        Self {
            def: TransitionDef::default(),
        }
    }

    /// Set the target state (required).
    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.def.next_state = Some(state.into());
        self
    }

    /// Guard with a pure function of the target object.
    pub fn when<F>(mut self, check: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.def.predicate = Some(Predicate::when(check));
        self
    }

    /// Guard with an async predicate.
    pub fn when_async<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn(HookContext<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.def.predicate = Some(Predicate::new(check));
        self
    }

    pub fn predicate(mut self, predicate: Predicate<C>) -> Self {
        self.def.predicate = Some(predicate);
        self
    }

    /// Run `effect` after the state has changed.
    pub fn effect<F, Fut>(mut self, effect: F) -> Self
    where
        F: Fn(HookContext<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.def.effect = Some(Hook::new(effect));
        self
    }

    pub fn effect_sync<F>(mut self, effect: F) -> Self
    where
        F: Fn(&HookContext<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.def.effect = Some(Hook::sync(effect));
        self
    }

    /// Run the target's entry hook even when the transition loops back to
    /// the current state.
    pub fn re_entry(mut self) -> Self {
        self.def.re_entry = true;
        self
    }

    /// Finish the transition. A missing target is reported when the
    /// enclosing definition is built.
    pub fn build(self) -> TransitionDef<C> {
        self.def
    }
}

impl<C: Send + Sync + 'static> Default for TransitionBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Account {
        balance: i64,
    }

    #[test]
    fn fluent_api_builds_transition() {
        let transition = TransitionBuilder::<Account>::new()
            .to("closed")
            .when(|account| account.balance == 0)
            .effect_sync(|_| Ok(()))
            .re_entry()
            .build();

        assert_eq!(transition.next_state(), Some("closed"));
        assert!(transition.predicate().is_some());
        assert!(transition.effect().is_some());
        assert!(transition.re_entry());
    }

    #[test]
    fn target_is_optional_at_build() {
        let transition = TransitionBuilder::<Account>::new().build();
        assert!(transition.next_state().is_none());
        assert!(!transition.re_entry());
    }
}
