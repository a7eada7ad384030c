//! Transition hooks: predicates, effects and entry hooks.
//!
//! Hooks are asynchronous closures bound to the machine's target object.
//! Every invocation receives a [`HookContext`] carrying the target, a handle
//! to the machine (so an entry hook can trigger the next transition), and the
//! forked diagnostic scope the hook runs in.

use crate::context::{Context, Scope};
use crate::effects::Machine;
use crate::logging::Logger;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

/// Everything a hook invocation can see.
pub struct HookContext<C> {
    target: Arc<C>,
    machine: Machine<C>,
    scope: Scope,
    transition: String,
    state: String,
}

impl<C> Clone for HookContext<C> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            machine: self.machine.clone(),
            scope: self.scope.clone(),
            transition: self.transition.clone(),
            state: self.state.clone(),
        }
    }
}

impl<C> HookContext<C> {
    pub(crate) fn new(
        target: Arc<C>,
        machine: Machine<C>,
        scope: Scope,
        transition: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            target,
            machine,
            scope,
            transition: transition.into(),
            state: state.into(),
        }
    }

    /// The object hooks are bound to.
    pub fn target(&self) -> &Arc<C> {
        &self.target
    }

    pub fn machine(&self) -> &Machine<C> {
        &self.machine
    }

    pub fn logger(&self) -> &Logger {
        self.scope.logger()
    }

    pub fn context(&self) -> &Context {
        self.scope.context()
    }

    /// Name of the transition being executed.
    pub fn transition(&self) -> &str {
        &self.transition
    }

    /// For predicates and effects, the state being left; for entry hooks,
    /// the state being entered.
    pub fn state(&self) -> &str {
        &self.state
    }
}

type HookFn<C, T> = dyn Fn(HookContext<C>) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync;

/// A side-effecting hook, used for transition effects and entry hooks.
pub struct Hook<C> {
    run: Arc<HookFn<C, ()>>,
}

impl<C> Clone for Hook<C> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<C: Send + Sync + 'static> Hook<C> {
    /// Create a hook from an async closure.
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(HookContext<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let run: Arc<HookFn<C, ()>> = Arc::new(move |ctx: HookContext<C>| hook(ctx).boxed());
        Self { run }
    }

    /// Create a hook from a synchronous closure.
    pub fn sync<F>(hook: F) -> Self
    where
        F: Fn(&HookContext<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let hook = Arc::new(hook);
        Self::new(move |ctx| {
            let hook = Arc::clone(&hook);
            async move { hook(&ctx) }
        })
    }

    pub fn run(&self, ctx: HookContext<C>) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.run)(ctx)
    }
}

/// A transition guard. `Ok(false)` blocks the transition; an error
/// propagates to the caller.
pub struct Predicate<C> {
    check: Arc<HookFn<C, bool>>,
}

impl<C> Clone for Predicate<C> {
    fn clone(&self) -> Self {
        Self {
            check: Arc::clone(&self.check),
        }
    }
}

impl<C: Send + Sync + 'static> Predicate<C> {
    /// Create a predicate from an async closure.
    pub fn new<F, Fut>(check: F) -> Self
    where
        F: Fn(HookContext<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        let check: Arc<HookFn<C, bool>> =
            Arc::new(move |ctx: HookContext<C>| check(ctx).boxed());
        Self { check }
    }

    /// Create a predicate from a pure function of the target.
    pub fn when<F>(check: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        let check = Arc::new(check);
        Self::new(move |ctx| {
            let check = Arc::clone(&check);
            async move { Ok(check(ctx.target().as_ref())) }
        })
    }

    pub fn check(&self, ctx: HookContext<C>) -> BoxFuture<'static, anyhow::Result<bool>> {
        (self.check)(ctx)
    }
}
