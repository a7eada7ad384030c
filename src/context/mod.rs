//! Execution context tree.
//!
//! A [`Context`] is an immutable node carrying a property bag, a causal
//! trail, an optional facility binding and optional level overrides. New
//! nodes are made by forking; lookups walk toward the root.
//!
//! Work is attributed to a node in two ways:
//!
//! - explicitly, by passing the [`Context`] or a [`Scope`] to the code that
//!   needs it
//! - ambiently, by wrapping a future in [`ApplyContext`], which makes the
//!   node visible through [`Context::current`] while the future is polled
//!
//! [`Context::fork_with_context`] and [`Scope::run`] combine the two: fork a
//! labelled node, bind its logger, run a task inside it, and turn any failure
//! into a logged [`ContextualError`].

mod apply;
mod node;
mod scope;

pub use apply::{ambient, with_context, ApplyContext};
pub use node::{CausalEntry, Context, ForkOptions, Settings};
pub use scope::{ContextualError, Scope};

impl Context {
    /// The ambient node of the running task, or the process root.
    pub fn current() -> Context {
        ambient().unwrap_or_else(|| crate::runtime::root().clone())
    }

    /// Wrap `future` so this node is ambient while it runs.
    pub fn in_scope<F: std::future::Future>(&self, future: F) -> ApplyContext<F> {
        ApplyContext::new(self.clone(), future)
    }
}
