//! Strand: context-propagating structured logging and an asynchronous state
//! machine engine.
//!
//! Strand has two halves that share one context tree:
//!
//! - **Logging**: every log statement carries the causal trail of the work
//!   that produced it. Contexts are forked per unit of work, can carry level
//!   overrides that make one subsystem more verbose for a while, and are
//!   visible ambiently to everything the work awaits.
//! - **State machines**: declarative definitions of states and named
//!   transitions with async predicates, effects and entry hooks, plus a
//!   one-time enhancement that merges a second definition into a running
//!   instance. Each transition and hook runs in its own forked context, so its
//!   logs say which transition they belong to.
//!
//! # Core Concepts
//!
//! - **Context**: an immutable node in the context tree ([`context`])
//! - **Logger**: a per-facility handle whose level is resolved from the global
//!   floor and every override above it ([`logging`])
//! - **Definition**: states, transitions and hooks as plain data ([`core`])
//! - **Machine**: a running instance of a definition ([`effects`])
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strand::builder::DefinitionBuilder;
//! use strand::context::{Context, ForkOptions, Settings};
//! use strand::logging::{BaseLevels, Level, LevelOverrides, MemorySink, Profile};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sink = Arc::new(MemorySink::new());
//! let root = Context::root("app", Settings::new(BaseLevels::default(), Profile::Development, sink.clone()));
//!
//! let factory = DefinitionBuilder::<()>::new()
//!     .state("draft", |s| s.default_state().to("submit", "review"))
//!     .state("review", |s| s)
//!     .machine("document")
//!     .unwrap();
//!
//! let request = root.fork_with_context(
//!     "request 42",
//!     ForkOptions::new().levels(LevelOverrides::new().set("document", Level::Info)),
//! );
//! let machine = factory.instantiate_in((), request.context());
//! machine.transition("default").await.unwrap();
//! machine.transition("submit").await.unwrap();
//!
//! let records = sink.matching("draft -> review");
//! assert_eq!(records[0].context, vec!["request 42", "document.submit"]);
//! # }
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod core;
pub mod effects;
pub mod logging;
pub mod runtime;

// Re-export commonly used types
pub use builder::{BuildError, DefinitionBuilder};
pub use checkpoint::{CheckpointError, Snapshot};
pub use config::LogConfig;
pub use context::{Context, ContextualError, ForkOptions, Scope};
pub use crate::core::{Definition, HookContext};
pub use effects::{ErrorKind, Machine, MachineError, MachineFactory};
pub use logging::{Fields, Level, Logger};
pub use runtime::{init, init_with_sink, root};
