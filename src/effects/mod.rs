//! Executing state machines.
//!
//! This module provides the runtime around the definitions in
//! [`crate::core`]: machine instances, the transition protocol, one-time
//! enhancement, and the errors transitions report.
//!
//! # Key Concepts
//!
//! - **Factory**: binds a validated definition and a name, and creates
//!   instances bound to a target object
//! - **Machine**: runs transitions through predicate, effect and entry hooks,
//!   each inside its own forked diagnostic context
//! - **Enhancement**: a second definition merged in once, before the next
//!   transition runs

mod machine;
mod transition;

pub(crate) use machine::Status;
pub use machine::{Machine, MachineFactory};
pub use transition::{ErrorKind, HookPhase, MachineError, TransitionNotice};
