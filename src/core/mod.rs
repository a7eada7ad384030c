//! Core state machine types.
//!
//! This module contains the data side of the engine:
//! - Definitions of states and transitions
//! - Hooks bound to the machine's target object
//! - Immutable history tracking
//! - The enhancement merge
//!
//! Nothing here executes a transition; that lives in [`crate::effects`].

mod definition;
mod history;
mod hook;
mod merge;

pub(crate) use definition::into_result;
pub use definition::{Definition, StateDef, TransitionDef, DEFAULT_TRANSITION};
pub use history::{History, TransitionRecord};
pub use hook::{Hook, HookContext, Predicate};
pub use merge::merge;
