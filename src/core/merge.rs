//! Overlaying an enhancement definition onto a base definition.
//!
//! Merging is a pure function over two definitions; neither input is
//! modified. States and transitions found only in the enhancement are added
//! as they are. Where both sides define the same piece, the hooks are
//! composed with the base taking priority, and an enhancement may never
//! redirect a transition the base already points somewhere else.

use super::definition::{Definition, StateDef, TransitionDef};
use super::hook::{Hook, Predicate};
use crate::effects::MachineError;
use crate::logging::Fields;
use serde_json::json;

/// Merge `enhancement` onto `base`, producing a new definition.
pub fn merge<C>(base: &Definition<C>, enhancement: &Definition<C>) -> Result<Definition<C>, MachineError>
where
    C: Send + Sync + 'static,
{
    let mut merged = base.clone();

    for (name, extra) in &enhancement.states {
        let state = match base.states.get(name) {
            Some(existing) => merge_state(name, existing, extra)?,
            None => extra.clone(),
        };
        merged.states.insert(name.clone(), state);
    }

    merged.default_state()?;
    Ok(merged)
}

fn merge_state<C>(name: &str, base: &StateDef<C>, extra: &StateDef<C>) -> Result<StateDef<C>, MachineError>
where
    C: Send + Sync + 'static,
{
    let mut state = base.clone();
    state.default = base.default || extra.default;
    state.label = base.label.clone().or_else(|| extra.label.clone());
    state.on_entry = match (&base.on_entry, &extra.on_entry) {
        (Some(first), Some(second)) => Some(compose_entry(first.clone(), second.clone())),
        (first, second) => first.clone().or_else(|| second.clone()),
    };

    for (transition, added) in &extra.transitions {
        let combined = match base.transitions.get(transition) {
            Some(existing) => merge_transition(name, transition, existing, added)?,
            None => added.clone(),
        };
        state.transitions.insert(transition.clone(), combined);
    }
    Ok(state)
}

fn merge_transition<C>(
    state: &str,
    transition: &str,
    base: &TransitionDef<C>,
    extra: &TransitionDef<C>,
) -> Result<TransitionDef<C>, MachineError>
where
    C: Send + Sync + 'static,
{
    if let (Some(from_base), Some(from_extra)) = (&base.next_state, &extra.next_state) {
        if from_base != from_extra {
            return Err(MachineError::MergeConflict {
                state: state.to_string(),
                transition: transition.to_string(),
                base: from_base.clone(),
                enhancement: from_extra.clone(),
            });
        }
    }

    Ok(TransitionDef {
        next_state: base.next_state.clone().or_else(|| extra.next_state.clone()),
        predicate: match (&base.predicate, &extra.predicate) {
            (Some(first), Some(second)) => Some(compose_predicate(first.clone(), second.clone())),
            (first, second) => first.clone().or_else(|| second.clone()),
        },
        effect: match (&base.effect, &extra.effect) {
            (Some(first), Some(second)) => Some(compose_effect(first.clone(), second.clone())),
            (first, second) => first.clone().or_else(|| second.clone()),
        },
        re_entry: base.re_entry || extra.re_entry,
    })
}

/// Base entry hook first; the second is skipped if the first moved the
/// machine on.
fn compose_entry<C: Send + Sync + 'static>(first: Hook<C>, second: Hook<C>) -> Hook<C> {
    Hook::new(move |ctx| {
        let (first, second) = (first.clone(), second.clone());
        async move {
            let generation = ctx.machine().generation();
            first.run(ctx.clone()).await?;
            if ctx.machine().generation() != generation {
                ctx.logger().debug(format_args!(
                    "state {} left during its entry hook; skipping enhancement entry hook",
                    ctx.state()
                ));
                return Ok(());
            }
            second.run(ctx).await
        }
    })
}

/// Short-circuit AND, base first.
fn compose_predicate<C: Send + Sync + 'static>(first: Predicate<C>, second: Predicate<C>) -> Predicate<C> {
    Predicate::new(move |ctx| {
        let (first, second) = (first.clone(), second.clone());
        async move {
            if !first.check(ctx.clone()).await? {
                return Ok(false);
            }
            second.check(ctx).await
        }
    })
}

/// Both effects run; a failing base effect is logged and does not stop the
/// enhancement effect.
fn compose_effect<C: Send + Sync + 'static>(first: Hook<C>, second: Hook<C>) -> Hook<C> {
    Hook::new(move |ctx| {
        let (first, second) = (first.clone(), second.clone());
        async move {
            if let Err(error) = first.run(ctx.clone()).await {
                let cause = format!("{error:#}");
                let transition = ctx.transition().to_string();
                ctx.logger().warn_with(
                    Fields::new()
                        .summary("base effect failed")
                        .detail(move || json!({ "transition": transition, "error": cause })),
                    format_args!("base effect for {} failed: {error:#}", ctx.transition()),
                );
            }
            second.run(ctx).await
        }
    })
}
