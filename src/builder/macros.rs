//! Macros for compact definition construction.

/// Declare states and bare transitions in one block.
///
/// Expands to a [`DefinitionBuilder`](crate::builder::DefinitionBuilder), so
/// hooks can still be attached with `add_state` before calling `build`.
/// `#[default_state]` marks the starting state.
///
/// # Example
///
/// ```
/// use strand::core::Definition;
/// use strand::definition;
///
/// let definition: Definition<()> = definition! {
///     #[default_state]
///     draft => { submit => "review" },
///     review => { approve => "done", reject => "draft" },
///     done => {},
/// }
/// .build()
/// .unwrap();
///
/// assert_eq!(definition.default_state().unwrap(), "draft");
/// assert!(definition.state("done").unwrap().is_terminal());
/// ```
#[macro_export]
macro_rules! definition {
    (
        $(
            $(#[$flag:ident])*
            $state:ident => { $($transition:ident => $next:expr),* $(,)? }
        ),* $(,)?
    ) => {
        $crate::builder::DefinitionBuilder::new()
            $(
                .state(stringify!($state), |state| {
                    state
                        $(.$flag())*
                        $(.to(stringify!($transition), $next))*
                })
            )*
    };
}

#[cfg(test)]
mod tests {
    use crate::builder::BuildError;
    use crate::core::Definition;

    #[test]
    fn definition_macro_builds_states() {
        let definition: Definition<()> = definition! {
            #[default_state]
            idle => { start => "running" },
            running => { pause => "idle", finish => "done" },
            done => {},
        }
        .build()
        .unwrap();

        assert_eq!(definition.state_names(), vec!["done", "idle", "running"]);
        assert_eq!(
            definition.state("running").unwrap().transition("pause").unwrap().next_state(),
            Some("idle")
        );
    }

    #[test]
    fn definition_macro_still_validates() {
        let result = definition! {
            idle => { start => "running" },
            running => {},
        }
        .build();

        let result: Result<Definition<()>, _> = result;
        assert!(matches!(result, Err(BuildError::NoDefaultState)));
    }
}
