//! State machine that executes asynchronous, hooked transitions.

use crate::context::{ambient, Context, ForkOptions, Scope};
use crate::core::{merge, Definition, History, HookContext, TransitionRecord, DEFAULT_TRANSITION};
use crate::effects::transition::{HookPhase, MachineError, TransitionNotice};
use crate::logging::{Fields, Logger};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use futures::lock::Mutex as AsyncMutex;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

type IntegrationFn =
    dyn Fn(TransitionNotice) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

type PendingEnhancement<C> = BoxFuture<'static, anyhow::Result<Definition<C>>>;

/// Context property marking work that runs inside a transition of one
/// machine instance.
fn transition_marker(instance: Uuid) -> String {
    format!("strand.transition.{instance}")
}

/// Binds a validated definition and a name, and creates machine instances.
pub struct MachineFactory<C> {
    name: String,
    definition: Arc<Definition<C>>,
    default_state: String,
    integration: Option<Arc<IntegrationFn>>,
}

impl<C> Clone for MachineFactory<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            definition: Arc::clone(&self.definition),
            default_state: self.default_state.clone(),
            integration: self.integration.clone(),
        }
    }
}

impl<C: Send + Sync + 'static> MachineFactory<C> {
    /// Validate `definition` and bind it to `name`.
    pub fn new(name: impl Into<String>, definition: Definition<C>) -> Result<Self, MachineError> {
        definition.check()?;
        let default_state = definition.default_state()?.to_string();
        Ok(Self {
            name: name.into(),
            definition: Arc::new(definition),
            default_state,
            integration: None,
        })
    }

    /// Register the integration hook, called after every completed
    /// transition that was not superseded by a nested one.
    pub fn on_transition<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(TransitionNotice) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let hook: Arc<IntegrationFn> = Arc::new(move |notice| hook(notice).boxed());
        self.integration = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &Definition<C> {
        &self.definition
    }

    pub fn default_state(&self) -> &str {
        &self.default_state
    }

    /// Create an instance bound to `target`, attributed to the current
    /// context.
    pub fn instantiate(&self, target: C) -> Machine<C> {
        self.instantiate_in(target, &Context::current())
    }

    /// Create an instance bound to `target`, attributed to `context` when a
    /// transition is called outside any ambient context.
    pub fn instantiate_in(&self, target: C, context: &Context) -> Machine<C> {
        let status = Status {
            current: self.default_state.clone(),
            started: false,
            history: History::new(),
        };
        Machine::assemble(self, Uuid::new_v4(), Arc::new(target), context.clone(), status, 0, Utc::now())
    }
}

pub(crate) struct Status {
    pub(crate) current: String,
    pub(crate) started: bool,
    pub(crate) history: History,
}

struct Enhancement<C> {
    triggered: AtomicBool,
    pending: Mutex<Option<PendingEnhancement<C>>>,
    gate: AsyncMutex<()>,
}

struct MachineInner<C> {
    id: Uuid,
    name: String,
    created: DateTime<Utc>,
    target: Arc<C>,
    home: Context,
    default_state: String,
    definition: RwLock<Arc<Definition<C>>>,
    status: RwLock<Status>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    integration: Option<Arc<IntegrationFn>>,
    enhancement: Enhancement<C>,
}

/// A running state machine instance.
///
/// Cloning produces another handle to the same instance.
///
/// Transitions against one instance are expected to be issued by a single
/// writer at a time. The engine does not queue overlapping calls; when a
/// transition starts while another top-level transition is still running, a
/// warning is logged and both proceed.
///
/// # Example
///
/// ```rust
/// use strand::builder::DefinitionBuilder;
/// use strand::effects::MachineFactory;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let definition = DefinitionBuilder::<()>::new()
///     .state("draft", |s| s.default_state().transition("submit", |t| t.to("review")))
///     .state("review", |s| s)
///     .build()
///     .unwrap();
///
/// let machine = MachineFactory::new("document", definition).unwrap().instantiate(());
/// machine.transition("default").await.unwrap();
/// machine.transition("submit").await.unwrap();
/// assert_eq!(machine.current_state(), "review");
/// assert!(machine.is_terminal());
/// # }
/// ```
pub struct Machine<C> {
    inner: Arc<MachineInner<C>>,
}

impl<C> Clone for Machine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> std::fmt::Debug for Machine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.inner.status.read();
        f.debug_struct("Machine")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("current", &status.current)
            .field("generation", &self.generation())
            .finish()
    }
}

impl<C> Machine<C> {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn instance_id(&self) -> Uuid {
        self.inner.id
    }

    pub fn target(&self) -> &Arc<C> {
        &self.inner.target
    }

    pub fn current_state(&self) -> String {
        self.inner.status.read().current.clone()
    }

    /// Number of state changes and re-entries so far, including the startup
    /// transition.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Whether the startup `default` transition has run.
    pub fn has_started(&self) -> bool {
        self.inner.status.read().started
    }

    pub fn default_state(&self) -> &str {
        &self.inner.default_state
    }

    pub fn history(&self) -> History {
        self.inner.status.read().history.clone()
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.inner.created
    }

    /// The definition currently in force.
    pub fn definition(&self) -> Arc<Definition<C>> {
        Arc::clone(&self.inner.definition.read())
    }

    /// Transition names available from the current state.
    pub fn valid_transitions(&self) -> Vec<String> {
        let current = self.current_state();
        self.definition()
            .state(&current)
            .map(|state| state.transition_names().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Display label of the current state, falling back to its name.
    pub fn label(&self) -> String {
        let current = self.current_state();
        self.definition()
            .state(&current)
            .and_then(|state| state.label().map(str::to_string))
            .unwrap_or(current)
    }

    pub fn is_terminal(&self) -> bool {
        let current = self.current_state();
        self.definition()
            .state(&current)
            .is_some_and(|state| state.is_terminal())
    }

    pub(crate) fn status(&self) -> parking_lot::RwLockReadGuard<'_, Status> {
        self.inner.status.read()
    }
}

impl<C: Send + Sync + 'static> Machine<C> {
    pub(crate) fn assemble(
        factory: &MachineFactory<C>,
        id: Uuid,
        target: Arc<C>,
        home: Context,
        status: Status,
        generation: u64,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            inner: Arc::new(MachineInner {
                id,
                name: factory.name.clone(),
                created,
                target,
                home,
                default_state: factory.default_state.clone(),
                definition: RwLock::new(Arc::clone(&factory.definition)),
                status: RwLock::new(status),
                generation: AtomicU64::new(generation),
                in_flight: AtomicUsize::new(0),
                integration: factory.integration.clone(),
                enhancement: Enhancement {
                    triggered: AtomicBool::new(false),
                    pending: Mutex::new(None),
                    gate: AsyncMutex::new(()),
                },
            }),
        }
    }

    /// Schedule a one-time enhancement. The definition produced by `source`
    /// is merged in before the next transition runs.
    pub fn enhance<F>(&self, source: F) -> Result<(), MachineError>
    where
        F: Future<Output = anyhow::Result<Definition<C>>> + Send + 'static,
    {
        if self.inner.enhancement.triggered.swap(true, Ordering::SeqCst) {
            return Err(MachineError::EnhancementAlreadyTriggered {
                machine: self.inner.name.clone(),
            });
        }
        *self.inner.enhancement.pending.lock() = Some(source.boxed());
        Ok(())
    }

    /// [`Machine::enhance`] with a definition that is already available.
    pub fn enhance_with(&self, definition: Definition<C>) -> Result<(), MachineError> {
        self.enhance(async move { Ok(definition) })
    }

    pub fn is_enhanced(&self) -> bool {
        self.inner.enhancement.triggered.load(Ordering::SeqCst)
            && self.inner.enhancement.pending.lock().is_none()
    }

    /// Wait for a scheduled enhancement and apply it.
    ///
    /// The caller that applies the enhancement receives its failure; the
    /// base definition then stays in force for everyone.
    pub async fn ready(&self) -> Result<(), MachineError> {
        if self.inner.enhancement.pending.lock().is_none() {
            return Ok(());
        }
        let _gate = self.inner.enhancement.gate.lock().await;
        let pending = self.inner.enhancement.pending.lock().take();
        let Some(source) = pending else {
            return Ok(());
        };

        let logger = self.home_logger();
        let applied = match source.await {
            Ok(enhancement) => self.apply_enhancement(&enhancement),
            Err(source) => Err(MachineError::Enhancement {
                machine: self.inner.name.clone(),
                source,
            }),
        };
        match &applied {
            Ok(()) => logger.info(format_args!("machine {} enhanced", self.inner.name)),
            Err(error) => {
                let cause = error.to_string();
                logger.warn_with(
                    Fields::new()
                        .summary("enhancement rejected")
                        .detail(move || json!({ "error": cause })),
                    format_args!("enhancement of {} failed: {error}", self.inner.name),
                );
            }
        }
        applied
    }

    fn apply_enhancement(&self, enhancement: &Definition<C>) -> Result<(), MachineError> {
        let merged = merge(&self.definition(), enhancement)?;
        let current = self.current_state();
        if !merged.contains(&current) {
            return Err(MachineError::Configuration {
                machine: self.inner.name.clone(),
                message: format!("current state '{current}' is missing from the enhanced definition"),
            });
        }
        *self.inner.definition.write() = Arc::new(merged);
        Ok(())
    }

    /// Execute the transition `name` from the current state.
    pub async fn transition(&self, name: &str) -> Result<(), MachineError> {
        self.ready().await?;

        let marker = transition_marker(self.inner.id);
        let parent = ambient().unwrap_or_else(|| self.inner.home.clone());
        let nested = parent.get(&marker).is_some();
        let scope = parent.fork_with_context(
            format!("{}.{name}", self.inner.name),
            ForkOptions::new()
                .facility(self.inner.name.clone())
                .property(marker, true),
        );

        let flight = InFlight::enter(&self.inner.in_flight);
        if !nested && flight.overlapping {
            scope.logger().warn(format_args!(
                "transition {name} of {} started while another transition is still running",
                self.inner.name
            ));
        }

        self.execute(name, &scope).await
    }

    /// Like [`Machine::transition`], but a blocked or invalid transition
    /// yields `Ok(false)` instead of an error.
    pub async fn optional_transition(&self, name: &str) -> Result<bool, MachineError> {
        match self.transition(name).await {
            Ok(()) => Ok(true),
            Err(error) if error.is_expected() => Ok(false),
            Err(error) => Err(error),
        }
    }

    async fn execute(&self, name: &str, scope: &Scope) -> Result<(), MachineError> {
        let logger = scope.logger();
        let machine = self.inner.name.as_str();
        let definition = self.definition();
        let (from, started) = {
            let status = self.inner.status.read();
            (status.current.clone(), status.started)
        };

        if name == DEFAULT_TRANSITION && !started && from == self.inner.default_state {
            let generation = {
                let mut status = self.inner.status.write();
                status.started = true;
                self.commit(&mut status, name, &from, &from)
            };
            logger.debug(format_args!("{machine} starting in {from} at generation {generation}"));
            self.enter(&definition, &from, name, scope).await;
            return Ok(());
        }

        if !started && name != DEFAULT_TRANSITION {
            return Err(self.invalid(&from, name, "the machine has not run its default transition yet"));
        }

        let Some(state) = definition.state(&from) else {
            return Err(self.invalid(
                &from,
                name,
                format!("state '{from}' is not part of the active definition"),
            ));
        };
        let Some(transition) = state.transition(name) else {
            let reason = if state.is_terminal() {
                format!("state '{from}' is terminal")
            } else {
                format!("valid transitions are: {}", state.transition_names().join(", "))
            };
            return Err(self.invalid(&from, name, reason));
        };
        let Some(next) = transition.next_state() else {
            return Err(MachineError::Configuration {
                machine: machine.to_string(),
                message: format!("transition '{name}' of state '{from}' has no next state"),
            });
        };
        if !definition.contains(next) {
            return Err(self.invalid(&from, name, format!("target state '{next}' does not exist")));
        }

        if let Some(predicate) = transition.predicate() {
            let hook = self.hook_scope(scope, HookPhase::Predicate, name);
            let ctx = self.hook_context(hook.clone(), name, &from);
            let passed = hook
                .run_quiet(|_| predicate.check(ctx))
                .await
                .map_err(|source| MachineError::Hook {
                    phase: HookPhase::Predicate,
                    transition: name.to_string(),
                    source,
                })?;
            if !passed {
                logger.debug(format_args!("{name} blocked in {from}"));
                return Err(MachineError::UnmetPredicate {
                    machine: machine.to_string(),
                    state: from,
                    transition: name.to_string(),
                });
            }
        }

        let generation = self.advance(name, &from, next);
        logger.info_with(
            Fields::new().detail_value(json!({
                "transition": name,
                "from": from,
                "to": next,
                "generation": generation,
            })),
            format_args!("{machine}: {from} -> {next} via {name}"),
        );

        if let Some(effect) = transition.effect() {
            let hook = self.hook_scope(scope, HookPhase::Effect, name);
            let ctx = self.hook_context(hook.clone(), name, &from);
            hook.run(|_| effect.run(ctx))
                .await
                .map_err(|source| MachineError::Hook {
                    phase: HookPhase::Effect,
                    transition: name.to_string(),
                    source,
                })?;
        }

        if from != next || transition.re_entry() {
            self.enter(&definition, next, name, scope).await;
        }

        if self.generation() != generation {
            logger.debug(format_args!(
                "{machine} moved on during entry to {next}; leaving notification to the later transition"
            ));
            return Ok(());
        }

        match &self.inner.integration {
            Some(integration) => {
                let notice = TransitionNotice {
                    machine: machine.to_string(),
                    transition: name.to_string(),
                    current_state: self.current_state(),
                    from_state: from,
                    generation,
                    logger: logger.clone(),
                };
                integration(notice)
                    .await
                    .map_err(|source| MachineError::Integration {
                        machine: machine.to_string(),
                        transition: name.to_string(),
                        source,
                    })
            }
            None => Ok(()),
        }
    }

    /// Move to `next`, returning the new generation.
    fn advance(&self, transition: &str, from: &str, next: &str) -> u64 {
        let mut status = self.inner.status.write();
        self.commit(&mut status, transition, from, next)
    }

    /// Bump the generation and record the move while `status` is held.
    fn commit(&self, status: &mut Status, transition: &str, from: &str, next: &str) -> u64 {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        status.current = next.to_string();
        status.history = status.history.record(TransitionRecord {
            transition: transition.to_string(),
            from: from.to_string(),
            to: next.to_string(),
            generation,
            timestamp: Utc::now(),
        });
        generation
    }

    /// Run the entry hook of `state`, if any. Failures are logged and
    /// swallowed.
    async fn enter(&self, definition: &Definition<C>, state: &str, transition: &str, scope: &Scope) {
        let Some(on_entry) = definition.state(state).and_then(|s| s.on_entry()) else {
            return;
        };
        let hook = self.hook_scope(scope, HookPhase::Entry, state);
        let ctx = self.hook_context(hook.clone(), transition, state);
        hook.run_guarded(|_| on_entry.run(ctx)).await;
    }

    fn hook_scope(&self, scope: &Scope, phase: HookPhase, subject: &str) -> Scope {
        scope
            .context()
            .fork_with_context(format!("{phase} {subject}"), ForkOptions::new().chained())
    }

    fn hook_context(&self, scope: Scope, transition: &str, state: &str) -> HookContext<C> {
        HookContext::new(
            Arc::clone(&self.inner.target),
            self.clone(),
            scope,
            transition,
            state,
        )
    }

    fn invalid(&self, state: &str, transition: &str, reason: impl Into<String>) -> MachineError {
        MachineError::InvalidTransition {
            machine: self.inner.name.clone(),
            state: state.to_string(),
            transition: transition.to_string(),
            reason: reason.into(),
        }
    }

    fn home_logger(&self) -> Logger {
        let parent = ambient().unwrap_or_else(|| self.inner.home.clone());
        Logger::bind(self.inner.name.clone(), parent)
    }
}

/// Counts running top-level and nested transitions of one instance.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
    overlapping: bool,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let before = counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter,
            overlapping: before > 0,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
