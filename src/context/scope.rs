//! Forking a context and running work inside it.

use super::apply::ApplyContext;
use super::node::{Context, ForkOptions};
use crate::logging::{audit, Fields, Logger};
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use thiserror::Error;

/// A failure from work run inside a [`Scope`], carrying the causal trail it
/// happened under.
///
/// The wrapped [`anyhow::Error`] keeps the original error chain and, when
/// enabled through `RUST_BACKTRACE`, the backtrace.
#[derive(Debug, Error)]
#[error("{error:#} [{}]", .context.join(" > "))]
pub struct ContextualError {
    error: anyhow::Error,
    context: Vec<String>,
}

impl ContextualError {
    pub fn new(error: anyhow::Error, context: Vec<String>) -> Self {
        Self { error, context }
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    /// Causal labels active when the failure happened, outermost first.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    pub fn into_error(self) -> anyhow::Error {
        self.error
    }
}

/// A forked node together with the logger bound to it.
#[derive(Debug, Clone)]
pub struct Scope {
    context: Context,
    logger: Logger,
}

impl Context {
    /// Fork a child labelled `label` and bind its logger.
    ///
    /// When `options` carries level overrides, the override decisions are
    /// written to the audit trail here, once, rather than on every logger
    /// creation.
    pub fn fork_with_context(&self, label: impl Into<String>, options: ForkOptions) -> Scope {
        let label = label.into();
        let overrides = options.overrides().cloned();
        let context = self.fork(label.clone(), options.label(label));
        if let Some(overrides) = overrides {
            audit::report(&context, &overrides);
        }
        let logger = context.logger();
        Scope { context, logger }
    }
}

impl Scope {
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn into_parts(self) -> (Context, Logger) {
        (self.context, self.logger)
    }

    /// Run `task` inside this scope.
    ///
    /// The task receives the scope and its node is ambient while it is
    /// polled. Errors and panics are normalized into a [`ContextualError`],
    /// logged at `warn` with the causal trail, and returned.
    pub async fn run<T, E, F, Fut>(&self, task: F) -> Result<T, ContextualError>
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        self.run_quiet(task).await.map_err(|failure| self.report(failure))
    }

    /// Like [`Scope::run`], but the failure is returned without being
    /// logged, for callers that surface it themselves.
    pub async fn run_quiet<T, E, F, Fut>(&self, task: F) -> Result<T, ContextualError>
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        let future = ApplyContext::new(self.context.clone(), task(self.clone()));
        let error = match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => error.into(),
            Err(panic) => anyhow::anyhow!("task panicked: {}", panic_message(panic.as_ref())),
        };
        Err(ContextualError::new(error, self.context.causal_labels()))
    }

    /// Like [`Scope::run`], but a failure becomes `None` after being logged.
    pub async fn run_guarded<T, E, F, Fut>(&self, task: F) -> Option<T>
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        self.run(task).await.ok()
    }

    /// Log `failure` at `warn` with its causal trail.
    pub fn report(&self, failure: ContextualError) -> ContextualError {
        let trail = failure.context().to_vec();
        let cause = format!("{:#}", failure.error());
        self.logger.warn_with(
            Fields::new()
                .summary(format!("failed in {}", self.context.name()))
                .detail(move || json!({ "context": trail, "error": cause })),
            format_args!("unhandled failure: {:#}", failure.error()),
        );
        failure
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
