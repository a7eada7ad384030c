//! Per-facility logging handles.

use super::level::Level;
use super::record::LogRecord;
use super::resolver::resolve;
use super::sink::{deliver, fallback};
use crate::context::{Context, ForkOptions};
use chrono::Utc;
use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

type LazyText = Box<dyn FnOnce() -> String + Send>;
type LazyDetail = Box<dyn FnOnce() -> Value + Send>;

enum Summary {
    Text(String),
    Lazy(LazyText),
}

/// Optional structured payload of a log statement.
///
/// Closures passed to [`Fields::summary_with`] and [`Fields::detail`] only
/// run when the statement is actually emitted.
#[derive(Default)]
pub struct Fields {
    summary: Option<Summary>,
    detail: Option<LazyDetail>,
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fields")
            .field("summary", &self.summary.is_some())
            .field("detail", &self.detail.is_some())
            .finish()
    }
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(Summary::Text(summary.into()));
        self
    }

    pub fn summary_with<F>(mut self, summary: F) -> Self
    where
        F: FnOnce() -> String + Send + 'static,
    {
        self.summary = Some(Summary::Lazy(Box::new(summary)));
        self
    }

    pub fn detail<F>(mut self, detail: F) -> Self
    where
        F: FnOnce() -> Value + Send + 'static,
    {
        self.detail = Some(Box::new(detail));
        self
    }

    pub fn detail_value(self, detail: Value) -> Self {
        self.detail(move || detail)
    }

    fn evaluate(self) -> (Option<String>, Option<Value>) {
        let summary = self.summary.map(|s| match s {
            Summary::Text(text) => text,
            Summary::Lazy(f) => f(),
        });
        (summary, self.detail.map(|f| f()))
    }
}

/// A logging handle for one facility, bound to a context node.
///
/// The effective level is resolved once, when the logger is created, from the
/// global floor and every override on the path to its node.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strand::context::{Context, ForkOptions, Settings};
/// use strand::logging::{BaseLevels, Fields, Level, LevelOverrides, MemorySink, Profile};
///
/// let sink = Arc::new(MemorySink::new());
/// let root = Context::root("svc", Settings::new(BaseLevels::new(Level::Info), Profile::Development, sink.clone()));
///
/// let logger = root.logger();
/// logger.debug("hidden");
/// logger.info_with(Fields::new().detail(|| serde_json::json!({"rows": 3})), "loaded");
///
/// let db = logger.child_with("db", ForkOptions::new().levels(LevelOverrides::new().set("db", Level::Trace)));
/// assert!(db.is_level_enabled(Level::Trace));
/// assert!(!logger.is_level_enabled(Level::Debug));
/// assert_eq!(sink.matching("loaded").len(), 1);
/// assert!(sink.matching("hidden").is_empty());
/// ```
#[derive(Clone)]
pub struct Logger {
    facility: String,
    level: Level,
    threshold: u8,
    context: Context,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("facility", &self.facility)
            .field("level", &self.level)
            .field("context", &self.context.id())
            .finish()
    }
}

macro_rules! severity_methods {
    ($($level:ident => $plain:ident, $with:ident;)*) => {
        $(
            #[doc = concat!("Emit `message` at `", stringify!($plain), "`.")]
            pub fn $plain(&self, message: impl fmt::Display) {
                self.log(Level::$level, Fields::new(), message)
            }

            #[doc = concat!("Emit `message` at `", stringify!($plain), "` with structured fields.")]
            pub fn $with(&self, fields: Fields, message: impl fmt::Display) {
                self.log(Level::$level, fields, message)
            }
        )*
    };
}

impl Logger {
    /// Bind a logger for `facility` to `context`, resolving its level.
    pub fn bind(facility: impl Into<String>, context: Context) -> Self {
        let facility = facility.into();
        let settings = context.settings();
        let profile = settings.profile();
        let layers = context.override_layers();
        let level = resolve(
            settings.base(),
            layers.iter().map(|layer| layer.as_ref()),
            profile,
        )
        .level_for(&facility);

        Self {
            threshold: level.severity(profile),
            facility,
            level,
            context,
        }
    }

    pub fn facility(&self) -> &str {
        &self.facility
    }

    /// Effective level this logger was resolved to.
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// True when a statement at `level` would be emitted.
    pub fn is_level_enabled(&self, level: Level) -> bool {
        level.severity(self.context.settings().profile()) >= self.threshold
    }

    /// Derive a logger for `facility` on a new child node.
    pub fn child(&self, facility: impl Into<String>) -> Logger {
        self.child_with(facility, ForkOptions::new())
    }

    /// Derive a logger for `facility` on a new child node built from
    /// `options`; any level overrides in `options` are layered on top of the
    /// inherited ones.
    pub fn child_with(&self, facility: impl Into<String>, options: ForkOptions) -> Logger {
        let facility = facility.into();
        let overrides = options.overrides().cloned();
        let node = self
            .context
            .fork(facility.clone(), options.facility(facility.clone()));
        if let Some(overrides) = overrides {
            super::audit::report(&node, &overrides);
        }
        Logger::bind(facility, node)
    }

    /// Emit `message` at `level`. Never fails: problems building or
    /// delivering the record are reported on stderr.
    pub fn log(&self, level: Level, fields: Fields, message: impl fmt::Display) {
        if !self.is_level_enabled(level) {
            return;
        }
        let built = catch_unwind(AssertUnwindSafe(|| self.record(level, fields, &message)));
        match built {
            Ok(record) => deliver(self.context.settings().sink(), &record),
            Err(_) => fallback(&format!(
                "building a {level} record for {} panicked; record dropped",
                self.facility
            )),
        }
    }

    fn record(&self, level: Level, fields: Fields, message: &dyn fmt::Display) -> LogRecord {
        let (summary, detail) = fields.evaluate();
        LogRecord {
            timestamp: Utc::now(),
            facility: self.facility.clone(),
            level,
            severity: level.severity(self.context.settings().profile()),
            message: message.to_string(),
            summary,
            detail,
            context: self.context.causal_labels(),
            node: self.context.id(),
        }
    }

    severity_methods! {
        Trace => trace, trace_with;
        Debug => debug, debug_with;
        Progress => progress, progress_with;
        Info => info, info_with;
        UserError => user_error, user_error_with;
        Ops => ops, ops_with;
        Warn => warn, warn_with;
        Error => error, error_with;
        Fatal => fatal, fatal_with;
    }
}
