//! Context-aware structured logging.
//!
//! Every [`Logger`] is bound to a [`Context`](crate::context::Context) node
//! and a facility name. Its level is resolved when it is created, from the
//! global floor ([`BaseLevels`]) and every [`LevelOverrides`] map on the
//! path to its node. Overrides can make a facility more verbose but never
//! hide what the floor requires.
//!
//! - [`Level`] and [`Profile`]: severities and their numeric ranks
//! - [`resolve`]: the level resolution algorithm
//! - [`Sink`]: destinations for emitted [`LogRecord`]s

pub(crate) mod audit;
mod level;
mod logger;
mod overrides;
mod record;
mod resolver;
mod sink;

pub use audit::AUDIT_FACILITY;
pub use level::{Level, Profile};
pub use logger::{Fields, Logger};
pub use overrides::{BaseLevels, LevelOverrides, DEFAULT_FACILITY};
pub use record::LogRecord;
pub use resolver::{resolve, AuditEntry, Resolution};
pub use sink::{ConsoleSink, JsonSink, MemorySink, Sink, SinkError, TeeSink};

pub(crate) use sink::fallback;
