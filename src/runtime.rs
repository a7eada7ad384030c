//! Process-wide root context.
//!
//! The root is installed once, either explicitly through [`init`] /
//! [`init_with_sink`] before the first logging call, or implicitly from the
//! environment on the first call to [`root`]. It lives for the rest of the
//! process; there is no teardown.

use crate::config::LogConfig;
use crate::context::{Context, Settings};
use crate::logging::{fallback, ConsoleSink, Sink, TeeSink};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Name and facility of the process root.
pub const ROOT_NAME: &str = "app";

static ROOT: OnceLock<Context> = OnceLock::new();

/// Errors from installing the root.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("The process root context is already initialized")]
    AlreadyInitialized,
}

/// Install the root, writing records to stderr.
pub fn init(config: LogConfig) -> Result<&'static Context, InitError> {
    install(build(&config, Arc::new(ConsoleSink)))
}

/// Install the root, writing records to `sink` and, when the configuration
/// asks for it, mirroring them to stderr.
pub fn init_with_sink(config: LogConfig, sink: Arc<dyn Sink>) -> Result<&'static Context, InitError> {
    let sink: Arc<dyn Sink> = if config.console {
        Arc::new(TeeSink::new(vec![sink, Arc::new(ConsoleSink)]))
    } else {
        sink
    };
    install(build(&config, sink))
}

/// The process root, initialized from the environment on first use.
pub fn root() -> &'static Context {
    ROOT.get_or_init(|| {
        let config = LogConfig::from_env().unwrap_or_else(|errors| {
            fallback(&format!("{errors}; using default logging configuration"));
            LogConfig::default()
        });
        build(&config, Arc::new(ConsoleSink))
    })
}

pub fn is_initialized() -> bool {
    ROOT.get().is_some()
}

fn build(config: &LogConfig, sink: Arc<dyn Sink>) -> Context {
    Context::root(ROOT_NAME, Settings::from_config(config, sink))
}

fn install(context: Context) -> Result<&'static Context, InitError> {
    ROOT.set(context).map_err(|_| InitError::AlreadyInitialized)?;
    Ok(root())
}
