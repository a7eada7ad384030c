use thiserror::Error;

/// Why a snapshot could not be written, read or restored.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("cannot encode snapshot: {0}")]
    SerializationFailed(String),

    #[error("cannot decode snapshot: {0}")]
    DeserializationFailed(String),

    #[error("snapshot format {found} is not readable (expected {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Restoring through a factory bound to another name.
    #[error("snapshot of machine '{found}' cannot restore machine '{expected}'")]
    MachineMismatch { expected: String, found: String },

    #[error("machine '{machine}' has no state '{state}'")]
    UnknownState { machine: String, state: String },

    #[error("inconsistent snapshot: {0}")]
    ValidationFailed(String),
}
