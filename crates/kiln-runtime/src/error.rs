//! Error types for the runtime crate.

use std::path::PathBuf;
use thiserror::Error;

/// Inference pipeline errors.
///
/// Every variant is fatal to the run. Buffer size disagreements in the
/// loader are not errors; they are reported as warnings and absorbed.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A buffer file could not be opened or read.
    #[error("Cannot open {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The model artifact is missing or not loadable on this platform.
    #[error("Failed to load module `{}`: {reason}", .path.display())]
    ModuleLoadError { path: PathBuf, reason: String },

    /// An expected exported function is absent from the artifact or VM module.
    #[error("`{symbol}` does not exist in {module}")]
    MissingEntryPointError { symbol: String, module: String },

    /// The entry function ran but reported failure.
    #[error("Invocation failed: {0}")]
    InvocationError(String),

    /// Host and device tensor sizes disagree.
    #[error("Invalid tensor: {0}")]
    TensorError(String),

    /// Model configuration is inconsistent (labels, shapes, label file).
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl RuntimeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing_entry(symbol: &str, module: impl Into<String>) -> Self {
        Self::MissingEntryPointError {
            symbol: symbol.to_string(),
            module: module.into(),
        }
    }
}

/// Specialized Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
