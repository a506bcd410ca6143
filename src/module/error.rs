//! Error taxonomy shared by all processing modules

use thiserror::Error;

/// Errors a processing module reports to its host
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A required external dependency is unavailable; the module cannot be used
    #[error("{module}: {message}")]
    Initialization { module: String, message: String },

    /// The current invocation failed; no partial result is produced
    #[error("{0}")]
    Execution(String),

    /// Staging I/O failed before or after the worker ran
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModuleError {
    pub fn initialization(module: impl Into<String>, message: impl Into<String>) -> Self {
        ModuleError::Initialization {
            module: module.into(),
            message: message.into(),
        }
    }

    pub fn is_initialization(&self) -> bool {
        matches!(self, ModuleError::Initialization { .. })
    }
}
