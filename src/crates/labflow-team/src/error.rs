//! Error types for the research team
//!
//! [`TeamError`] covers everything that can go wrong while assembling the
//! workflow (configuration, prompts, backends) and wraps engine errors from
//! running it. Failures raised inside nodes travel to the engine as boxed
//! errors and come back wrapped in [`GraphError::NodeExecution`].

use labflow_core::GraphError;
use labflow_llm::LlmError;
use thiserror::Error;

/// Result type alias for team operations
pub type Result<T> = std::result::Result<T, TeamError>;

/// Main error type for team operations
#[derive(Debug, Error)]
pub enum TeamError {
    /// Engine error (validation, node failure, non-convergence)
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend construction failed
    #[error("Backend error: {0}")]
    Backend(#[from] LlmError),

    /// The note agent's reply did not match the note schema
    #[error("Invalid note record: {0}")]
    InvalidNote(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TeamError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the run hit the step ceiling
    pub fn is_non_convergence(&self) -> bool {
        matches!(self, Self::Graph(err) if err.is_non_convergence())
    }
}
