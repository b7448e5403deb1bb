//! Error types for the workflow runtime.
//!
//! Workers and adapters cannot fail at the type level, so the only errors
//! surfaced here come from configuration, host setup, and probing a view
//! description against a widget of the wrong kind.

/// Top-level error type for the runtime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Host and scheduling errors.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("No tokio runtime available to host workflow {name}")]
    NoRuntime { name: String },

    #[error("Host {name} has shut down")]
    HostStopped { name: String },
}

/// Errors at the boundary with the presentation layer.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("Unable to update {found}, expecting a {expected}")]
    KindMismatch {
        expected: &'static str,
        found: String,
    },
}

/// Result type alias for the runtime.
pub type Result<T> = std::result::Result<T, Error>;
