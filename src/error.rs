//! Error types for the productivity hub.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Row storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Request to {table} failed: {reason}")]
    Request { table: String, reason: String },

    #[error("{message}")]
    Rejected {
        table: String,
        status: u16,
        message: String,
    },

    #[error("Could not decode {table} row: {reason}")]
    Decode { table: String, reason: String },

    #[error("Not signed in")]
    NotAuthenticated,
}

/// Authentication provider errors.
///
/// `Rejected` carries the provider's own wording, which is shown to the user
/// verbatim.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{message}")]
    Rejected { message: String },

    #[error("Auth request failed: {0}")]
    Request(String),

    #[error("Unexpected auth response: {0}")]
    Decode(String),
}

/// Result type alias for the hub.
pub type Result<T> = std::result::Result<T, Error>;
