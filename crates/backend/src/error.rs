//! Startup and transport error types.

use thiserror::Error;

/// Invalid value found while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a port number, got {value:?}")]
    InvalidPort { var: &'static str, value: String },

    #[error("{var} must be a boolean (true/false/1/0/yes/no), got {value:?}")]
    InvalidBool { var: &'static str, value: String },

    #[error("{var} contains an invalid origin: {value:?}")]
    InvalidOrigin { var: &'static str, value: String },

    #[error("{var} contains an invalid HTTP method: {value:?}")]
    InvalidMethod { var: &'static str, value: String },

    #[error("{var} contains an invalid header name: {value:?}")]
    InvalidHeader { var: &'static str, value: String },

    #[error("{var} must be `plain` or `json`, got {value:?}")]
    InvalidLogFormat { var: &'static str, value: String },

    #[error("{var} must be a number of seconds, got {value:?}")]
    InvalidMaxAge { var: &'static str, value: String },

    /// A list variable was set but contained no entries.
    #[error("{var} must not be empty")]
    EmptyList { var: &'static str },
}

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl ServerError {
    pub(crate) fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        ServerError::Bind {
            addr: addr.into(),
            source,
        }
    }
}

/// Result type for server startup and serving.
pub type Result<T> = std::result::Result<T, ServerError>;
