//! Error types for evita-shell
//!
//! This module defines the error types used throughout the application.
//! Anticipated conditions (catalog already exists, no session open, ...) are
//! not errors: they are reported through outcome values in `session::holder`.

use thiserror::Error;

/// Result type alias for evita-shell
pub type Result<T> = std::result::Result<T, ShellError>;

/// Main error type for evita-shell
#[derive(Error, Debug)]
pub enum ShellError {
    /// The remote service could not be reached
    #[error("Service at {endpoint} is unreachable: {message}")]
    Connectivity { endpoint: String, message: String },

    /// The client could not be constructed or probed for a reason other than connectivity
    #[error("Client initialization failed: {0}")]
    Initialization(String),

    /// A command needed the client but none is attached
    #[error("Not connected to the catalog service")]
    NotConnected,

    /// A catalog or entity collection is absent in the remote service
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote service answered with an unexpected failure
    #[error("Remote service error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Catalog names must be non-empty
    #[error("Invalid catalog name: {0:?}")]
    InvalidCatalogName(String),

    /// Unknown shell command
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Command was given arguments it does not accept
    #[error("Invalid syntax for {command}, expected: {expected}")]
    InvalidCommandSyntax { command: String, expected: String },

    /// The operator aborted an interactive prompt
    #[error("Input cancelled")]
    PromptCancelled,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP-related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file parse errors
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ShellError {
    /// Build a connectivity error for the given endpoint
    pub fn connectivity(endpoint: impl Into<String>, message: impl ToString) -> Self {
        ShellError::Connectivity {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error means the remote endpoint is unavailable
    pub fn is_connectivity(&self) -> bool {
        match self {
            ShellError::Connectivity { .. } => true,
            ShellError::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}
