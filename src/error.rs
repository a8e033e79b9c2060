//! Error types for Remindr
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Remindr operations
///
/// This enum covers configuration loading, backend API calls, session
/// persistence, client-side validation and terminal interaction.
#[derive(Error, Debug)]
pub enum RemindrError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend returned a non-success status
    ///
    /// `message` carries the backend-provided `detail` text when present,
    /// otherwise a generic description of the status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the backend
        status: u16,
        /// Backend message or generic fallback
        message: String,
    },

    /// Authentication errors (bad credentials, expired token, 401)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// An operation that needs a session was attempted without one
    #[error("Not logged in. Run `remindr login` first")]
    NotAuthenticated,

    /// Client-side or boundary validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// A reminder that is not in the local collection was referenced
    #[error("Reminder not found: {0}")]
    NotFound(i64),

    /// A newer request of the same kind was issued before this one finished
    #[error("Request superseded by a newer one")]
    Superseded,

    /// Session persistence errors (file or keyring backend)
    #[error("Session storage error: {0}")]
    Session(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport errors (connection refused, timeout, bad body)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Interactive line editor errors
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

impl RemindrError {
    /// Returns the message intended for the end user.
    ///
    /// For backend failures this is the backend-provided text alone, without
    /// the status prefix used by `Display`.
    pub fn user_message(&self) -> String {
        match self {
            RemindrError::Api { message, .. } => message.clone(),
            RemindrError::Authentication(message) => message.clone(),
            RemindrError::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for Remindr operations
///
/// Uses `anyhow::Error` so that callers can attach context while the
/// underlying [`RemindrError`] stays recoverable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
