//! Error types and handling for Plunge
//!
//! This module defines the error types used throughout the application.
//! Every kind is handled at the boundary where it occurs: configuration and
//! transport failures become the rate store's error message, permission
//! failures are shown to the user, and delivery failures are only logged.

use thiserror::Error;

/// Result type alias for Plunge operations
pub type Result<T> = std::result::Result<T, PlungeError>;

/// Main error type for Plunge
#[derive(Debug, Error)]
pub enum PlungeError {
    /// Missing or invalid settings/configuration; raised before any I/O
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Network failure or non-success HTTP status from the pricing API
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Notification permission denied or notifications unsupported
    #[error("Permission error: {message}")]
    Permission { message: String },

    /// Best-effort notification dispatch failed
    #[error("Delivery error: {message}")]
    Delivery { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl PlungeError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        PlungeError::Config {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        PlungeError::Transport {
            message: message.into(),
        }
    }

    /// Create a new permission error
    pub fn permission<S: Into<String>>(message: S) -> Self {
        PlungeError::Permission {
            message: message.into(),
        }
    }

    /// Create a new delivery error
    pub fn delivery<S: Into<String>>(message: S) -> Self {
        PlungeError::Delivery {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        PlungeError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        PlungeError::Io {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        PlungeError::Generic {
            message: message.into(),
        }
    }

    /// Message without the kind prefix, as stored in the rate store
    pub fn user_message(&self) -> String {
        match self {
            PlungeError::Config { message }
            | PlungeError::Transport { message }
            | PlungeError::Permission { message }
            | PlungeError::Delivery { message }
            | PlungeError::Serialization { message }
            | PlungeError::Io { message }
            | PlungeError::Generic { message } => message.clone(),
            PlungeError::Validation { field, message } => format!("{}: {}", field, message),
        }
    }
}

impl From<std::io::Error> for PlungeError {
    fn from(err: std::io::Error) -> Self {
        PlungeError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for PlungeError {
    fn from(err: serde_yaml::Error) -> Self {
        PlungeError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PlungeError {
    fn from(err: serde_json::Error) -> Self {
        PlungeError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PlungeError {
    fn from(err: reqwest::Error) -> Self {
        PlungeError::transport(err.to_string())
    }
}

impl From<chrono::ParseError> for PlungeError {
    fn from(err: chrono::ParseError) -> Self {
        PlungeError::validation("datetime", err.to_string())
    }
}
