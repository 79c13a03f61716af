//! Error types for callout
//!
//! This module provides the error taxonomy for the library:
//! - Startup/configuration errors (fatal before any attempt is made)
//! - Per-attempt errors (invalid number, initiation failure)
//! - Connectivity errors (channel unreachable, request timeout)
//!
//! The distinction between [`Error::Initiation`] (application-level rejection,
//! batch continues) and [`Error::Unreachable`] (connectivity-level failure,
//! batch aborts) is load-bearing: the batch runner keys its abort decision on
//! the variant, never on error text.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for callout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for callout
///
/// This is the primary error type used throughout the library. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "remote.trigger_url")
        key: Option<String>,
    },

    /// Phone number failed validation; never escapes the dispatcher
    #[error("invalid phone number: {0}")]
    InvalidNumber(String),

    /// The channel rejected or could not start the call/message
    #[error("initiation failed: {0}")]
    Initiation(String),

    /// The end-call command failed; non-fatal, the attempt still completes
    #[error("termination failed: {0}")]
    Termination(String),

    /// Connectivity-level failure; aborts the remainder of a batch
    #[error("channel unreachable: {0}")]
    Unreachable(String),

    /// The channel request did not complete within the configured timeout
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// Contact list error
    #[error("contact list error: {0}")]
    ContactList(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation not supported by the selected channel
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error with an associated config key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}
