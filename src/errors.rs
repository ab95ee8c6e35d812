//! Error types for the offsite-payments-rs library.
//!
//! This module defines all error types that can occur while building outgoing
//! redirect forms or parsing inbound gateway payloads.

use thiserror::Error;

/// Main error type for offsite payment operations.
#[derive(Error, Debug)]
pub enum OffsiteError {
    /// Error during HTTP request/response handling
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error parsing URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// An option key outside the Helper allow-list was supplied.
    ///
    /// This is a caller/programmer error and surfaces at construction time
    /// rather than being silently dropped, so typos in integration code fail
    /// fast.
    #[error("Unknown helper option: {0}")]
    UnknownOption(String),

    /// A gateway does not expose a service URL for the requested mode
    #[error("Gateway '{gateway}' has no service URL for {mode} mode")]
    UnsupportedMode {
        /// Registry identifier of the gateway
        gateway: &'static str,
        /// The integration mode that was requested
        mode: crate::gateways::IntegrationMode,
    },

    /// An integration mode string did not match any known mode
    #[error("Unknown integration mode: {0}")]
    UnknownMode(String),

    /// No gateway registered under the given identifier
    #[error("Unknown gateway: {0}")]
    UnknownGateway(String),

    /// A credential the gateway requires at construction time was absent
    #[error("Missing required credential: {0}")]
    MissingCredential(&'static str),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

/// Result type alias for offsite payment operations.
pub type Result<T> = std::result::Result<T, OffsiteError>;
