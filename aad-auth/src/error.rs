//! Error types for the `aad-auth` crate.
//!
//! Follows the same pattern as the other layers: a root Error struct holding an error kind
//! tree and an optional source for error chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for aad-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in aad-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// Missing or malformed endpoint templates or client credentials. Fatal at startup.
    Configuration(ConfigurationErrorKind),
    /// The callback did not present the state issued at login.
    Csrf(CsrfErrorKind),
    /// The authorization code could not be exchanged at the token endpoint.
    ProviderExchange(ProviderExchangeErrorKind),
    /// The session backend failed to read, write or destroy session data.
    Session(SessionErrorKind),
}

/// Errors from configuration validation and endpoint construction.
#[derive(Debug, PartialEq)]
pub enum ConfigurationErrorKind {
    MissingTemplate(&'static str),
    MissingParameter(&'static str),
    InvalidTemplate(&'static str),
    UnresolvedPlaceholder(String),
    InvalidUrl(&'static str),
    HttpClient,
}

/// Errors from CSRF state validation.
#[derive(Debug, PartialEq)]
pub enum CsrfErrorKind {
    MissingIssuedState,
    MissingReturnedState,
    StateMismatch,
}

/// Errors from the authorization code exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderExchangeErrorKind {
    MissingCode,
    Network,
    Timeout,
    /// Error reported by the provider, e.g. `invalid_grant`.
    Provider(String),
    InvalidResponse,
}

/// Errors from the session backend.
#[derive(Debug, PartialEq)]
pub enum SessionErrorKind {
    Read,
    Write,
    Destroy,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Configuration(kind) => write!(f, "Configuration error: {:?}", kind),
            ErrorKind::Csrf(kind) => write!(f, "CSRF validation error: {:?}", kind),
            ErrorKind::ProviderExchange(kind) => write!(f, "Provider exchange error: {:?}", kind),
            ErrorKind::Session(kind) => write!(f, "Session error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_timeout() {
            ProviderExchangeErrorKind::Timeout
        } else if err.is_decode() {
            ProviderExchangeErrorKind::InvalidResponse
        } else {
            ProviderExchangeErrorKind::Network
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::ProviderExchange(error_kind),
        }
    }
}

/// Helper function to create configuration errors.
pub fn configuration_error(kind: ConfigurationErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Configuration(kind),
    }
}

/// Helper function to create CSRF errors.
pub fn csrf_error(kind: CsrfErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Csrf(kind),
    }
}

/// Helper function to create provider exchange errors.
pub fn exchange_error(kind: ProviderExchangeErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::ProviderExchange(kind),
    }
}

/// Helper function to create session errors.
pub fn session_error(
    kind: SessionErrorKind,
    source: impl Into<Box<dyn StdError + Send + Sync>>,
) -> Error {
    Error {
        source: Some(source.into()),
        error_kind: ErrorKind::Session(kind),
    }
}
