//! Unified error handling for the flashnews crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`NewsErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! Only pool failures ([`Error::Pool`]) are meant to reach callers of the
//! orchestrator; the other kinds are normally recovered where they occur.

use std::io;
use thiserror::Error;

pub use crate::utils::error::{FetchError, ParseError, PoolError, StoreError};

/// Common trait for all flashnews error types
pub trait NewsErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later attempt may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The pool could not produce a handle
    Resource,
    /// Network-related errors (HTTP, timeout, provider status)
    Network,
    /// Parsing and data extraction errors
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    /// Short description for logs and CLI output
    pub fn description(&self) -> &'static str {
        match self {
            Self::Resource => "resource unavailable",
            Self::Network => "network error",
            Self::Parsing => "parse error",
            Self::Storage => "storage error",
            Self::Config => "configuration error",
        }
    }
}

impl NewsErrorTrait for PoolError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Connect(_))
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Connect(_) => ErrorCategory::Resource,
            Self::InvalidConfig(_) => ErrorCategory::Config,
        }
    }
}

impl NewsErrorTrait for StoreError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Unavailable(e) => e.is_recoverable(),
            Self::Query(_) => true,
            Self::Duplicate(_) | Self::InvalidRecord(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Unavailable(e) => e.category(),
            _ => ErrorCategory::Storage,
        }
    }
}

impl NewsErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Parsing,
            Self::InvalidUrl(_) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}

impl NewsErrorTrait for ParseError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidTimestamp(_))
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Parsing
    }
}

/// Unified error type for the flashnews crate
#[derive(Error, Debug)]
pub enum Error {
    /// Pool could not produce a handle (ResourceUnavailable)
    #[error("Resource unavailable: {0}")]
    Pool(#[from] PoolError),

    /// Store access errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse-specific errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl NewsErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Pool(e) => e.is_recoverable(),
            Self::Store(e) => e.is_recoverable(),
            Self::Fetch(e) => e.is_recoverable(),
            Self::Parse(e) => e.is_recoverable(),
            Self::Io(_) => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Pool(e) => e.category(),
            Self::Store(e) => e.category(),
            Self::Fetch(e) => e.category(),
            Self::Parse(_) => ErrorCategory::Parsing,
            Self::Io(_) => ErrorCategory::Storage,
        }
    }
}

impl Error {
    /// Whether this is the fatal "no handle could be produced" kind
    pub fn is_resource_unavailable(&self) -> bool {
        matches!(self, Self::Pool(_) | Self::Store(StoreError::Unavailable(_)))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
