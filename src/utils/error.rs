//! Error types for the flashnews core
//!
//! This module defines the domain error types used by the pool, the stores,
//! and the external news fetcher.

use thiserror::Error;

/// Errors raised when the resource pool cannot hand out a handle
#[derive(Error, Debug)]
pub enum PoolError {
    /// Creating a new handle to the backing store failed
    #[error("Failed to open backing store handle: {0}")]
    Connect(String),

    /// The pool configuration cannot produce any handle
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised by article, category, and region stores
#[derive(Error, Debug)]
pub enum StoreError {
    /// No handle could be obtained from the pool
    #[error("Backing store unavailable: {0}")]
    Unavailable(#[from] PoolError),

    /// A query against the backing store failed
    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// A record with the same natural key (article URL, category name,
    /// region code) is already stored
    #[error("Record already stored: {0}")]
    Duplicate(String),

    /// A stored row could not be mapped to a record
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    /// Whether this error means no handle could be produced at all
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors that can occur while fetching from the external news provider
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Provider returned status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid provider URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors raised while validating or mapping a fetched item
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Title missing or blank
    #[error("Title not found in article")]
    TitleNotFound,

    /// Title is not longer than the minimum length
    #[error("Title too short: {0:?}")]
    TitleTooShort(String),

    /// URL missing or blank
    #[error("URL not found in article")]
    UrlNotFound,

    /// URL does not use an HTTP scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Published timestamp could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
