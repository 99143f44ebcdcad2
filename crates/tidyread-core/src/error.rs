// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every tidyread crate.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all tidyread ports and services.
///
/// Backend failures are split into distinct variants because the job worker
/// treats each class differently: rate limits engage the shared flood lock,
/// a missing connection is retried on a fixed delay, rejections are dropped,
/// and everything else counts against the job's retry budget.
#[derive(Debug, Error)]
pub enum TidyreadError {
    /// Configuration errors (invalid TOML, missing keys, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Unexpected failure reported by the messaging backend.
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend asked us to wait before issuing further calls.
    #[error("rate limited by backend for {wait:?}")]
    RateLimited { wait: Duration },

    /// The messaging backend is not connected.
    #[error("backend not connected")]
    NotConnected,

    /// The backend refused this specific operation (e.g. an invalid topic).
    #[error("operation rejected by backend: {message}")]
    Rejected { message: String },

    /// A referenced entity does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TidyreadError {
    /// Convenience constructor for [`TidyreadError::Backend`] without a source.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Convenience constructor for [`TidyreadError::Rejected`].
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Whether the failure is transient and must not count as a failed attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::NotConnected)
    }
}

impl From<serde_json::Error> for TidyreadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("json: {e}"))
    }
}
