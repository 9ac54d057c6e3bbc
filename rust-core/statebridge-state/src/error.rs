// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// State store error types.
//
// One enum shared by every state store backend so that callers (and the
// conformance runner) can match on failure kinds without knowing which
// vendor adapter produced them.

use thiserror::Error;

/// Errors returned by [`crate::StateStore`] implementations.
#[derive(Debug, Error)]
pub enum StateError {
    /// A required metadata property was absent or empty.
    #[error("{0}")]
    MissingMetadata(String),

    /// A metadata property was present but could not be interpreted.
    #[error("invalid metadata property '{property}': {reason}")]
    InvalidMetadata {
        /// Name of the offending property.
        property: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An operation was attempted before `init` succeeded.
    #[error("state store '{0}' is not initialized")]
    NotInitialized(String),

    /// The etag supplied with a write did not match the stored etag.
    #[error("possible etag mismatch for key '{key}'")]
    EtagMismatch {
        /// Key whose etag check failed.
        key: String,
    },

    /// The request itself is malformed (e.g. an empty key).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The backend (vendor SDK, network, service) reported a failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// Failed to serialize or deserialize a value.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StateError {
    /// True if this error is an etag/concurrency conflict.
    pub fn is_etag_mismatch(&self) -> bool {
        matches!(self, StateError::EtagMismatch { .. })
    }
}

/// Convenience alias used throughout the state crates.
pub type StateResult<T> = Result<T, StateError>;
