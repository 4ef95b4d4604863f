//! Error types for the search persistence layer.
//!
//! Query compilation failures are wrapped unchanged; the remaining variants
//! cover the write path and the backend.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use thingsearch_query::{ErrorDescription, QueryError};

/// The primary error type of the search persistence layer.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The search request was rejected by the query compiler.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// An index entry key does not fit into the index even with an empty value.
    #[error("index key '{key}' has {length} bytes but only {max_length} bytes are available")]
    IndexKeyTooLong {
        key: String,
        length: usize,
        max_length: usize,
    },

    /// A thing ID is empty or otherwise unusable as an index key.
    #[error("invalid thing ID: '{thing_id}'")]
    InvalidThingId { thing_id: String },

    /// An event does not carry the data its type requires.
    #[error("malformed event for thing '{thing_id}': {message}")]
    MalformedEvent { thing_id: String, message: String },

    /// The executor failed to apply an operation.
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl PersistenceError {
    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        PersistenceError::Backend {
            message: message.into(),
        }
    }

    /// Creates a malformed event error.
    pub fn malformed_event(thing_id: impl Into<String>, message: impl Into<String>) -> Self {
        PersistenceError::MalformedEvent {
            thing_id: thing_id.into(),
            message: message.into(),
        }
    }

    /// Returns the stable error code of this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            PersistenceError::Query(err) => err.error_code(),
            PersistenceError::IndexKeyTooLong { .. } => "things-search:index.key.toolong",
            PersistenceError::InvalidThingId { .. } => "things:id.invalid",
            PersistenceError::MalformedEvent { .. } => "things-search:event.malformed",
            PersistenceError::Backend { .. } => "things-search:backend.error",
        }
    }

    /// Returns the HTTP status this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            PersistenceError::Query(err) => err.status(),
            PersistenceError::IndexKeyTooLong { .. }
            | PersistenceError::InvalidThingId { .. }
            | PersistenceError::MalformedEvent { .. } => 400,
            PersistenceError::Backend { .. } => 500,
        }
    }

    /// Builds the serializable description of this error.
    pub fn description(&self) -> ErrorDescription {
        if let PersistenceError::Query(err) = self {
            return err.description();
        }

        ErrorDescription {
            error_code: self.error_code().to_string(),
            status: self.status(),
            message: self.to_string(),
            description: None,
        }
    }
}

/// Result type alias for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
