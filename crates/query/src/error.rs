//! Error types for query compilation.
//!
//! Every rejected filter, option or field path produces exactly one
//! [`QueryError`]. Callers that need to hand the failure to a remote peer use
//! [`QueryError::description`], which yields the stable
//! `{errorCode, status, message, description}` shape.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expression::Capability;
use crate::version::SchemaVersion;

/// Errors raised while resolving, parsing or validating a search query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The field path matches none of the known field shapes.
    #[error("unknown field: '{path}'")]
    UnknownField { path: String },

    /// The field exists but cannot be used for the requested operation.
    #[error("field '{path}' cannot be used for {capability}")]
    UnsupportedField { path: String, capability: Capability },

    /// The RQL filter is malformed.
    #[error("invalid RQL expression at position {position}: {message}")]
    InvalidFilterSyntax { message: String, position: usize },

    /// A sort or limit option is malformed or references a non-sortable field.
    #[error("invalid option: {message}")]
    InvalidOption {
        message: String,
        #[source]
        source: Option<Box<QueryError>>,
    },

    /// The filter contains negation but the schema version forbids it.
    #[error(
        "the filter operation 'not' is not available in API versions >= {forbidden_since} (requested version {version}); rephrase the query without 'not'"
    )]
    NegationNotAllowed {
        version: SchemaVersion,
        forbidden_since: SchemaVersion,
    },
}

impl QueryError {
    /// Wraps this error as the cause of an [`QueryError::InvalidOption`].
    ///
    /// An error that already is an option error is returned unchanged.
    pub fn into_invalid_option(self) -> QueryError {
        match self {
            QueryError::InvalidOption { .. } => self,
            other => QueryError::InvalidOption {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    /// Returns the stable error code of this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            QueryError::UnknownField { .. } => "things-search:field.unknown",
            QueryError::UnsupportedField { .. } => "things-search:field.unsupported",
            QueryError::InvalidFilterSyntax { .. } => "rql.expression.invalid",
            QueryError::InvalidOption { .. } => "things-search:option.invalid",
            QueryError::NegationNotAllowed { .. } => "rql.expression.negation.forbidden",
        }
    }

    /// Returns the HTTP status this error maps to.
    ///
    /// All query errors are caused by the request, so they map to 400.
    pub fn status(&self) -> u16 {
        400
    }

    /// Builds the serializable description of this error.
    pub fn description(&self) -> ErrorDescription {
        let description = match self {
            QueryError::UnknownField { .. } | QueryError::UnsupportedField { .. } => {
                "Check the field path: use thingId, _namespace, attributes/<path>, \
                 features/<featureId>, features/<featureId>/properties/<path> or \
                 features/*/properties/<path>."
            }
            QueryError::InvalidFilterSyntax { .. } => {
                "Check the RQL syntax of the filter expression."
            }
            QueryError::InvalidOption { .. } => {
                "Options must be comma-separated sort(+field,-field) or limit(offset,count) expressions."
            }
            QueryError::NegationNotAllowed { .. } => {
                "Negation breaks monotonic query composition and is rejected by newer API versions."
            }
        };

        ErrorDescription {
            error_code: self.error_code().to_string(),
            status: self.status(),
            message: self.to_string(),
            description: Some(description.to_string()),
        }
    }
}

/// Serializable representation of a typed error for remote callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescription {
    /// Stable, machine readable error code.
    pub error_code: String,
    /// HTTP status analog.
    pub status: u16,
    /// Human readable message.
    pub message: String,
    /// Optional hint on how to fix the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result type alias for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_unknown_field_display() {
        let err = QueryError::UnknownField {
            path: "foo/bar".to_string(),
        };
        assert_eq!(err.to_string(), "unknown field: 'foo/bar'");
    }

    #[test]
    fn test_invalid_option_keeps_cause() {
        let cause = QueryError::UnsupportedField {
            path: "_namespace".to_string(),
            capability: Capability::Sort,
        };
        let err = cause.into_invalid_option();
        assert!(matches!(err, QueryError::InvalidOption { .. }));
        let source = err.source().expect("cause should be attached");
        assert!(source.to_string().contains("_namespace"));
    }

    #[test]
    fn test_invalid_option_is_not_wrapped_twice() {
        let err = QueryError::InvalidOption {
            message: "bad".to_string(),
            source: None,
        }
        .into_invalid_option();
        assert!(err.source().is_none());
    }

    #[test]
    fn test_description_shape() {
        let err = QueryError::NegationNotAllowed {
            version: SchemaVersion::V_2,
            forbidden_since: SchemaVersion::V_2,
        };
        let description = err.description();
        assert_eq!(description.error_code, "rql.expression.negation.forbidden");
        assert_eq!(description.status, 400);

        let json = serde_json::to_value(&description).unwrap();
        assert!(json.get("errorCode").is_some());
        assert!(json.get("message").is_some());
    }
}
