//! Error types for the query crate.

use thiserror::Error;

/// Errors that can occur when building or serializing queries.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A keyed body was requested for an empty field name.
    #[error("field name must not be empty")]
    EmptyField,

    /// A negation was requested without an inner filter.
    #[error("cannot negate a missing filter")]
    MissingFilter,

    /// Nested aggregations were added to a node owned by a built query.
    #[error("aggregation '{name}' belongs to a built query and can no longer be modified")]
    FrozenAggregation { name: String },

    /// An aggregation was reached again while serializing its own subtree.
    #[error("circular reference detected at aggregation '{name}'")]
    CircularReference { name: String },

    /// A sort direction string was neither `asc` nor `desc`.
    #[error("invalid sort direction '{0}', expected 'asc' or 'desc'")]
    InvalidDirection(String),

    /// Rendering a body to JSON text failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
