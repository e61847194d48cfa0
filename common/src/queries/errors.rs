use serde::{Deserialize, Serialize};
use std::fmt;

/// Common error type for all query responses
/// Producing one of these never changes ledger or contract state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryError {
    /// The requested resource was not found
    NotFound {
        resource: String,
    },

    /// An error occurred while processing the query
    QueryFailed {
        message: String,
    },

    /// Invalid request parameters
    InvalidRequest {
        message: String,
    },

    /// Query variant is unknown or could not be decoded
    UnsupportedQuery {
        query: String,
    },
}

impl QueryError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn unsupported_query(query: impl Into<String>) -> Self {
        Self::UnsupportedQuery {
            query: query.into(),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { resource } => write!(f, "Not found: {}", resource),
            Self::QueryFailed { message } => write!(f, "Query failed: {}", message),
            Self::InvalidRequest { message } => write!(f, "Invalid request: {}", message),
            Self::UnsupportedQuery { query } => write!(f, "Unsupported query: {}", query),
        }
    }
}

impl std::error::Error for QueryError {}
