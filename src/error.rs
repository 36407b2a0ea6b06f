//! Error taxonomy for the retrieval core.
//!
//! Every failure a caller can observe maps to exactly one
//! [`RetrievalError`] variant. Not-found is not an error: lookups return
//! `Ok(None)`. Unknown backend response shapes are not errors either; they
//! surface through [`SearchResponse::raw_response`](crate::models::SearchResponse).

use thiserror::Error;

/// Failure reported by an external provider (embedding API or vector backend).
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request never produced an HTTP response (DNS, TLS, connection reset, ...).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered 2xx but the body was not usable.
    #[error("unexpected response: {0}")]
    Malformed(String),
}

/// Errors surfaced by [`Repository`](crate::repository::Repository) and its parts.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// One or more required settings are unset. Lists every missing name.
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    /// A setting is present but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("query must not be empty")]
    EmptyQuery,

    /// The connected backend exposes neither the query nor the legacy search endpoint.
    #[error(
        "vector backend exposes neither points/query nor points/search; \
         the deployed server version does not match this client"
    )]
    Incompatible,

    #[error("embedding provider error: {0}")]
    Embedding(#[source] UpstreamError),

    #[error("vector backend error: {0}")]
    Backend(#[source] UpstreamError),
}

impl RetrievalError {
    /// Stable machine-readable code shared by the HTTP and MCP adapters.
    pub fn code(&self) -> &'static str {
        match self {
            RetrievalError::MissingConfig(_) | RetrievalError::InvalidConfig(_) => "config_error",
            RetrievalError::EmptyQuery => "bad_request",
            RetrievalError::Incompatible => "incompatible_backend",
            RetrievalError::Embedding(_) | RetrievalError::Backend(_) => "upstream_error",
        }
    }

    /// True for failures raised by the embedding provider or the backend.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RetrievalError::Embedding(_) | RetrievalError::Backend(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_lists_every_name() {
        let err = RetrievalError::MissingConfig(vec![
            "QDRANT_URL".to_string(),
            "OPENAI_APIKEY".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: QDRANT_URL, OPENAI_APIKEY"
        );
        assert_eq!(err.code(), "config_error");
    }

    #[test]
    fn test_incompatible_is_not_upstream() {
        assert!(!RetrievalError::Incompatible.is_upstream());
        let upstream = RetrievalError::Backend(UpstreamError::Status {
            status: 503,
            body: "unavailable".to_string(),
        });
        assert!(upstream.is_upstream());
        assert_eq!(upstream.code(), "upstream_error");
        assert_eq!(
            upstream.to_string(),
            "vector backend error: HTTP 503: unavailable"
        );
    }
}
