//! Version-tolerant search invocation.
//!
//! Backends expose similarity search under different endpoints depending on
//! the deployed version. [`SearchStrategy`] is the closed set of known
//! variants, tried in [`SearchStrategy::PRECEDENCE`] order; the first one
//! the backend exposes is used and its response is reduced to an ordered
//! list of [`RawScoredRecord`]s. Adding a variant means extending the enum
//! and its precedence, callers are untouched.
//!
//! Result order is the backend's relevance order. Nothing is re-ranked.

use serde_json::Value;

use crate::backend::{PointsQuery, VectorBackend};
use crate::error::RetrievalError;
use crate::models::RawScoredRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// `query_points`: the current API.
    Query,
    /// `search_points`: the pre-query API.
    LegacySearch,
}

impl SearchStrategy {
    pub const PRECEDENCE: [SearchStrategy; 2] = [SearchStrategy::Query, SearchStrategy::LegacySearch];

    pub fn name(self) -> &'static str {
        match self {
            SearchStrategy::Query => "query_points",
            SearchStrategy::LegacySearch => "search_points",
        }
    }

    async fn call(
        self,
        backend: &dyn VectorBackend,
        query: &PointsQuery<'_>,
    ) -> Result<Option<Value>, RetrievalError> {
        match self {
            SearchStrategy::Query => backend.query_points(query).await,
            SearchStrategy::LegacySearch => backend.search_points(query).await,
        }
    }
}

/// Backend results reduced to a common shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResults {
    Points(Vec<RawScoredRecord>),
    /// No known shape matched; the body is handed back untouched.
    Unrecognized(Value),
}

/// Run the first available strategy.
///
/// Fails with [`RetrievalError::Incompatible`] when the backend exposes
/// none of them. Upstream errors from the chosen strategy propagate as-is;
/// a failing strategy never falls through to the next one.
pub async fn invoke(
    backend: &dyn VectorBackend,
    query: &PointsQuery<'_>,
) -> Result<(SearchStrategy, RawResults), RetrievalError> {
    for strategy in SearchStrategy::PRECEDENCE {
        match strategy.call(backend, query).await? {
            Some(response) => {
                tracing::debug!(
                    strategy = strategy.name(),
                    limit = query.limit,
                    filtered = query.filter.is_some(),
                    "backend search completed"
                );
                return Ok((strategy, extract_points(response)));
            }
            None => {
                tracing::debug!(strategy = strategy.name(), "search capability not available");
            }
        }
    }
    Err(RetrievalError::Incompatible)
}

/// Locate the result sequence in a backend response.
///
/// Accepted, in order: `points`, `result.points`, `result` as an array, or
/// the body itself as an array. Every element must read as a
/// [`RawScoredRecord`]; otherwise the whole body is returned as
/// [`RawResults::Unrecognized`].
pub fn extract_points(response: Value) -> RawResults {
    let sequence = response
        .get("points")
        .filter(|v| v.is_array())
        .or_else(|| response.get("result").and_then(|r| r.get("points")).filter(|v| v.is_array()))
        .or_else(|| response.get("result").filter(|v| v.is_array()))
        .or_else(|| Some(&response).filter(|v| v.is_array()))
        .and_then(Value::as_array);

    let Some(items) = sequence else {
        return RawResults::Unrecognized(response);
    };

    let records: Option<Vec<RawScoredRecord>> =
        items.iter().map(RawScoredRecord::from_value).collect();
    match records {
        Some(records) => RawResults::Points(records),
        None => RawResults::Unrecognized(response),
    }
}
