//! Vector backend abstraction.
//!
//! The [`VectorBackend`] trait describes what the retrieval core needs from
//! the connected similarity index. Deployed backends differ by version: a
//! given server may expose the modern query endpoint, only the legacy
//! search endpoint, or (misconfigured) neither. Each search method therefore
//! reports whether the capability exists at all, separately from whether
//! the call succeeded:
//!
//! | Return | Meaning |
//! |--------|---------|
//! | `Ok(Some(body))` | Capability present, raw response body |
//! | `Ok(None)` | Capability not exposed by the connected backend |
//! | `Err(_)` | Capability present, call failed |
//!
//! Responses are returned as loosely-typed JSON; shape interpretation is
//! done by [`invoker`](crate::invoker).
//!
//! Implementations must be `Send + Sync`; one instance serves all
//! concurrent requests.

pub mod memory;
pub mod qdrant;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RetrievalError;
use crate::filter::Filter;
use crate::models::PointId;

/// Semantic parameters shared by every search capability.
#[derive(Debug, Clone, Copy)]
pub struct PointsQuery<'a> {
    pub vector: &'a [f32],
    /// Named vector selector, `None` for the default vector.
    pub using: Option<&'a str>,
    /// Absent means unfiltered; never an empty filter.
    pub filter: Option<&'a Filter>,
    pub limit: u64,
}

#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Whether range conditions may use the dedicated datetime form.
    fn supports_datetime_range(&self) -> bool {
        true
    }

    /// Modern query capability (payload on, vectors off).
    async fn query_points(&self, query: &PointsQuery<'_>) -> Result<Option<Value>, RetrievalError>;

    /// Legacy search capability with the same semantics.
    async fn search_points(&self, query: &PointsQuery<'_>)
        -> Result<Option<Value>, RetrievalError>;

    /// Direct point lookup by id, payload included, no scoring.
    async fn retrieve_points(&self, ids: &[PointId]) -> Result<Value, RetrievalError>;
}
