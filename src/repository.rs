//! Retrieval composition root.
//!
//! [`Repository`] owns one [`Embedder`] and one [`VectorBackend`] and
//! exposes the only two operations callers use:
//!
//! ```text
//! search(request)
//!   ├─ clamp limit to [1, 50]
//!   ├─ embed(query)                      ── 1 call to the embedding provider
//!   ├─ build filter from facets
//!   ├─ invoke first available strategy   ── 1 call to the backend
//!   └─ normalize each record, backend order kept
//!
//! get_by_id(id)
//!   ├─ retrieve point                    ── 1 call to the backend
//!   └─ normalize (zero or one record)
//! ```
//!
//! The repository holds no per-request state. It is `Send + Sync` and meant
//! to be shared behind an `Arc` by concurrent callers.

use std::sync::Arc;

use crate::backend::qdrant::QdrantBackend;
use crate::backend::{PointsQuery, VectorBackend};
use crate::config::Config;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{RetrievalError, UpstreamError};
use crate::filter::{FilterBuilder, RangeStyle};
use crate::invoker::{self, RawResults};
use crate::models::{clamp_limit, PointId, PolicyChunk, SearchRequest, SearchResponse};
use crate::normalize::normalize;

pub struct Repository {
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn VectorBackend>,
    vector_name: Option<String>,
    filters: FilterBuilder,
}

impl Repository {
    /// Compose a repository from already-built parts.
    ///
    /// The range condition style is fixed here from the backend's
    /// advertised capabilities.
    pub fn new(embedder: Arc<dyn Embedder>, backend: Arc<dyn VectorBackend>) -> Self {
        let range_style = if backend.supports_datetime_range() {
            RangeStyle::Datetime
        } else {
            RangeStyle::Numeric
        };
        Self {
            embedder,
            backend,
            vector_name: None,
            filters: FilterBuilder::new(range_style),
        }
    }

    /// Search a named vector instead of the collection default.
    pub fn with_vector_name(mut self, vector_name: Option<String>) -> Self {
        self.vector_name = vector_name;
        self
    }

    /// Build the OpenAI embedder and the Qdrant backend from configuration.
    ///
    /// Probes the backend version once; see [`QdrantBackend::connect`].
    pub async fn connect(config: &Config) -> Result<Self, RetrievalError> {
        let embedder = OpenAIEmbedder::new(&config.embedding)?;
        let backend = QdrantBackend::connect(&config.backend).await?;
        tracing::info!(
            collection = %config.backend.collection,
            model = %config.embedding.model,
            vector = config.backend.vector_name.as_deref().unwrap_or("<default>"),
            "repository ready"
        );
        Ok(Self::new(Arc::new(embedder), Arc::new(backend))
            .with_vector_name(config.backend.vector_name.clone()))
    }

    /// Semantic search with optional facets.
    ///
    /// # Errors
    ///
    /// - [`RetrievalError::EmptyQuery`] before any outbound call.
    /// - [`RetrievalError::Embedding`] / [`RetrievalError::Backend`] from
    ///   the providers, unmodified and not retried.
    /// - [`RetrievalError::Incompatible`] when the backend exposes no
    ///   known search capability.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, RetrievalError> {
        if request.query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        let limit = clamp_limit(request.limit);

        let vector = self.embedder.embed(&request.query).await?;
        let filter = self.filters.build(
            request.doctype.as_deref(),
            request.department.as_deref(),
            request.revised_after.as_deref(),
        );

        let query = PointsQuery {
            vector: &vector,
            using: self.vector_name.as_deref(),
            filter: filter.as_ref(),
            limit,
        };

        let (_, results) = invoker::invoke(self.backend.as_ref(), &query).await?;
        match results {
            RawResults::Points(records) => {
                tracing::debug!(results = records.len(), "search complete");
                Ok(SearchResponse {
                    items: records.into_iter().map(normalize).collect(),
                    raw_response: None,
                })
            }
            RawResults::Unrecognized(body) => {
                tracing::warn!("backend search response has an unknown shape; passing it through");
                Ok(SearchResponse {
                    items: Vec::new(),
                    raw_response: Some(body),
                })
            }
        }
    }

    /// Direct lookup. `Ok(None)` when the backend holds no such point.
    ///
    /// A retrieve response in no known shape is a
    /// [`RetrievalError::Backend`] error, never `None`.
    pub async fn get_by_id(&self, id: &PointId) -> Result<Option<PolicyChunk>, RetrievalError> {
        let response = self
            .backend
            .retrieve_points(std::slice::from_ref(id))
            .await?;

        match invoker::extract_points(response) {
            RawResults::Points(records) => Ok(records.into_iter().next().map(normalize)),
            RawResults::Unrecognized(body) => {
                tracing::warn!(%id, "backend retrieve response has an unknown shape");
                Err(RetrievalError::Backend(UpstreamError::Malformed(format!(
                    "unrecognized retrieve response: {}",
                    body
                ))))
            }
        }
    }

    /// Lookup by a caller-typed id.
    ///
    /// Text that is neither an unsigned integer nor a UUID cannot name a
    /// point, so it is reported as not found without contacting the backend.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<PolicyChunk>, RetrievalError> {
        match PointId::parse(key) {
            Some(id) => self.get_by_id(&id).await,
            None => {
                tracing::debug!(key, "id is not a valid point id");
                Ok(None)
            }
        }
    }
}
