//! Qdrant REST backend.
//!
//! Talks to the Qdrant HTTP API with `reqwest`, authenticating with the
//! `api-key` header:
//!
//! | Capability | Endpoint | Available since |
//! |------------|----------|-----------------|
//! | query (modern) | `POST /collections/{c}/points/query` | 1.10 |
//! | search (legacy) | `POST /collections/{c}/points/search` | 0.x |
//! | retrieve | `POST /collections/{c}/points` | 0.x |
//! | datetime range | `range: { gte: "<rfc3339>" }` on a datetime index | 1.8 |
//!
//! [`QdrantBackend::connect`] probes `GET /` once for the server version.
//! When the version is known, capabilities below their minimum version are
//! reported absent without sending a request. When it is unknown, an
//! endpoint is considered absent if the server answers 404/405 with a body
//! that is not a Qdrant status error (a missing collection also yields 404,
//! but with `{"status": {"error": ...}}`).

use async_trait::async_trait;
use reqwest::StatusCode;
use semver::Version;
use serde_json::{json, Value};

use super::{PointsQuery, VectorBackend};
use crate::config::BackendConfig;
use crate::error::{RetrievalError, UpstreamError};
use crate::models::PointId;

const QUERY_API_SINCE: Version = Version::new(1, 10, 0);
const DATETIME_RANGE_SINCE: Version = Version::new(1, 8, 0);

pub struct QdrantBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    collection: String,
    server_version: Option<Version>,
}

impl QdrantBackend {
    /// Create a client without contacting the server.
    ///
    /// The server version stays unknown, so every capability is assumed
    /// and absence is detected per call.
    pub fn new(config: &BackendConfig) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RetrievalError::Backend(e.into()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
            server_version: None,
        })
    }

    /// Create a client and probe the server version.
    ///
    /// A failed probe is logged and leaves the version unknown; it never
    /// fails construction.
    pub async fn connect(config: &BackendConfig) -> Result<Self, RetrievalError> {
        let mut backend = Self::new(config)?;
        backend.server_version = backend.probe_version().await;
        Ok(backend)
    }

    pub fn with_server_version(mut self, version: Option<Version>) -> Self {
        self.server_version = version;
        self
    }

    pub fn server_version(&self) -> Option<&Version> {
        self.server_version.as_ref()
    }

    fn has_query_api(&self) -> bool {
        self.server_version
            .as_ref()
            .map_or(true, |v| *v >= QUERY_API_SINCE)
    }

    async fn probe_version(&self) -> Option<Version> {
        let response = match self
            .client
            .get(format!("{}/", self.base_url))
            .header("api-key", &self.api_key)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = %r.status(), "qdrant version probe rejected; assuming all capabilities");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "qdrant version probe failed; assuming all capabilities");
                return None;
            }
        };

        let json: Value = match response.json().await {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "qdrant version probe returned a malformed body; assuming all capabilities");
                return None;
            }
        };
        let version = parse_version(&json);
        match &version {
            Some(v) => tracing::info!(version = %v, "connected to qdrant"),
            None => tracing::warn!("qdrant did not report a parseable version"),
        }
        version
    }

    fn points_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}/points{}",
            self.base_url, self.collection, suffix
        )
    }

    /// POST to an endpoint that may not exist on this server version.
    async fn post_capability(&self, url: &str, body: &Value) -> Result<Option<Value>, RetrievalError> {
        let response = self
            .client
            .post(url)
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| RetrievalError::Backend(e.into()))?;

        let status = response.status();
        if status.is_success() {
            let json = response
                .json()
                .await
                .map_err(|e| RetrievalError::Backend(e.into()))?;
            return Ok(Some(json));
        }

        let body_text = response.text().await.unwrap_or_default();
        if is_missing_endpoint(status, &body_text) {
            tracing::debug!(%url, %status, "endpoint not exposed by this qdrant server");
            return Ok(None);
        }

        Err(RetrievalError::Backend(UpstreamError::Status {
            status: status.as_u16(),
            body: body_text,
        }))
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    fn supports_datetime_range(&self) -> bool {
        self.server_version
            .as_ref()
            .map_or(true, |v| *v >= DATETIME_RANGE_SINCE)
    }

    async fn query_points(&self, query: &PointsQuery<'_>) -> Result<Option<Value>, RetrievalError> {
        if !self.has_query_api() {
            return Ok(None);
        }
        self.post_capability(&self.points_url("/query"), &query_body(query))
            .await
    }

    async fn search_points(
        &self,
        query: &PointsQuery<'_>,
    ) -> Result<Option<Value>, RetrievalError> {
        self.post_capability(&self.points_url("/search"), &search_body(query))
            .await
    }

    async fn retrieve_points(&self, ids: &[PointId]) -> Result<Value, RetrievalError> {
        let url = self.points_url("");
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&json!({
                "ids": ids,
                "with_payload": true,
                "with_vector": false,
            }))
            .send()
            .await
            .map_err(|e| RetrievalError::Backend(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Backend(UpstreamError::Status {
                status: status.as_u16(),
                body: body_text,
            }));
        }

        response
            .json()
            .await
            .map_err(|e| RetrievalError::Backend(e.into()))
    }
}

/// Body for `points/query`.
fn query_body(query: &PointsQuery<'_>) -> Value {
    let mut body = json!({
        "query": query.vector,
        "limit": query.limit,
        "with_payload": true,
        "with_vector": false,
    });
    if let Some(using) = query.using {
        body["using"] = json!(using);
    }
    if let Some(filter) = query.filter {
        body["filter"] = json!(filter);
    }
    body
}

/// Body for `points/search`. A named vector travels as `{name, vector}`.
fn search_body(query: &PointsQuery<'_>) -> Value {
    let vector = match query.using {
        Some(name) => json!({ "name": name, "vector": query.vector }),
        None => json!(query.vector),
    };
    let mut body = json!({
        "vector": vector,
        "limit": query.limit,
        "with_payload": true,
        "with_vector": false,
    });
    if let Some(filter) = query.filter {
        body["filter"] = json!(filter);
    }
    body
}

fn parse_version(root: &Value) -> Option<Version> {
    let raw = root.get("version")?.as_str()?;
    Version::parse(raw.trim_start_matches('v')).ok()
}

/// 404/405 from the router itself, as opposed to a Qdrant-level error.
fn is_missing_endpoint(status: StatusCode, body: &str) -> bool {
    if status != StatusCode::NOT_FOUND && status != StatusCode::METHOD_NOT_ALLOWED {
        return false;
    }
    let qdrant_error = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("status").cloned())
        .is_some_and(|s| s.get("error").is_some());
    !qdrant_error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterBuilder;

    fn config() -> BackendConfig {
        BackendConfig {
            url: "http://localhost:6333/".into(),
            api_key: "key".into(),
            collection: "policies".into(),
            vector_name: None,
        }
    }

    #[test]
    fn test_query_body_without_filter_has_no_filter_key() {
        let v = [0.1f32, 0.2];
        let body = query_body(&PointsQuery {
            vector: &v,
            using: None,
            filter: None,
            limit: 5,
        });
        assert!(body.get("filter").is_none());
        assert!(body.get("using").is_none());
        assert_eq!(body["limit"], json!(5));
        assert_eq!(body["with_payload"], json!(true));
        assert_eq!(body["with_vector"], json!(false));
        assert_eq!(body["query"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_query_body_with_using_and_filter() {
        let v = [1.0f32];
        let filter = FilterBuilder::default().build(Some("HR"), None, None).unwrap();
        let body = query_body(&PointsQuery {
            vector: &v,
            using: Some("dense"),
            filter: Some(&filter),
            limit: 3,
        });
        assert_eq!(body["using"], json!("dense"));
        assert_eq!(
            body["filter"],
            json!({"must": [{"key": "doctype", "match": {"value": "HR"}}]})
        );
    }

    #[test]
    fn test_search_body_named_vector() {
        let v = [1.0f32, 0.0];
        let named = search_body(&PointsQuery {
            vector: &v,
            using: Some("dense"),
            filter: None,
            limit: 2,
        });
        assert_eq!(named["vector"], json!({"name": "dense", "vector": [1.0, 0.0]}));

        let plain = search_body(&PointsQuery {
            vector: &v,
            using: None,
            filter: None,
            limit: 2,
        });
        assert_eq!(plain["vector"], json!([1.0, 0.0]));
        assert!(plain.get("filter").is_none());
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(
            parse_version(&json!({"title": "qdrant - vector search engine", "version": "1.9.2"})),
            Some(Version::new(1, 9, 2))
        );
        assert_eq!(parse_version(&json!({"version": "garbage"})), None);
        assert_eq!(parse_version(&json!({})), None);
    }

    #[test]
    fn test_missing_endpoint_detection() {
        assert!(is_missing_endpoint(StatusCode::NOT_FOUND, ""));
        assert!(is_missing_endpoint(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"));
        assert!(!is_missing_endpoint(
            StatusCode::NOT_FOUND,
            r#"{"status":{"error":"Not found: Collection `x` doesn't exist!"},"time":0.0}"#
        ));
        assert!(!is_missing_endpoint(StatusCode::BAD_REQUEST, ""));
        assert!(!is_missing_endpoint(StatusCode::INTERNAL_SERVER_ERROR, ""));
    }

    #[test]
    fn test_capabilities_follow_server_version() {
        let unknown = QdrantBackend::new(&config()).unwrap();
        assert!(unknown.has_query_api());
        assert!(unknown.supports_datetime_range());
        assert_eq!(unknown.points_url("/query"), "http://localhost:6333/collections/policies/points/query");

        let old = QdrantBackend::new(&config())
            .unwrap()
            .with_server_version(Some(Version::new(1, 7, 4)));
        assert!(!old.has_query_api());
        assert!(!old.supports_datetime_range());

        let mid = QdrantBackend::new(&config())
            .unwrap()
            .with_server_version(Some(Version::new(1, 9, 0)));
        assert!(!mid.has_query_api());
        assert!(mid.supports_datetime_range());

        let modern = QdrantBackend::new(&config())
            .unwrap()
            .with_server_version(Some(Version::new(1, 12, 1)));
        assert!(modern.has_query_api());
    }
}
