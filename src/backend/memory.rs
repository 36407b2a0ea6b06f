//! In-memory [`VectorBackend`] implementation for testing.
//!
//! Points live in a `Vec` behind `std::sync::RwLock`. Search is brute-force
//! cosine similarity over every stored vector, after evaluating the filter
//! against each payload. Datetime range bounds compare as strings, which
//! matches chronological order for uniformly formatted ISO-8601 values.
//!
//! Which search endpoints exist is configurable through [`ApiSurface`], so
//! tests can stand in for modern, legacy-only, and incompatible servers.
//! Responses use the Qdrant REST shapes: `{"result": {"points": [...]}}`
//! for query, `{"result": [...]}` for search and retrieve.

use std::cmp::Ordering;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{PointsQuery, VectorBackend};
use crate::error::RetrievalError;
use crate::filter::{Condition, Filter, RangeBound};
use crate::models::{Payload, PointId};

/// Search endpoints exposed by an [`InMemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiSurface {
    /// Both query and legacy search.
    Modern,
    /// Legacy search only.
    Legacy,
    /// Neither search endpoint; only retrieve works.
    Neither,
}

struct StoredPoint {
    id: PointId,
    vector: Vec<f32>,
    payload: Payload,
}

/// In-memory backend for tests. Seed it with [`InMemoryBackend::upsert`].
pub struct InMemoryBackend {
    points: RwLock<Vec<StoredPoint>>,
    surface: ApiSurface,
    datetime_range: bool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_surface(ApiSurface::Modern)
    }

    pub fn with_surface(surface: ApiSurface) -> Self {
        Self {
            points: RwLock::new(Vec::new()),
            surface,
            datetime_range: true,
        }
    }

    /// Advertise only the generic range condition.
    pub fn without_datetime_range(mut self) -> Self {
        self.datetime_range = false;
        self
    }

    /// Insert or replace a point.
    ///
    /// Test fixture setup only; the retrieval layer itself never writes.
    pub fn upsert(&self, id: PointId, vector: Vec<f32>, payload: Payload) {
        let mut points = self.points.write().unwrap_or_else(|e| e.into_inner());
        points.retain(|p| p.id != id);
        points.push(StoredPoint {
            id,
            vector,
            payload,
        });
    }

    pub fn len(&self) -> usize {
        self.points.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scored(&self, query: &PointsQuery<'_>) -> Vec<Value> {
        let points = self.points.read().unwrap_or_else(|e| e.into_inner());
        let mut hits: Vec<(f32, &StoredPoint)> = points
            .iter()
            .filter(|p| query.filter.map_or(true, |f| filter_matches(f, &p.payload)))
            .map(|p| (cosine_sim(query.vector, &p.vector), p))
            .collect();
        hits.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        hits.truncate(query.limit as usize);

        hits.into_iter()
            .map(|(score, p)| {
                json!({
                    "id": p.id,
                    "version": 0,
                    "score": score,
                    "payload": p.payload,
                })
            })
            .collect()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorBackend for InMemoryBackend {
    fn supports_datetime_range(&self) -> bool {
        self.datetime_range
    }

    async fn query_points(&self, query: &PointsQuery<'_>) -> Result<Option<Value>, RetrievalError> {
        if self.surface != ApiSurface::Modern {
            return Ok(None);
        }
        Ok(Some(json!({
            "result": { "points": self.scored(query) },
            "status": "ok",
        })))
    }

    async fn search_points(
        &self,
        query: &PointsQuery<'_>,
    ) -> Result<Option<Value>, RetrievalError> {
        if self.surface == ApiSurface::Neither {
            return Ok(None);
        }
        Ok(Some(json!({
            "result": self.scored(query),
            "status": "ok",
        })))
    }

    async fn retrieve_points(&self, ids: &[PointId]) -> Result<Value, RetrievalError> {
        let points = self.points.read().unwrap_or_else(|e| e.into_inner());
        let found: Vec<Value> = points
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| json!({ "id": p.id, "payload": p.payload }))
            .collect();
        Ok(json!({ "result": found, "status": "ok" }))
    }
}

fn filter_matches(filter: &Filter, payload: &Payload) -> bool {
    filter.must.iter().all(|c| condition_matches(c, payload))
}

fn condition_matches(condition: &Condition, payload: &Payload) -> bool {
    let Some(field) = payload.get(condition.key()) else {
        return false;
    };
    match condition {
        Condition::Match { value, .. } => match field {
            Value::Array(items) => items.iter().any(|i| i.as_str() == Some(&value.value)),
            other => other.as_str() == Some(&value.value),
        },
        Condition::Range { range, .. } => match range {
            RangeBound::Datetime { gte } => field.as_str().is_some_and(|s| s >= gte.as_str()),
            RangeBound::Numeric { gte } => match (field, gte) {
                (Value::Number(a), Value::Number(b)) => {
                    matches!((a.as_f64(), b.as_f64()), (Some(a), Some(b)) if a >= b)
                }
                (Value::String(a), Value::String(b)) => a >= b,
                _ => false,
            },
        },
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterBuilder, RangeStyle};

    fn payload(v: Value) -> Payload {
        v.as_object().cloned().unwrap_or_default()
    }

    fn seeded(surface: ApiSurface) -> InMemoryBackend {
        let backend = InMemoryBackend::with_surface(surface);
        backend.upsert(
            PointId::Num(1),
            vec![1.0, 0.0],
            payload(json!({"text": "vacation", "doctype": "HR", "revised": "2024-03-01"})),
        );
        backend.upsert(
            PointId::Num(2),
            vec![0.7, 0.7],
            payload(json!({"text": "travel", "doctype": "Finance", "revised": "2023-06-01"})),
        );
        backend.upsert(
            PointId::Num(3),
            vec![0.0, 1.0],
            payload(json!({"text": "security", "doctype": ["HR", "IT"], "revised": "2022-01-01"})),
        );
        backend
    }

    fn ids(points: &Value) -> Vec<u64> {
        points
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let backend = seeded(ApiSurface::Modern);
        assert_eq!(backend.len(), 3);
        backend.upsert(PointId::Num(2), vec![0.7, 0.7], payload(json!({"text": "travel v2"})));
        assert_eq!(backend.len(), 3);

        let resp = backend.retrieve_points(&[PointId::Num(2)]).await.unwrap();
        assert_eq!(resp["result"][0]["payload"]["text"], json!("travel v2"));
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let backend = seeded(ApiSurface::Modern);
        let v = [1.0f32, 0.1];
        let resp = backend
            .query_points(&PointsQuery {
                vector: &v,
                using: None,
                filter: None,
                limit: 10,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&resp["result"]["points"]), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_filter_and_limit() {
        let backend = seeded(ApiSurface::Modern);
        let filter = FilterBuilder::default().build(Some("HR"), None, None).unwrap();
        let v = [0.0f32, 1.0];
        let resp = backend
            .search_points(&PointsQuery {
                vector: &v,
                using: None,
                filter: Some(&filter),
                limit: 1,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&resp["result"]), vec![3]);
    }

    #[tokio::test]
    async fn test_range_conditions() {
        let backend = seeded(ApiSurface::Modern);
        let v = [1.0f32, 0.0];
        for style in [RangeStyle::Datetime, RangeStyle::Numeric] {
            let filter = FilterBuilder::new(style)
                .build(None, None, Some("2023-01-01"))
                .unwrap();
            let resp = backend
                .search_points(&PointsQuery {
                    vector: &v,
                    using: None,
                    filter: Some(&filter),
                    limit: 10,
                })
                .await
                .unwrap()
                .unwrap();
            assert_eq!(ids(&resp["result"]), vec![1, 2]);
        }
    }

    #[tokio::test]
    async fn test_surface_controls_capabilities() {
        let v = [1.0f32, 0.0];
        let q = PointsQuery {
            vector: &v,
            using: None,
            filter: None,
            limit: 3,
        };
        let legacy = seeded(ApiSurface::Legacy);
        assert!(legacy.query_points(&q).await.unwrap().is_none());
        assert!(legacy.search_points(&q).await.unwrap().is_some());

        let neither = seeded(ApiSurface::Neither);
        assert!(neither.query_points(&q).await.unwrap().is_none());
        assert!(neither.search_points(&q).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retrieve_has_no_score() {
        let backend = seeded(ApiSurface::Modern);
        let resp = backend
            .retrieve_points(&[PointId::Num(2), PointId::Num(99)])
            .await
            .unwrap();
        let found = resp["result"].as_array().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["id"], json!(2));
        assert!(found[0].get("score").is_none());
    }

    #[test]
    fn test_upsert_replaces() {
        let backend = InMemoryBackend::new();
        assert!(backend.is_empty());
        backend.upsert(PointId::Num(1), vec![1.0], Payload::new());
        backend.upsert(PointId::Num(1), vec![0.5], Payload::new());
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_cosine() {
        assert!((cosine_sim(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_sim(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_sim(&[], &[]), 0.0);
        assert_eq!(cosine_sim(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
