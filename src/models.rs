//! Core data models used throughout the retrieval layer.
//!
//! [`RawScoredRecord`] is what the backend hands back, [`PolicyChunk`] is
//! what every caller receives, and [`SearchRequest`] is what callers send.
//! All of them are built per request and never cached.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Arbitrary key/value payload stored alongside a point in the backend.
pub type Payload = Map<String, Value>;

/// Default number of results for a search.
pub const DEFAULT_LIMIT: i64 = 5;
/// Smallest limit sent to the backend.
pub const MIN_LIMIT: i64 = 1;
/// Largest limit sent to the backend.
pub const MAX_LIMIT: i64 = 50;

/// Clamp a requested result count into `[MIN_LIMIT, MAX_LIMIT]`.
///
/// Out-of-range values are corrected silently, never rejected.
pub fn clamp_limit(limit: i64) -> u64 {
    limit.clamp(MIN_LIMIT, MAX_LIMIT) as u64
}

/// Backend-native point identifier: an unsigned integer or a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl PointId {
    /// Parse an identifier typed by a caller.
    ///
    /// Decimal digits become [`PointId::Num`], UUID text becomes the
    /// canonical hyphenated [`PointId::Uuid`]. Anything else returns `None`:
    /// no point can carry such an id.
    pub fn parse(input: &str) -> Option<PointId> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if input.bytes().all(|b| b.is_ascii_digit()) {
            return input.parse::<u64>().ok().map(PointId::Num);
        }
        uuid::Uuid::parse_str(input)
            .ok()
            .map(|u| PointId::Uuid(u.hyphenated().to_string()))
    }

    /// Interpret a JSON id argument (`string | integer`) from a tool call.
    pub fn from_argument(value: &Value) -> Option<PointId> {
        match value {
            Value::Number(n) => n.as_u64().map(PointId::Num),
            Value::String(s) => PointId::parse(s),
            _ => None,
        }
    }

    /// Read an id as reported by the backend.
    ///
    /// Lenient on purpose: backend ids are taken verbatim, only emptiness
    /// and non-scalar values are refused.
    pub fn from_backend(value: &Value) -> Option<PointId> {
        match value {
            Value::Number(n) => n.as_u64().map(PointId::Num),
            Value::String(s) if !s.is_empty() => Some(PointId::Uuid(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Uuid(s) => f.write_str(s),
        }
    }
}

/// A backend result entry: identifier, payload, and similarity when computed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawScoredRecord {
    pub id: PointId,
    pub payload: Payload,
    /// `None` for point lookups, where no similarity is computed.
    pub score: Option<f64>,
}

impl RawScoredRecord {
    /// Read one element of a backend result array.
    ///
    /// Returns `None` when the element is not an object, has no usable id,
    /// or carries a payload that is neither an object nor null.
    pub fn from_value(value: &Value) -> Option<RawScoredRecord> {
        let obj = value.as_object()?;
        let id = PointId::from_backend(obj.get("id")?)?;
        let payload = match obj.get("payload") {
            None | Some(Value::Null) => Payload::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return None,
        };
        let score = obj.get("score").and_then(Value::as_f64);
        Some(RawScoredRecord { id, payload, score })
    }
}

/// `page` after best-effort integer coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageValue {
    Number(i64),
    /// Coercion failed; the payload value is kept as it was.
    Raw(Value),
}

/// A heading path: either a single string or an ordered list of headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TitlePath {
    Single(String),
    Path(Vec<String>),
}

/// Canonical, strictly-shaped record returned to every caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyChunk {
    /// Always non-empty, stringified even for numeric backend ids.
    pub id: String,
    pub text: Option<String>,
    pub page: Option<PageValue>,
    pub title_path: Option<TitlePath>,
    pub revised: Option<String>,
    pub source: Option<String>,
    pub score: Option<f64>,
    /// The untouched backend payload.
    pub metadata: Payload,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Read a requested limit from whatever numeric form the caller sent.
///
/// Integers beyond `i64` and floats saturate (`1e20` → `i64::MAX`), floats
/// truncate toward zero, and numeric strings (query strings deliver every
/// value as text) are parsed the same way. `null` means the default.
fn deserialize_limit<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    limit_from_value(&value)
        .ok_or_else(|| de::Error::custom(format!("limit must be a number, got {}", value)))
}

fn limit_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Null => Some(DEFAULT_LIMIT),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| !f.is_nan())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// Input to [`Repository::search`](crate::repository::Repository::search).
///
/// Deserializes from the `search_policy_chunks` tool arguments and the
/// `/debug/search` query string alike.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub doctype: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    /// Inclusive lower bound on `revised`, passed to the backend verbatim.
    #[serde(default)]
    pub revised_after: Option<String>,
    /// Any JSON number or numeric string; clamped later, never rejected
    /// for being out of range.
    #[serde(default = "default_limit", deserialize_with = "deserialize_limit")]
    pub limit: i64,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            doctype: None,
            department: None,
            revised_after: None,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn doctype(mut self, doctype: impl Into<String>) -> Self {
        self.doctype = Some(doctype.into());
        self
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn revised_after(mut self, date: impl Into<String>) -> Self {
        self.revised_after = Some(date.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

/// Result shape of `search_policy_chunks` and `GET /debug/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Normalized chunks in backend relevance order.
    pub items: Vec<PolicyChunk>,
    /// Untouched backend body when its shape was not recognized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
}

/// Result shape of `get_policy_chunk` and `GET /debug/chunk/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
    pub item: Option<PolicyChunk>,
}
