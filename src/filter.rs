//! Facets → backend-native conjunctive filter.
//!
//! The output serializes to the Qdrant filter JSON shape:
//!
//! ```json
//! { "must": [
//!     { "key": "doctype", "match": { "value": "HR" } },
//!     { "key": "revised", "range": { "gte": "2024-01-01" } }
//! ] }
//! ```
//!
//! Only `must` (AND) is produced. No facets means no filter at all, not an
//! empty one.

use serde::Serialize;
use serde_json::Value;

pub const DOCTYPE_FIELD: &str = "doctype";
pub const DEPARTMENT_FIELD: &str = "department";
pub const REVISED_FIELD: &str = "revised";

/// Implicit conjunction of field conditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    pub must: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Condition {
    /// Exact keyword match.
    Match {
        key: String,
        #[serde(rename = "match")]
        value: MatchValue,
    },
    /// Inclusive lower bound.
    Range { key: String, range: RangeBound },
}

impl Condition {
    pub fn key(&self) -> &str {
        match self {
            Condition::Match { key, .. } | Condition::Range { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchValue {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RangeBound {
    /// Dedicated datetime range; the bound is the caller's literal.
    Datetime { gte: String },
    /// Generic range. Numeric literals are sent as numbers, anything else
    /// as the original string.
    Numeric { gte: Value },
}

/// Which range condition the connected backend understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStyle {
    Datetime,
    Numeric,
}

#[derive(Debug, Clone, Copy)]
pub struct FilterBuilder {
    range_style: RangeStyle,
}

impl FilterBuilder {
    pub fn new(range_style: RangeStyle) -> Self {
        Self { range_style }
    }

    pub fn range_style(&self) -> RangeStyle {
        self.range_style
    }

    /// One condition per present facet; `None` when there are none.
    ///
    /// Empty strings count as absent. `revised_after` is not parsed.
    pub fn build(
        &self,
        doctype: Option<&str>,
        department: Option<&str>,
        revised_after: Option<&str>,
    ) -> Option<Filter> {
        let mut must = Vec::new();

        if let Some(doctype) = present(doctype) {
            must.push(match_condition(DOCTYPE_FIELD, doctype));
        }
        if let Some(department) = present(department) {
            must.push(match_condition(DEPARTMENT_FIELD, department));
        }
        if let Some(date) = present(revised_after) {
            let range = match self.range_style {
                RangeStyle::Datetime => RangeBound::Datetime {
                    gte: date.to_string(),
                },
                RangeStyle::Numeric => RangeBound::Numeric {
                    gte: numeric_bound(date),
                },
            };
            must.push(Condition::Range {
                key: REVISED_FIELD.to_string(),
                range,
            });
        }

        if must.is_empty() {
            None
        } else {
            Some(Filter { must })
        }
    }
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self::new(RangeStyle::Datetime)
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn match_condition(key: &str, value: &str) -> Condition {
    Condition::Match {
        key: key.to_string(),
        value: MatchValue {
            value: value.to_string(),
        },
    }
}

fn numeric_bound(literal: &str) -> Value {
    literal
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(literal.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_facets_is_no_filter() {
        let b = FilterBuilder::default();
        assert_eq!(b.build(None, None, None), None);
        assert_eq!(b.build(Some(""), Some(""), Some("")), None);
    }

    #[test]
    fn test_one_condition_per_facet() {
        let b = FilterBuilder::default();
        let combos = [
            (Some("HR"), None, None, 1),
            (None, Some("Finance"), None, 1),
            (None, None, Some("2024-01-01"), 1),
            (Some("HR"), Some("Finance"), None, 2),
            (Some("HR"), None, Some("2024-01-01"), 2),
            (Some("HR"), Some("Finance"), Some("2024-01-01"), 3),
        ];
        for (doctype, department, revised, expected) in combos {
            let filter = b.build(doctype, department, revised).unwrap();
            assert_eq!(filter.must.len(), expected);
        }
    }

    #[test]
    fn test_serializes_to_qdrant_shape() {
        let filter = FilterBuilder::default()
            .build(Some("HR"), Some("People"), Some("2024-01-01T00:00:00Z"))
            .unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"must": [
                {"key": "doctype", "match": {"value": "HR"}},
                {"key": "department", "match": {"value": "People"}},
                {"key": "revised", "range": {"gte": "2024-01-01T00:00:00Z"}}
            ]})
        );
    }

    #[test]
    fn test_revised_after_passed_verbatim() {
        let filter = FilterBuilder::default()
            .build(None, None, Some("last tuesday"))
            .unwrap();
        assert_eq!(
            filter.must[0],
            Condition::Range {
                key: "revised".into(),
                range: RangeBound::Datetime {
                    gte: "last tuesday".into()
                }
            }
        );
    }

    #[test]
    fn test_numeric_range_fallback() {
        let b = FilterBuilder::new(RangeStyle::Numeric);
        let numeric = b.build(None, None, Some("20240101")).unwrap();
        assert_eq!(
            serde_json::to_value(&numeric.must[0]).unwrap(),
            json!({"key": "revised", "range": {"gte": 20240101.0}})
        );
        let textual = b.build(None, None, Some("2024-01-01")).unwrap();
        assert_eq!(
            serde_json::to_value(&textual.must[0]).unwrap(),
            json!({"key": "revised", "range": {"gte": "2024-01-01"}})
        );
    }

    #[test]
    fn test_condition_key() {
        let filter = FilterBuilder::default()
            .build(Some("HR"), None, Some("2024"))
            .unwrap();
        let keys: Vec<&str> = filter.must.iter().map(Condition::key).collect();
        assert_eq!(keys, vec!["doctype", "revised"]);
    }
}
