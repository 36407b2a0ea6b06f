//! Raw backend record → [`PolicyChunk`].
//!
//! Each typed field is resolved by walking a fixed alias list against the
//! payload and taking the first key whose value is present and non-null.
//! The mapping is total: a missing alias yields `None`, an unexpected type
//! is converted or passed through, and nothing here can fail.
//!
//! | Field | Aliases (priority order) |
//! |-------|--------------------------|
//! | `text` | `text`, `chunk`, `content` |
//! | `page` | `page` |
//! | `title_path` | `title_path`, `title`, `heading` |
//! | `revised` | `revised`, `revised_at` |
//! | `source` | `source`, `url`, `file` |

use serde_json::Value;

use crate::models::{PageValue, Payload, PolicyChunk, RawScoredRecord, TitlePath};

pub const TEXT_KEYS: &[&str] = &["text", "chunk", "content"];
pub const PAGE_KEYS: &[&str] = &["page"];
pub const TITLE_PATH_KEYS: &[&str] = &["title_path", "title", "heading"];
pub const REVISED_KEYS: &[&str] = &["revised", "revised_at"];
pub const SOURCE_KEYS: &[&str] = &["source", "url", "file"];

/// First non-null value among `keys`, in order.
pub fn pick<'a>(payload: &'a Payload, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find(|value| !value.is_null())
}

/// Build the canonical record. The payload moves into `metadata` unchanged.
pub fn normalize(raw: RawScoredRecord) -> PolicyChunk {
    let payload = raw.payload;

    PolicyChunk {
        id: raw.id.to_string(),
        text: pick(&payload, TEXT_KEYS).map(as_text),
        page: pick(&payload, PAGE_KEYS).map(coerce_page),
        title_path: pick(&payload, TITLE_PATH_KEYS).map(as_title_path),
        revised: pick(&payload, REVISED_KEYS).map(as_text),
        source: pick(&payload, SOURCE_KEYS).map(as_text),
        score: raw.score,
        metadata: payload,
    }
}

/// Strings verbatim; any other value as its JSON text.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_title_path(value: &Value) -> TitlePath {
    match value {
        Value::Array(items) => TitlePath::Path(items.iter().map(as_text).collect()),
        other => TitlePath::Single(as_text(other)),
    }
}

/// Integer coercion in the spirit of `int(x)`: integers stay, finite floats
/// truncate toward zero, numeric strings parse (surrounding whitespace and
/// digit-group underscores allowed). Everything else is kept raw.
fn coerce_page(value: &Value) -> PageValue {
    let coerced = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => parse_int(s),
        _ => None,
    };
    match coerced {
        Some(n) => PageValue::Number(n),
        None => PageValue::Raw(value.clone()),
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let digits = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }
    s.replace('_', "").parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointId;
    use serde_json::json;

    fn record(payload: Value) -> RawScoredRecord {
        RawScoredRecord {
            id: PointId::Num(7),
            payload: payload.as_object().cloned().unwrap_or_default(),
            score: None,
        }
    }

    #[test]
    fn test_first_alias_wins() {
        let chunk = normalize(record(json!({
            "chunk": "second",
            "text": "first",
            "content": "third",
            "url": "https://example.test/b",
            "source": "handbook.pdf",
            "heading": "H",
            "title_path": ["Part 1", "Leave"],
            "revised_at": "2023-01-01",
            "revised": "2024-02-01"
        })));
        assert_eq!(chunk.text.as_deref(), Some("first"));
        assert_eq!(chunk.source.as_deref(), Some("handbook.pdf"));
        assert_eq!(
            chunk.title_path,
            Some(TitlePath::Path(vec!["Part 1".into(), "Leave".into()]))
        );
        assert_eq!(chunk.revised.as_deref(), Some("2024-02-01"));
    }

    #[test]
    fn test_null_alias_falls_through() {
        let chunk = normalize(record(json!({
            "text": null,
            "content": "from content",
            "title": "Benefits"
        })));
        assert_eq!(chunk.text.as_deref(), Some("from content"));
        assert_eq!(chunk.title_path, Some(TitlePath::Single("Benefits".into())));
    }

    #[test]
    fn test_absent_aliases_yield_none() {
        let chunk = normalize(record(json!({"unrelated": true})));
        assert_eq!(chunk.text, None);
        assert_eq!(chunk.page, None);
        assert_eq!(chunk.title_path, None);
        assert_eq!(chunk.revised, None);
        assert_eq!(chunk.source, None);
        assert_eq!(chunk.id, "7");
    }

    #[test]
    fn test_page_coercion() {
        assert_eq!(coerce_page(&json!(3)), PageValue::Number(3));
        assert_eq!(coerce_page(&json!("12")), PageValue::Number(12));
        assert_eq!(coerce_page(&json!(" 4 ")), PageValue::Number(4));
        assert_eq!(coerce_page(&json!("1_000")), PageValue::Number(1000));
        assert_eq!(coerce_page(&json!(2.9)), PageValue::Number(2));
        assert_eq!(
            coerce_page(&json!("3.5")),
            PageValue::Raw(json!("3.5"))
        );
        assert_eq!(coerce_page(&json!(true)), PageValue::Raw(json!(true)));
        assert_eq!(coerce_page(&json!([1])), PageValue::Raw(json!([1])));
    }

    #[test]
    fn test_non_numeric_page_is_kept_raw() {
        let chunk = normalize(record(json!({"page": "not-a-number"})));
        assert_eq!(chunk.page, Some(PageValue::Raw(json!("not-a-number"))));
    }

    #[test]
    fn test_metadata_is_untouched_payload() {
        let payload = json!({
            "text": "body",
            "page": "iv",
            "nested": {"a": [1, 2, {"b": null}]},
            "title_path": ["x"],
            "zeta": 1,
            "alpha": 2
        });
        let chunk = normalize(record(payload.clone()));
        assert_eq!(Value::Object(chunk.metadata.clone()), payload);
        assert_eq!(
            serde_json::to_string(&chunk.metadata).unwrap(),
            serde_json::to_string(&payload).unwrap()
        );
    }

    #[test]
    fn test_score_and_uuid_id_carried() {
        let chunk = normalize(RawScoredRecord {
            id: PointId::Uuid("5c56c793-69f3-4fbf-87e6-c4bf54c28c26".into()),
            payload: Payload::new(),
            score: Some(0.42),
        });
        assert_eq!(chunk.id, "5c56c793-69f3-4fbf-87e6-c4bf54c28c26");
        assert_eq!(chunk.score, Some(0.42));
        assert!(chunk.metadata.is_empty());
    }

    #[test]
    fn test_non_string_text_is_stringified() {
        let chunk = normalize(record(json!({"text": 99, "source": {"file": "a"}})));
        assert_eq!(chunk.text.as_deref(), Some("99"));
        assert_eq!(chunk.source.as_deref(), Some(r#"{"file":"a"}"#));
    }
}
