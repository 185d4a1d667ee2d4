//! Firestore typed values and their REST JSON encoding.
//!
//! The REST API wraps every field in a single-key object naming its type,
//! e.g. `{"stringValue": "Pune"}` or `{"integerValue": "42"}`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value as Json};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::errors::{FirebaseError, FirebaseResult};

/// Field map of a document
pub type Fields = BTreeMap<String, Value>;

/// A single Firestore field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
    Map(Fields),
    /// Write-only sentinel resolved by the server at commit time
    ServerTimestamp,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Ordering between values of the same type; `None` across types
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Encode into the REST representation
    pub fn to_json(&self) -> FirebaseResult<Json> {
        Ok(match self {
            Value::Null => json!({ "nullValue": null }),
            Value::Boolean(b) => json!({ "booleanValue": b }),
            Value::Integer(i) => json!({ "integerValue": i.to_string() }),
            Value::Double(d) => json!({ "doubleValue": d }),
            Value::String(s) => json!({ "stringValue": s }),
            Value::Timestamp(ts) => {
                json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::AutoSi, true) })
            }
            Value::Array(values) => {
                let values = values
                    .iter()
                    .map(Value::to_json)
                    .collect::<FirebaseResult<Vec<_>>>()?;
                json!({ "arrayValue": { "values": values } })
            }
            Value::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields)? } }),
            Value::ServerTimestamp => {
                return Err(FirebaseError::InvalidValue(
                    "server timestamp must be sent as a field transform".to_string(),
                ))
            }
        })
    }

    /// Decode from the REST representation
    pub fn from_json(raw: &Json) -> FirebaseResult<Value> {
        let object = raw
            .as_object()
            .ok_or_else(|| FirebaseError::InvalidValue(format!("expected object, got {}", raw)))?;

        let (kind, inner) = object
            .iter()
            .next()
            .ok_or_else(|| FirebaseError::InvalidValue("empty value object".to_string()))?;

        match kind.as_str() {
            "nullValue" => Ok(Value::Null),
            "booleanValue" => inner
                .as_bool()
                .map(Value::Boolean)
                .ok_or_else(|| invalid(kind, inner)),
            // integers travel as strings, but accept bare numbers too
            "integerValue" => match inner {
                Json::String(s) => s.parse().map(Value::Integer).map_err(|_| invalid(kind, inner)),
                Json::Number(n) => n.as_i64().map(Value::Integer).ok_or_else(|| invalid(kind, inner)),
                _ => Err(invalid(kind, inner)),
            },
            "doubleValue" => inner
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| invalid(kind, inner)),
            "stringValue" | "referenceValue" => inner
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| invalid(kind, inner)),
            "timestampValue" => inner
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc)))
                .ok_or_else(|| invalid(kind, inner)),
            "arrayValue" => {
                let values = match inner.get("values") {
                    Some(Json::Array(values)) => values
                        .iter()
                        .map(Value::from_json)
                        .collect::<FirebaseResult<Vec<_>>>()?,
                    _ => Vec::new(),
                };
                Ok(Value::Array(values))
            }
            "mapValue" => {
                let fields = match inner.get("fields") {
                    Some(fields) => decode_fields(fields)?,
                    None => Fields::new(),
                };
                Ok(Value::Map(fields))
            }
            other => Err(FirebaseError::InvalidValue(format!(
                "unsupported value type {}",
                other
            ))),
        }
    }
}

fn invalid(kind: &str, inner: &Json) -> FirebaseError {
    FirebaseError::InvalidValue(format!("{} with payload {}", kind, inner))
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

/// Encode a field map, skipping server-timestamp sentinels (they become
/// field transforms on the write instead).
pub fn encode_fields(fields: &Fields) -> FirebaseResult<Json> {
    let mut out = Map::new();
    for (name, value) in fields {
        if matches!(value, Value::ServerTimestamp) {
            continue;
        }
        out.insert(name.clone(), value.to_json()?);
    }
    Ok(Json::Object(out))
}

/// Decode the `fields` object of a REST document
pub fn decode_fields(raw: &Json) -> FirebaseResult<Fields> {
    match raw {
        Json::Null => Ok(Fields::new()),
        Json::Object(map) => map
            .iter()
            .map(|(name, value)| Ok((name.clone(), Value::from_json(value)?)))
            .collect(),
        other => Err(FirebaseError::InvalidValue(format!(
            "expected fields object, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_document_fields() {
        let raw = json!({
            "title": { "stringValue": "Clerk" },
            "openings": { "integerValue": "3" },
            "remote": { "booleanValue": false },
            "expiresAt": { "timestampValue": "2026-10-21T10:30:00.123456Z" },
            "tags": { "arrayValue": { "values": [{ "stringValue": "office" }] } },
            "meta": { "mapValue": { "fields": { "source": { "stringValue": "app" } } } },
            "empty": { "arrayValue": {} },
            "deleted": { "nullValue": null }
        });

        let fields = decode_fields(&raw).unwrap();
        assert_eq!(fields["title"], Value::String("Clerk".to_string()));
        assert_eq!(fields["openings"], Value::Integer(3));
        assert_eq!(fields["remote"], Value::Boolean(false));
        assert_eq!(
            fields["expiresAt"].as_timestamp().unwrap().timestamp(),
            Utc.with_ymd_and_hms(2026, 10, 21, 10, 30, 0).unwrap().timestamp()
        );
        assert_eq!(fields["tags"], Value::Array(vec![Value::from("office")]));
        assert_eq!(fields["empty"], Value::Array(vec![]));
        assert_eq!(fields["deleted"], Value::Null);
        match &fields["meta"] {
            Value::Map(inner) => assert_eq!(inner["source"], Value::from("app")),
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_skips_server_timestamp() {
        let mut fields = Fields::new();
        fields.insert("title".to_string(), Value::from("Clerk"));
        fields.insert("createdAt".to_string(), Value::ServerTimestamp);
        fields.insert("count".to_string(), Value::Integer(7));

        let json = encode_fields(&fields).unwrap();
        assert_eq!(json["title"]["stringValue"], "Clerk");
        assert_eq!(json["count"]["integerValue"], "7");
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_timestamp_encodes_as_utc_rfc3339() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let json = Value::Timestamp(ts).to_json().unwrap();
        assert_eq!(json["timestampValue"], "2026-10-19T00:00:00Z");
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(Value::from_json(&json!("bare")).is_err());
        assert!(Value::from_json(&json!({})).is_err());
        assert!(Value::from_json(&json!({ "integerValue": "twelve" })).is_err());
        assert!(Value::from_json(&json!({ "geoPointValue": {} })).is_err());
        assert!(Value::ServerTimestamp.to_json().is_err());
    }

    #[test]
    fn test_compare_only_within_type() {
        let early = Value::Timestamp(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let late = Value::Timestamp(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(early.compare(&late), Some(Ordering::Less));
        assert_eq!(Value::Integer(2).compare(&Value::Double(1.5)), Some(Ordering::Greater));
        assert_eq!(Value::from("a").compare(&Value::Integer(1)), None);
        assert_eq!(early.compare(&Value::from("2026-01-01")), None);
    }
}
