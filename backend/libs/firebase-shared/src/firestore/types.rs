use serde::Deserialize;
use serde_json::{json, Value as Json};

use super::value::{encode_fields, Fields, Value};
use crate::errors::FirebaseResult;

/// Comparison operators supported by structured queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOperator {
    LessThan,
    LessThanOrEqual,
    Equal,
    GreaterThanOrEqual,
    GreaterThan,
}

impl FieldOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOperator::LessThan => "LESS_THAN",
            FieldOperator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            FieldOperator::Equal => "EQUAL",
            FieldOperator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            FieldOperator::GreaterThan => "GREATER_THAN",
        }
    }
}

/// A single `field <op> value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FieldOperator,
    pub value: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, op: FieldOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    fn to_json(&self) -> FirebaseResult<Json> {
        Ok(json!({
            "fieldFilter": {
                "field": { "fieldPath": self.field },
                "op": self.op.as_str(),
                "value": self.value.to_json()?,
            }
        }))
    }
}

/// Build the `structuredQuery` body for `documents:runQuery`.
///
/// Several filters are combined with a composite AND.
pub fn structured_query(
    collection_id: &str,
    filters: &[FieldFilter],
    limit: Option<u32>,
) -> FirebaseResult<Json> {
    let mut query = json!({
        "from": [{ "collectionId": collection_id }],
    });

    match filters {
        [] => {}
        [single] => {
            query["where"] = single.to_json()?;
        }
        many => {
            let filters = many
                .iter()
                .map(FieldFilter::to_json)
                .collect::<FirebaseResult<Vec<_>>>()?;
            query["where"] = json!({
                "compositeFilter": { "op": "AND", "filters": filters }
            });
        }
    }

    if let Some(limit) = limit {
        query["limit"] = json!(limit);
    }

    Ok(json!({ "structuredQuery": query }))
}

/// A write inside an atomic commit
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Delete the document at a path relative to the database root
    Delete { path: String },
    /// Create a document that must not exist yet; `ServerTimestamp` fields
    /// are turned into `REQUEST_TIME` transforms
    Create { path: String, fields: Fields },
}

impl Write {
    pub(crate) fn to_json(&self, documents_root: &str) -> FirebaseResult<Json> {
        match self {
            Write::Delete { path } => Ok(json!({
                "delete": format!("{}/{}", documents_root, path),
            })),
            Write::Create { path, fields } => {
                let transforms: Vec<Json> = fields
                    .iter()
                    .filter(|(_, value)| matches!(value, Value::ServerTimestamp))
                    .map(|(name, _)| json!({ "fieldPath": name, "setToServerValue": "REQUEST_TIME" }))
                    .collect();

                let mut write = json!({
                    "update": {
                        "name": format!("{}/{}", documents_root, path),
                        "fields": encode_fields(fields)?,
                    },
                    "currentDocument": { "exists": false },
                });
                if !transforms.is_empty() {
                    write["updateTransforms"] = Json::Array(transforms);
                }
                Ok(write)
            }
        }
    }
}

/// A document returned by the REST API, with its path relative to the
/// database root (e.g. `jobs/abc/applications/xyz`)
#[derive(Debug, Clone, PartialEq)]
pub struct FirestoreDocument {
    pub path: String,
    pub fields: Fields,
}

impl FirestoreDocument {
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDocument {
    pub name: String,
    #[serde(default)]
    pub fields: Json,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunQueryItem {
    pub document: Option<RawDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "projects/p/databases/(default)/documents";

    #[test]
    fn test_single_filter_query() {
        let body = structured_query(
            "jobs",
            &[FieldFilter::new("posterId", FieldOperator::Equal, "user-1")],
            Some(500),
        )
        .unwrap();

        let query = &body["structuredQuery"];
        assert_eq!(query["from"][0]["collectionId"], "jobs");
        assert_eq!(query["where"]["fieldFilter"]["field"]["fieldPath"], "posterId");
        assert_eq!(query["where"]["fieldFilter"]["op"], "EQUAL");
        assert_eq!(query["where"]["fieldFilter"]["value"]["stringValue"], "user-1");
        assert_eq!(query["limit"], 500);
    }

    #[test]
    fn test_range_query_uses_composite_and() {
        let body = structured_query(
            "jobs",
            &[
                FieldFilter::new("expiresAt", FieldOperator::GreaterThanOrEqual, 1i64),
                FieldFilter::new("expiresAt", FieldOperator::LessThanOrEqual, 2i64),
            ],
            None,
        )
        .unwrap();

        let composite = &body["structuredQuery"]["where"]["compositeFilter"];
        assert_eq!(composite["op"], "AND");
        assert_eq!(composite["filters"].as_array().unwrap().len(), 2);
        assert!(body["structuredQuery"].get("limit").is_none());
    }

    #[test]
    fn test_unfiltered_query_has_no_where() {
        let body = structured_query("applications", &[], None).unwrap();
        assert!(body["structuredQuery"].get("where").is_none());
    }

    #[test]
    fn test_delete_write() {
        let write = Write::Delete {
            path: "jobs/abc".to_string(),
        };
        let json = write.to_json(ROOT).unwrap();
        assert_eq!(json["delete"], format!("{}/jobs/abc", ROOT));
    }

    #[test]
    fn test_create_write_with_server_timestamp() {
        let mut fields = Fields::new();
        fields.insert("title".to_string(), Value::from("Clerk"));
        fields.insert("createdAt".to_string(), Value::ServerTimestamp);

        let write = Write::Create {
            path: "notifications/n1".to_string(),
            fields,
        };
        let json = write.to_json(ROOT).unwrap();

        assert_eq!(json["update"]["name"], format!("{}/notifications/n1", ROOT));
        assert_eq!(json["update"]["fields"]["title"]["stringValue"], "Clerk");
        assert!(json["update"]["fields"].get("createdAt").is_none());
        assert_eq!(json["currentDocument"]["exists"], false);
        assert_eq!(json["updateTransforms"][0]["fieldPath"], "createdAt");
        assert_eq!(json["updateTransforms"][0]["setToServerValue"], "REQUEST_TIME");
    }

    #[test]
    fn test_document_id() {
        let doc = FirestoreDocument {
            path: "jobs/abc/applications/xyz".to_string(),
            fields: Fields::new(),
        };
        assert_eq!(doc.id(), "xyz");
    }
}
