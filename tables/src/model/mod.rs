//! Table entity model and its OData JSON representation.
//!
//! A [`TableEntity`] is addressed by its partition key and row key and carries
//! an ordered set of typed properties. Types that the service cannot infer
//! from plain JSON are annotated with a `<name>@odata.type` companion field
//! when the entity is serialized for the wire.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const PARTITION_KEY: &str = "PartitionKey";
pub const ROW_KEY: &str = "RowKey";
const ODATA_TYPE_SUFFIX: &str = "@odata.type";

/// A single typed property value of a table entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityProperty {
    String(String),
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
    Binary(Vec<u8>),
}

impl EntityProperty {
    /// The EDM type name used in `@odata.type` annotations.
    pub fn edm_type(&self) -> &'static str {
        match self {
            EntityProperty::String(_) => "Edm.String",
            EntityProperty::Boolean(_) => "Edm.Boolean",
            EntityProperty::Int32(_) => "Edm.Int32",
            EntityProperty::Int64(_) => "Edm.Int64",
            EntityProperty::Double(_) => "Edm.Double",
            EntityProperty::DateTime(_) => "Edm.DateTime",
            EntityProperty::Guid(_) => "Edm.Guid",
            EntityProperty::Binary(_) => "Edm.Binary",
        }
    }

    /// Converts the value into its JSON form and, when the service needs a hint
    /// to recover the type, the annotation to emit next to it.
    fn to_odata_value(&self) -> (Value, Option<&'static str>) {
        match self {
            EntityProperty::String(s) => (Value::String(s.clone()), None),
            EntityProperty::Boolean(b) => (Value::Bool(*b), None),
            EntityProperty::Int32(i) => (Value::from(*i), None),
            EntityProperty::Int64(i) => (Value::String(i.to_string()), Some(self.edm_type())),
            EntityProperty::Double(d) => {
                // JSON numbers cannot hold NaN or infinities
                if d.is_nan() {
                    (Value::String("NaN".to_string()), Some(self.edm_type()))
                } else if d.is_infinite() {
                    let text = if d.is_sign_positive() {
                        "Infinity"
                    } else {
                        "-Infinity"
                    };
                    (Value::String(text.to_string()), Some(self.edm_type()))
                } else {
                    match serde_json::Number::from_f64(*d) {
                        Some(n) => (Value::Number(n), None),
                        None => (Value::String(d.to_string()), Some(self.edm_type())),
                    }
                }
            }
            EntityProperty::DateTime(dt) => (
                Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                Some(self.edm_type()),
            ),
            EntityProperty::Guid(g) => (Value::String(g.to_string()), Some(self.edm_type())),
            EntityProperty::Binary(bytes) => (
                Value::String(general_purpose::STANDARD.encode(bytes)),
                Some(self.edm_type()),
            ),
        }
    }
}

impl From<&str> for EntityProperty {
    fn from(value: &str) -> Self {
        EntityProperty::String(value.to_string())
    }
}

impl From<String> for EntityProperty {
    fn from(value: String) -> Self {
        EntityProperty::String(value)
    }
}

impl From<bool> for EntityProperty {
    fn from(value: bool) -> Self {
        EntityProperty::Boolean(value)
    }
}

impl From<i32> for EntityProperty {
    fn from(value: i32) -> Self {
        EntityProperty::Int32(value)
    }
}

impl From<i64> for EntityProperty {
    fn from(value: i64) -> Self {
        EntityProperty::Int64(value)
    }
}

impl From<f64> for EntityProperty {
    fn from(value: f64) -> Self {
        EntityProperty::Double(value)
    }
}

impl From<DateTime<Utc>> for EntityProperty {
    fn from(value: DateTime<Utc>) -> Self {
        EntityProperty::DateTime(value)
    }
}

impl From<Uuid> for EntityProperty {
    fn from(value: Uuid) -> Self {
        EntityProperty::Guid(value)
    }
}

impl From<Vec<u8>> for EntityProperty {
    fn from(value: Vec<u8>) -> Self {
        EntityProperty::Binary(value)
    }
}

/// A table entity: the two-part key plus user properties.
///
/// # Examples
///
/// ```no_run
/// use tables::model::TableEntity;
///
/// let entity = TableEntity::new("customers", "42")
///     .with_property("name", "Ada")
///     .with_property("visits", 12i64);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntity {
    pub partition_key: String,
    pub row_key: String,
    pub properties: BTreeMap<String, EntityProperty>,
}

impl TableEntity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<EntityProperty>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<EntityProperty>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn property(&self, name: &str) -> Option<&EntityProperty> {
        self.properties.get(name)
    }

    /// Builds the OData JSON object sent as a sub-request body.
    ///
    /// Properties named like the key fields are ignored; the entity's own keys
    /// always win.
    pub fn to_odata_json(&self) -> Map<String, Value> {
        let mut object = Map::new();
        object.insert(
            PARTITION_KEY.to_string(),
            Value::String(self.partition_key.clone()),
        );
        object.insert(ROW_KEY.to_string(), Value::String(self.row_key.clone()));

        for (name, property) in &self.properties {
            if name == PARTITION_KEY || name == ROW_KEY {
                continue;
            }
            let (value, annotation) = property.to_odata_value();
            object.insert(name.clone(), value);
            if let Some(edm_type) = annotation {
                object.insert(
                    format!("{name}{ODATA_TYPE_SUFFIX}"),
                    Value::String(edm_type.to_string()),
                );
            }
        }

        object
    }
}

/// How an update or upsert treats properties missing from the payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Only the supplied properties are written; others are kept.
    #[default]
    Merge,
    /// The stored entity is replaced as a whole.
    Replace,
}

/// Per-call options for update actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateEntityOptions {
    /// Optimistic concurrency token; `None` matches any version.
    pub etag: Option<String>,
}

impl UpdateEntityOptions {
    pub fn with_etag(etag: impl Into<String>) -> Self {
        Self {
            etag: Some(etag.into()),
        }
    }
}

/// Per-call options for delete actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteEntityOptions {
    /// Optimistic concurrency token; `None` matches any version.
    pub etag: Option<String>,
}

impl DeleteEntityOptions {
    pub fn with_etag(etag: impl Into<String>) -> Self {
        Self {
            etag: Some(etag.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_keys_are_always_serialized() {
        let entity = TableEntity::new("pk", "rk").with_property("RowKey", "ignored");
        let json = entity.to_odata_json();

        assert_eq!(json[PARTITION_KEY], "pk");
        assert_eq!(json[ROW_KEY], "rk");
        assert_eq!(json.len(), 2);
    }

    #[test]
    fn test_plain_json_types_have_no_annotation() {
        let entity = TableEntity::new("pk", "rk")
            .with_property("name", "Ada")
            .with_property("active", true)
            .with_property("age", 36)
            .with_property("score", 1.5);
        let json = entity.to_odata_json();

        assert_eq!(json["name"], "Ada");
        assert_eq!(json["active"], true);
        assert_eq!(json["age"], 36);
        assert_eq!(json["score"], 1.5);
        assert!(json.keys().all(|k| !k.ends_with(ODATA_TYPE_SUFFIX)));
    }

    #[test]
    fn test_typed_values_are_annotated() {
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let id = Uuid::nil();
        let entity = TableEntity::new("pk", "rk")
            .with_property("big", 9_007_199_254_740_993i64)
            .with_property("when", when)
            .with_property("id", id)
            .with_property("blob", vec![1u8, 2, 3])
            .with_property("nan", f64::NAN);
        let json = entity.to_odata_json();

        assert_eq!(json["big"], "9007199254740993");
        assert_eq!(json["big@odata.type"], "Edm.Int64");
        assert_eq!(json["when"], "2024-03-01T12:30:00Z");
        assert_eq!(json["when@odata.type"], "Edm.DateTime");
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["id@odata.type"], "Edm.Guid");
        assert_eq!(json["blob"], "AQID");
        assert_eq!(json["blob@odata.type"], "Edm.Binary");
        assert_eq!(json["nan"], "NaN");
        assert_eq!(json["nan@odata.type"], "Edm.Double");
    }

    #[test]
    fn test_update_mode_defaults_to_merge() {
        assert_eq!(UpdateMode::default(), UpdateMode::Merge);
    }
}
