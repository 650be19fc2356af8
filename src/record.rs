//! A Who's On First record: a GeoJSON Feature held as an order-preserving JSON tree.
//!
//! The handful of properties the supersession tools touch get typed accessors;
//! everything else is carried through untouched, in its original order.

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::path;
use crate::relations::{ids_from_value, merge_ids, RelationField};

pub const ID: &str = "properties.wof:id";
pub const NAME: &str = "properties.wof:name";
pub const LABEL: &str = "properties.wof:label";
pub const IS_CURRENT: &str = "properties.mz:is_current";
pub const SUPERSEDES: &str = "properties.wof:supersedes";
pub const SUPERSEDED_BY: &str = "properties.wof:superseded_by";
pub const PARENT_ID: &str = "properties.wof:parent_id";
pub const HIERARCHY: &str = "properties.wof:hierarchy";
pub const BELONGS_TO: &str = "properties.wof:belongsto";
pub const COUNTRY: &str = "properties.wof:country";
pub const LAST_MODIFIED: &str = "properties.wof:lastmodified";
pub const GEOMETRY: &str = "geometry";

/// EDTF-valued lifecycle properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Inception,
    Cessation,
    Deprecated,
}

impl DateField {
    pub fn path(self) -> &'static str {
        match self {
            Self::Inception => "properties.edtf:inception",
            Self::Cessation => "properties.edtf:cessation",
            Self::Deprecated => "properties.edtf:deprecated",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Inception => "edtf:inception",
            Self::Cessation => "edtf:cessation",
            Self::Deprecated => "edtf:deprecated",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    doc: Value,
}

impl Record {
    pub fn from_bytes(body: &[u8]) -> Result<Self> {
        let doc: Value = serde_json::from_slice(body).map_err(|err| Error::json("record", err))?;
        Self::from_value(doc)
    }

    pub fn from_value(doc: Value) -> Result<Self> {
        if !doc.is_object() {
            return Err(Error::Malformed("record is not a JSON object".to_string()));
        }
        Ok(Self { doc })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.doc).map_err(|err| Error::json("record", err))
    }

    pub fn as_value(&self) -> &Value {
        &self.doc
    }

    pub fn into_value(self) -> Value {
        self.doc
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        path::get(&self.doc, path)
    }

    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        path::set(&mut self.doc, path, value.into())
    }

    pub fn delete(&mut self, path: &str) -> Option<Value> {
        path::delete(&mut self.doc, path)
    }

    pub fn id(&self) -> Option<i64> {
        self.get(ID).and_then(Value::as_i64)
    }

    /// The record's id, or an error naming `what` when it has none.
    pub fn require_id(&self, what: &str) -> Result<i64> {
        self.id()
            .ok_or_else(|| Error::Malformed(format!("{what} has no properties.wof:id")))
    }

    /// Strip the id so the exporter treats this as a new record.
    pub fn clear_id(&mut self) {
        self.delete(ID);
    }

    /// A copy of this record without its id.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.clear_id();
        copy
    }

    /// A copy without its id or supersession links, ready to become a new record.
    pub fn fresh_copy(&self) -> Result<Self> {
        let mut copy = self.duplicate();
        copy.replace_relations(RelationField::Supersedes, &[])?;
        copy.replace_relations(RelationField::SupersededBy, &[])?;
        Ok(copy)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME).and_then(Value::as_str)
    }

    pub fn set_label(&mut self, label: &str) -> Result<()> {
        self.set(LABEL, label)
    }

    pub fn is_current(&self) -> Option<i64> {
        self.get(IS_CURRENT).and_then(Value::as_i64)
    }

    pub fn mark_not_current(&mut self) -> Result<()> {
        self.set(IS_CURRENT, 0)
    }

    pub fn relations(&self, field: RelationField) -> Vec<i64> {
        ids_from_value(self.get(field.path()))
    }

    pub fn supersedes(&self) -> Vec<i64> {
        self.relations(RelationField::Supersedes)
    }

    pub fn superseded_by(&self) -> Vec<i64> {
        self.relations(RelationField::SupersededBy)
    }

    /// Merge `ids` into a relationship set. Returns true when membership changed.
    pub fn merge_relations(&mut self, field: RelationField, ids: &[i64]) -> Result<bool> {
        let existing = self.relations(field);
        let merged = merge_ids(&existing, ids);
        let changed = merged != merge_ids(&existing, &[]);
        let stored_as_is = self.get(field.path()) == Some(&json!(merged));
        if !stored_as_is {
            self.set(field.path(), json!(merged))?;
        }
        Ok(changed)
    }

    pub fn replace_relations(&mut self, field: RelationField, ids: &[i64]) -> Result<()> {
        self.set(field.path(), json!(merge_ids(&[], ids)))
    }

    pub fn date(&self, field: DateField) -> Option<&str> {
        self.get(field.path()).and_then(Value::as_str)
    }

    pub fn set_date(&mut self, field: DateField, value: &str) -> Result<()> {
        self.set(field.path(), value)
    }

    pub fn parent_id(&self) -> Option<i64> {
        self.get(PARENT_ID).and_then(Value::as_i64)
    }

    pub fn set_parent_id(&mut self, parent_id: i64) -> Result<()> {
        self.set(PARENT_ID, parent_id)
    }

    pub fn hierarchy(&self) -> Option<&Value> {
        self.get(HIERARCHY)
    }

    pub fn set_hierarchy(&mut self, hierarchy: Value) -> Result<()> {
        self.set(HIERARCHY, hierarchy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::from_value(json!({
            "type": "Feature",
            "properties": {
                "wof:id": 500,
                "wof:name": "Terminal 2",
                "sfo:level": 3,
                "wof:superseded_by": [-1]
            },
            "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
        }))
        .unwrap()
    }

    #[test]
    fn typed_accessors_read_wof_properties() {
        let record = sample();
        assert_eq!(record.id(), Some(500));
        assert_eq!(record.name(), Some("Terminal 2"));
        assert!(record.superseded_by().is_empty());
        assert!(record.supersedes().is_empty());
        assert_eq!(record.is_current(), None);
    }

    #[test]
    fn duplicate_strips_only_the_id() {
        let copy = sample().duplicate();
        assert_eq!(copy.id(), None);
        assert_eq!(copy.get("properties.sfo:level"), Some(&json!(3)));
        assert!(copy.require_id("copy").is_err());
    }

    #[test]
    fn fresh_copy_drops_supersession_links() {
        let mut record = sample();
        record.replace_relations(RelationField::Supersedes, &[10, 0]).unwrap();
        record.replace_relations(RelationField::SupersededBy, &[20]).unwrap();

        let copy = record.fresh_copy().unwrap();
        assert_eq!(copy.id(), None);
        assert!(copy.supersedes().is_empty());
        assert!(copy.superseded_by().is_empty());
        assert_eq!(record.supersedes(), vec![10]);
    }

    #[test]
    fn merge_relations_reports_membership_changes() {
        let mut record = sample();
        assert!(record.merge_relations(RelationField::SupersededBy, &[200]).unwrap());
        assert_eq!(record.superseded_by(), vec![200]);
        assert!(!record.merge_relations(RelationField::SupersededBy, &[200]).unwrap());
        assert_eq!(record.get(SUPERSEDED_BY), Some(&json!([200])));
    }

    #[test]
    fn merge_relations_rewrites_sentinel_only_arrays() {
        let mut record = sample();
        let changed = record.merge_relations(RelationField::SupersededBy, &[]).unwrap();
        assert!(!changed);
        assert_eq!(record.get(SUPERSEDED_BY), Some(&json!([])));
    }

    #[test]
    fn unknown_properties_round_trip_in_order() {
        let body = br#"{"type":"Feature","properties":{"z:last":1,"a:first":2,"wof:id":7},"geometry":null}"#;
        let record = Record::from_bytes(body).unwrap();
        assert_eq!(record.to_bytes().unwrap(), body.to_vec());
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(Record::from_bytes(b"[1,2]").is_err());
        assert!(Record::from_bytes(b"not json").is_err());
    }
}
