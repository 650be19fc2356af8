//! Single-record operations: export, reparent, copy geometry, create.

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::record::{self, Record};
use crate::supersede::{require_ids, Batch, Coordinator, Outcome};
use crate::update::PropertyUpdates;

/// Skeleton every created record starts from.
const STUB: &str = r#"{
  "type": "Feature",
  "properties": {
    "edtf:cessation": "..",
    "edtf:inception": "",
    "mz:is_current": -1,
    "wof:name": "",
    "wof:parent_id": -1,
    "wof:placetype": "",
    "wof:superseded_by": [],
    "wof:supersedes": []
  },
  "geometry": null
}"#;

/// Parse a GeoJSON geometry object, e.g. `{"type":"Point","coordinates":[0,0]}`.
pub fn parse_geometry(raw: &str) -> Result<Value> {
    let geometry: Value = serde_json::from_str(raw)
        .map_err(|err| Error::InvalidInput(format!("invalid geometry: {err}")))?;
    let has_type = geometry.get("type").and_then(Value::as_str).is_some();
    let has_body = geometry.get("coordinates").is_some() || geometry.get("geometries").is_some();
    match has_type && has_body {
        true => Ok(geometry),
        false => Err(Error::InvalidInput(
            "geometry must be a GeoJSON object with a type and coordinates".to_string(),
        )),
    }
}

impl Coordinator {
    /// Re-export records as they are, normalizing them.
    pub fn export_ids(&self, ids: &[i64]) -> Result<Outcome> {
        require_ids(ids)?;
        let mut batch = Batch::new();
        for &id in ids {
            let record = self.read(id)?;
            let (id, body) = self.export(&record)?;
            batch.stage(id, body);
        }
        Ok(Outcome {
            written: self.commit(batch)?,
            created: Vec::new(),
        })
    }

    /// Export a document supplied directly, e.g. on stdin. A document without
    /// an id is assigned one.
    pub fn export_bytes(&self, body: &[u8]) -> Result<Outcome> {
        let record = Record::from_bytes(body)?;
        let is_new = record.id().is_none();
        let (id, body) = self.export(&record)?;

        let mut batch = Batch::new();
        batch.stage(id, body);
        let written = self.commit(batch)?;
        if is_new {
            info!(id, "created new record");
        }
        Ok(Outcome {
            written,
            created: if is_new { vec![id] } else { Vec::new() },
        })
    }

    /// Copy `parent_id`'s id and hierarchy onto each record.
    pub fn assign_parent(&self, ids: &[i64], parent_id: i64) -> Result<Outcome> {
        require_ids(ids)?;
        let parent = self.read_parent(parent_id)?;
        let hierarchy = parent.hierarchy().cloned().ok_or(Error::MissingProperty {
            id: parent_id,
            property: "wof:hierarchy",
        })?;

        let mut batch = Batch::new();
        for &id in ids {
            let mut record = self.read(id)?;
            record.set_parent_id(parent_id)?;
            record.set_hierarchy(hierarchy.clone())?;
            let (id, body) = self.export(&record)?;
            batch.stage(id, body);
        }
        Ok(Outcome {
            written: self.commit(batch)?,
            created: Vec::new(),
        })
    }

    /// Copy the geometry of `source_id` onto each target.
    pub fn assign_geometry(&self, source_id: i64, target_ids: &[i64]) -> Result<Outcome> {
        require_ids(target_ids)?;
        let source = self.read(source_id)?;
        let geometry = match source.get(record::GEOMETRY) {
            Some(geometry) if !geometry.is_null() => geometry.clone(),
            _ => {
                return Err(Error::MissingProperty {
                    id: source_id,
                    property: "geometry",
                })
            }
        };

        let mut batch = Batch::new();
        for &id in target_ids {
            if id == source_id {
                warn!(id, "skipping source record listed as a target");
                continue;
            }
            let mut target = self.read(id)?;
            target.set(record::GEOMETRY, geometry.clone())?;
            let (id, body) = self.export(&target)?;
            batch.stage(id, body);
        }
        Ok(Outcome {
            written: self.commit(batch)?,
            created: Vec::new(),
        })
    }

    /// Create a record from the stub, a geometry and property assignments.
    ///
    /// If the properties name a parent, its hierarchy and country are copied.
    pub fn create(&self, geometry: Value, updates: &PropertyUpdates) -> Result<Outcome> {
        let mut feature = Record::from_bytes(STUB.as_bytes())?;
        feature.set(record::GEOMETRY, geometry)?;
        updates.apply(&mut feature)?;

        if let Some(parent_id) = feature.parent_id().filter(|id| *id > 0) {
            let parent = self.read_parent(parent_id)?;
            if let Some(hierarchy) = parent.hierarchy() {
                feature.set_hierarchy(hierarchy.clone())?;
            }
            if let Some(country) = parent.get(record::COUNTRY) {
                feature.set(record::COUNTRY, country.clone())?;
            }
        } else {
            feature.set_hierarchy(json!([]))?;
        }

        let (id, body) = self.export(&feature)?;
        let mut batch = Batch::new();
        batch.stage(id, body);
        let written = self.commit(batch)?;
        info!(id, "created new record");
        Ok(Outcome {
            written,
            created: vec![id],
        })
    }
}
