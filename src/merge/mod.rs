//! Merge values from external CSV files and GeoJSON FeatureCollections into records.
//!
//! These are best-effort: records that cannot be loaded are logged and skipped.

pub mod csv;
pub mod featurecollection;

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::export::Exporter;
use crate::record::Record;
use crate::store::{body_id, Reader, Writer};

pub use self::csv::{merge_csv, CsvFields};
pub use self::featurecollection::{build_lookup, merge_feature_collection, FeatureMerge, LookupMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub updated: Vec<i64>,
    pub unchanged: usize,
    pub skipped: usize,
}

/// The store and exporter merged records are read from and written to.
pub struct MergeTarget {
    pub reader: Arc<dyn Reader>,
    pub writer: Arc<dyn Writer>,
    pub exporter: Arc<dyn Exporter>,
}

impl MergeTarget {
    pub fn new(
        reader: Arc<dyn Reader>,
        writer: Arc<dyn Writer>,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        Self {
            reader,
            writer,
            exporter,
        }
    }

    /// Load `id`, logging and returning `None` when it cannot be read.
    fn load(&self, id: i64) -> Option<Record> {
        let loaded = self
            .reader
            .read(id)
            .and_then(|body| Record::from_bytes(&body));
        match loaded {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(id, error = %err, "failed to load record, skipping");
                None
            }
        }
    }

    fn save(&self, record: &Record) -> Result<i64> {
        let body = self.exporter.export(&record.to_bytes()?)?;
        let id = body_id(&body)?;
        let key = self.writer.write(&body)?;
        info!(id, key = %key, "updated record");
        Ok(id)
    }
}

/// Set `path` to `value` unless the record already holds an equal value there.
fn assign_if_changed(record: &mut Record, path: &str, value: Value) -> Result<bool> {
    if record.get(path) == Some(&value) {
        return Ok(false);
    }
    record.set(path, value)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn equal_values_are_left_alone() {
        let mut record =
            Record::from_value(json!({"properties": {"wof:id": 1, "sfo:level": 2}})).unwrap();
        assert!(!assign_if_changed(&mut record, "properties.sfo:level", json!(2)).unwrap());
        assert!(assign_if_changed(&mut record, "properties.sfo:level", json!(3)).unwrap());
        assert!(assign_if_changed(&mut record, "properties.sfo:wing", json!("A")).unwrap());
    }
}
