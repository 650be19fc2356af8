use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{assign_if_changed, MergeStats, MergeTarget};
use crate::error::{Error, Result};
use crate::iterate::{is_alternate, read_record, Walker};
use crate::path;
use crate::pool::WorkerPool;

/// Alternate-key to record-id map, built once before any merging starts.
#[derive(Debug, Clone, Default)]
pub struct LookupMap {
    key_path: String,
    ids: HashMap<String, i64>,
}

impl LookupMap {
    pub fn key_path(&self) -> &str {
        &self.key_path
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.ids.get(key).copied()
    }

    /// Resolve a feature through its value at the key path.
    pub fn resolve(&self, feature: &Value) -> Option<i64> {
        path::get(feature, &self.key_path)
            .map(key_text)
            .and_then(|key| self.get(&key))
    }
}

fn key_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Scan `sources` in parallel, mapping each record's value at `key_path` to its id.
///
/// Records without the key are ignored. Two records sharing a key is an error.
pub fn build_lookup(
    walker: &Walker,
    sources: &[PathBuf],
    key_path: &str,
    pool: WorkerPool,
) -> Result<LookupMap> {
    let files = walker.files(sources)?;
    let ids: RwLock<HashMap<String, i64>> = RwLock::new(HashMap::new());

    pool.install(|| {
        files.par_iter().try_for_each(|file| -> Result<()> {
            if is_alternate(file) {
                return Ok(());
            }
            let record = read_record(file)?;
            if !walker.accepts(&record) {
                return Ok(());
            }
            let id = record.require_id(&file.display().to_string())?;
            let Some(key) = record.get(key_path).map(key_text) else {
                return Ok(());
            };

            let mut ids = ids
                .write()
                .map_err(|_| Error::Malformed("lookup map lock poisoned".to_string()))?;
            if let Some(existing) = ids.get(&key) {
                return Err(Error::Malformed(format!(
                    "lookup key '{key}' is already assigned to {existing} (trying to assign {id})"
                )));
            }
            ids.insert(key, id);
            Ok(())
        })
    })??;

    let ids = ids
        .into_inner()
        .map_err(|_| Error::Malformed("lookup map lock poisoned".to_string()))?;
    info!(keys = ids.len(), key_path, "built lookup map");
    Ok(LookupMap {
        key_path: key_path.to_string(),
        ids,
    })
}

/// Which paths to copy from incoming features, and how to find their records.
#[derive(Debug, Clone, Default)]
pub struct FeatureMerge {
    pub paths: Vec<String>,
    /// Resolve features through an alternate key instead of `properties.wof:id`.
    pub lookup: Option<LookupMap>,
}

impl FeatureMerge {
    fn target_id(&self, feature: &Value) -> Option<i64> {
        match &self.lookup {
            Some(lookup) => lookup.resolve(feature),
            None => path::get(feature, crate::record::ID).and_then(Value::as_i64),
        }
    }
}

/// Copy the configured paths from each feature of `collection` onto its record.
pub fn merge_feature_collection(
    target: &MergeTarget,
    collection: &Value,
    merge: &FeatureMerge,
) -> Result<MergeStats> {
    let features = collection
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Malformed("input is not a FeatureCollection".to_string()))?;

    let mut stats = MergeStats::default();
    for (index, feature) in features.iter().enumerate() {
        let Some(id) = merge.target_id(feature) else {
            warn!(index, "cannot resolve a record for feature, skipping");
            stats.skipped += 1;
            continue;
        };
        let Some(mut record) = target.load(id) else {
            stats.skipped += 1;
            continue;
        };

        let mut changed = false;
        for path in &merge.paths {
            let Some(value) = path::get(feature, path) else {
                warn!(id, path = %path, "feature has no value at path, skipping");
                continue;
            };
            changed |= assign_if_changed(&mut record, path, value.clone())?;
        }

        if !changed {
            debug!(id, "nothing changed, skipping");
            stats.unchanged += 1;
            continue;
        }
        stats.updated.push(target.save(&record)?);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::export::WofExporter;
    use crate::iterate::IterMode;
    use crate::record::Record;
    use crate::store::MemoryStore;

    fn write(dir: &std::path::Path, name: &str, doc: Value) {
        fs::write(dir.join(name), serde_json::to_vec(&doc).unwrap()).unwrap();
    }

    #[test]
    fn lookup_maps_alternate_keys_to_ids() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "1.geojson", json!({"properties": {"wof:id": 1, "sfo:gate": "A1"}}));
        write(dir.path(), "2.geojson", json!({"properties": {"wof:id": 2, "sfo:gate": "B7"}}));
        write(dir.path(), "3.geojson", json!({"properties": {"wof:id": 3}}));

        let lookup = build_lookup(
            &Walker::new(IterMode::Directory),
            &[dir.path().to_path_buf()],
            "properties.sfo:gate",
            WorkerPool::with_workers(2),
        )
        .unwrap();

        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.get("B7"), Some(2));
        assert_eq!(lookup.resolve(&json!({"properties": {"sfo:gate": "A1"}})), Some(1));
    }

    #[test]
    fn duplicate_lookup_keys_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "1.geojson", json!({"properties": {"wof:id": 1, "sfo:gate": "A1"}}));
        write(dir.path(), "2.geojson", json!({"properties": {"wof:id": 2, "sfo:gate": "A1"}}));

        let result = build_lookup(
            &Walker::new(IterMode::Directory),
            &[dir.path().to_path_buf()],
            "properties.sfo:gate",
            WorkerPool::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn copies_only_differing_paths() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(r#"{"type":"Feature","properties":{"wof:id":10,"sfo:level":1},"geometry":null}"#)
            .unwrap();
        store
            .insert(r#"{"type":"Feature","properties":{"wof:id":11,"sfo:level":4},"geometry":null}"#)
            .unwrap();
        let target = MergeTarget::new(
            store.clone(),
            store.clone(),
            Arc::new(WofExporter::sequential(1)),
        );

        let collection = json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"wof:id": 10, "sfo:level": 2}},
            {"type": "Feature", "properties": {"wof:id": 11, "sfo:level": 4}},
            {"type": "Feature", "properties": {"wof:id": 12, "sfo:level": 4}},
            {"type": "Feature", "properties": {"sfo:level": 4}}
        ]});
        let merge = FeatureMerge {
            paths: vec!["properties.sfo:level".to_string()],
            lookup: None,
        };
        let stats = merge_feature_collection(&target, &collection, &merge).unwrap();

        assert_eq!(stats.updated, vec![10]);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.skipped, 2);
        let record = Record::from_bytes(&store.get(10).unwrap()).unwrap();
        assert_eq!(record.get("properties.sfo:level"), Some(&json!(2)));
    }
}
