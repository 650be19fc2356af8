//! Normalizing exporter: the last step before a record is written.
//!
//! `whosonfirst://` assigns missing ids, upgrades legacy EDTF markers,
//! reconciles relationship arrays, derives `wof:belongsto` from the hierarchy,
//! stamps `wof:lastmodified` and emits pretty-printed JSON with sorted
//! property keys. `whosonfirst://?id-start=N` hands out sequential ids from N.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use crate::edtf;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::relations::{ids_from_value, merge_ids, Relation};

pub const DEFAULT_EXPORTER_URI: &str = "whosonfirst://";

const ID_MASK: u64 = (1 << 53) - 1;

pub trait Exporter: Send + Sync {
    /// Normalize `body`, assigning an id when it has none.
    fn export(&self, body: &[u8]) -> Result<Vec<u8>>;
}

pub trait IdProvider: Send + Sync {
    fn next_id(&self) -> Result<i64>;
}

/// Random positive ids that fit in a double without loss.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdProvider for RandomIds {
    fn next_id(&self) -> Result<i64> {
        loop {
            let mut buf = [0u8; 8];
            getrandom::getrandom(&mut buf)
                .map_err(|err| Error::Export(format!("failed to generate id: {err}")))?;
            let id = (u64::from_le_bytes(buf) & ID_MASK) as i64;
            if id > 0 {
                return Ok(id);
            }
        }
    }
}

/// Ids handed out in order from a starting value.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicI64,
}

impl SequentialIds {
    pub fn starting_at(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }
}

impl IdProvider for SequentialIds {
    fn next_id(&self) -> Result<i64> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

pub struct WofExporter {
    ids: Box<dyn IdProvider>,
}

impl WofExporter {
    pub fn new(ids: impl IdProvider + 'static) -> Self {
        Self { ids: Box::new(ids) }
    }

    pub fn sequential(start: i64) -> Self {
        Self::new(SequentialIds::starting_at(start))
    }
}

impl Default for WofExporter {
    fn default() -> Self {
        Self::new(RandomIds)
    }
}

impl Exporter for WofExporter {
    fn export(&self, body: &[u8]) -> Result<Vec<u8>> {
        let mut doc: Value =
            serde_json::from_slice(body).map_err(|err| Error::json("export input", err))?;

        let Some(props) = doc.get_mut("properties").and_then(Value::as_object_mut) else {
            return Err(Error::Export("record has no properties object".to_string()));
        };

        let id = match props.get("wof:id").and_then(Value::as_i64) {
            Some(id) => id,
            None => {
                let id = self.ids.next_id()?;
                debug!(id, "assigned new id");
                props.insert("wof:id".to_string(), json!(id));
                id
            }
        };

        upgrade_edtf(props);

        for key in ["wof:supersedes", "wof:superseded_by"] {
            let ids = merge_ids(&ids_from_value(props.get(key)), &[]);
            props.insert(key.to_string(), json!(ids));
        }

        let ancestors = props
            .get("wof:hierarchy")
            .map(|hierarchy| belongs_to(hierarchy, id));
        if let Some(ancestors) = ancestors {
            props.insert("wof:belongsto".to_string(), json!(ancestors));
        }

        props.insert("wof:lastmodified".to_string(), json!(Utc::now().timestamp()));

        let sorted = sort_keys(std::mem::take(props));
        *props = sorted;

        serde_json::to_vec_pretty(&doc).map_err(|err| Error::json("export output", err))
    }
}

/// Run a record through `exporter` and decode the result.
pub fn export_record(exporter: &dyn Exporter, record: &Record) -> Result<Record> {
    let body = exporter.export(&record.to_bytes()?)?;
    Record::from_bytes(&body)
}

fn upgrade_edtf(props: &mut Map<String, Value>) {
    for (key, value) in props.iter_mut() {
        if !key.starts_with("edtf:") {
            continue;
        }
        if let Some(upgraded) = value.as_str().and_then(edtf::upgrade_legacy) {
            *value = json!(upgraded);
        }
    }
}

/// Every ancestor id named in a hierarchy, excluding the record itself.
fn belongs_to(hierarchy: &Value, self_id: i64) -> Vec<i64> {
    let mut ids = BTreeSet::new();
    let mut collect = |entry: &Map<String, Value>| {
        for (key, value) in entry {
            if !key.ends_with("_id") {
                continue;
            }
            if let Some(id) = value.as_i64().and_then(|raw| Relation::from_raw(raw).id()) {
                if id != self_id {
                    ids.insert(id);
                }
            }
        }
    };

    match hierarchy {
        Value::Array(entries) => entries.iter().filter_map(Value::as_object).for_each(&mut collect),
        Value::Object(entry) => collect(entry),
        _ => {}
    }
    ids.into_iter().collect()
}

fn sort_keys(map: Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.into_iter().collect()
}

pub fn new_exporter(uri: &str) -> Result<Arc<dyn Exporter>> {
    let unsupported = || Error::UnsupportedUri {
        kind: "exporter",
        uri: uri.to_string(),
    };
    let url = Url::parse(uri).map_err(|_| unsupported())?;
    if url.scheme() != "whosonfirst" {
        return Err(unsupported());
    }

    let start = url
        .query_pairs()
        .find(|(key, _)| key == "id-start")
        .map(|(_, value)| {
            value
                .parse::<i64>()
                .map_err(|_| Error::InvalidInput(format!("invalid id-start '{value}' in '{uri}'")))
        })
        .transpose()?;

    Ok(match start {
        Some(start) => Arc::new(WofExporter::sequential(start)),
        None => Arc::new(WofExporter::default()),
    })
}
