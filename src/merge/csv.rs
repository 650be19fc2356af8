use std::collections::HashMap;
use std::io;

use serde_json::json;
use tracing::{debug, warn};

use super::{assign_if_changed, MergeStats, MergeTarget};
use crate::error::{Error, Result};

pub const DEFAULT_LOOKUP_KEY: &str = "wof:id";

/// Which CSV columns to read and how to type them.
#[derive(Debug, Clone)]
pub struct CsvFields {
    /// Column holding the id of the record a row updates.
    pub lookup_key: String,
    pub strings: Vec<String>,
    pub ints: Vec<String>,
}

impl Default for CsvFields {
    fn default() -> Self {
        Self {
            lookup_key: DEFAULT_LOOKUP_KEY.to_string(),
            strings: Vec::new(),
            ints: Vec::new(),
        }
    }
}

/// Assign columns of each row to `properties.<column>` on the record named by the lookup column.
pub fn merge_csv<R: io::Read>(
    target: &MergeTarget,
    input: R,
    fields: &CsvFields,
) -> Result<MergeStats> {
    let mut reader = ::csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let mut stats = MergeStats::default();

    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let values: HashMap<&str, &str> = headers.iter().zip(row.iter()).collect();

        let Some(raw_id) = values.get(fields.lookup_key.as_str()) else {
            return Err(Error::Malformed(format!(
                "row {} has no '{}' column",
                index + 1,
                fields.lookup_key
            )));
        };
        let id = raw_id.trim().parse::<i64>().map_err(|_| {
            Error::Malformed(format!("row {}: '{raw_id}' is not a record id", index + 1))
        })?;

        let Some(mut feature) = target.load(id) else {
            stats.skipped += 1;
            continue;
        };

        let mut changed = false;
        for field in &fields.strings {
            let Some(value) = values.get(field.as_str()) else {
                warn!(id, field = %field, "missing column, skipping");
                continue;
            };
            changed |= assign_if_changed(&mut feature, &property_path(field), json!(value))?;
        }
        for field in &fields.ints {
            let Some(value) = values.get(field.as_str()) else {
                warn!(id, field = %field, "missing column, skipping");
                continue;
            };
            let value = value.trim().parse::<i64>().map_err(|_| {
                Error::Malformed(format!("'{value}' in column '{field}' is not an integer"))
            })?;
            changed |= assign_if_changed(&mut feature, &property_path(field), json!(value))?;
        }

        if !changed {
            debug!(id, "nothing changed");
            stats.unchanged += 1;
            continue;
        }
        stats.updated.push(target.save(&feature)?);
    }

    Ok(stats)
}

fn property_path(field: &str) -> String {
    format!("properties.{field}")
}
