//! Render iterated records as one FeatureCollection or as CSV.

use std::io::Write;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::iterate::{WalkStats, Walker};

/// Column name that emits the record's file path instead of a property.
pub const PATH_FIELD: &str = "path";

/// Stream every record as a single GeoJSON FeatureCollection.
pub fn write_feature_collection<W: Write>(
    walker: &Walker,
    roots: &[PathBuf],
    out: &mut W,
) -> Result<WalkStats> {
    out.write_all(br#"{"type":"FeatureCollection","features":["#)?;

    let mut first = true;
    let stats = walker.walk(roots, |_, record| {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        serde_json::to_writer(&mut *out, record.as_value())
            .map_err(|err| Error::json("feature", err))
    })?;

    out.write_all(b"]}")?;
    out.flush()?;
    Ok(stats)
}

/// Write one CSV row per record with the requested `properties.<field>` values.
pub fn write_csv<W: Write>(
    walker: &Walker,
    roots: &[PathBuf],
    fields: &[String],
    out: W,
) -> Result<WalkStats> {
    if fields.is_empty() {
        return Err(Error::InvalidInput("at least one field is required".to_string()));
    }

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(fields)?;

    let stats = walker.walk(roots, |path, record| {
        let row: Vec<String> = fields
            .iter()
            .map(|field| match field.as_str() {
                PATH_FIELD => path.display().to_string(),
                name => record
                    .get(&format!("properties.{name}"))
                    .map(cell)
                    .unwrap_or_default(),
            })
            .collect();
        writer.write_record(&row)?;
        Ok(())
    })?;

    writer.flush()?;
    Ok(stats)
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;
    use crate::iterate::IterMode;

    fn corpus() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (id, name) in [(1, "Alpha"), (2, "Beta")] {
            let doc = json!({"type": "Feature", "properties": {"wof:id": id, "wof:name": name}});
            fs::write(
                dir.path().join(format!("{id}.geojson")),
                serde_json::to_vec(&doc).unwrap(),
            )
            .unwrap();
        }
        dir
    }

    #[test]
    fn feature_collection_wraps_every_record() {
        let dir = corpus();
        let mut out = Vec::new();
        let stats = write_feature_collection(
            &Walker::new(IterMode::Directory),
            &[dir.path().to_path_buf()],
            &mut out,
        )
        .unwrap();

        assert_eq!(stats.visited, 2);
        let collection: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(collection["type"], json!("FeatureCollection"));
        assert_eq!(collection["features"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn csv_emits_selected_fields() {
        let dir = corpus();
        let mut out = Vec::new();
        let fields = vec!["wof:id".to_string(), "wof:name".to_string(), "wof:country".to_string()];
        write_csv(
            &Walker::new(IterMode::Directory),
            &[dir.path().to_path_buf()],
            &fields,
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "wof:id,wof:name,wof:country\n1,Alpha,\n2,Beta,\n");
    }

    #[test]
    fn csv_requires_fields() {
        let err = write_csv(&Walker::new(IterMode::Directory), &[], &[], Vec::new()).unwrap_err();
        assert!(err.is_usage());
    }
}
