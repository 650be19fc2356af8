//! Dotted-path access into JSON documents, e.g. `properties.wof:superseded_by`.
//!
//! Segments index into objects by key and into arrays by position. When setting,
//! missing intermediate objects are created and an index of `-1` appends to an
//! array. A backslash escapes a literal dot (`properties.src:geom\.alt`).

use serde_json::{Map, Value};

use crate::error::{Error, Result};

fn parse(path: &str) -> Result<Vec<String>> {
    if path.is_empty() {
        return Err(Error::path(path, "empty path"));
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);

    if segments.iter().any(String::is_empty) {
        return Err(Error::path(path, "empty segment"));
    }
    Ok(segments)
}

fn array_index(segment: &str, len: usize, path: &str) -> Result<usize> {
    if segment == "-1" {
        return Ok(len);
    }
    match segment.parse::<usize>() {
        Ok(index) if index <= len => Ok(index),
        Ok(index) => Err(Error::path(
            path,
            format!("index {index} is past the end of an array of length {len}"),
        )),
        Err(_) => Err(Error::path(
            path,
            format!("'{segment}' is not an array index"),
        )),
    }
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

fn descend_or_create<'a>(node: &'a mut Value, segment: &str, path: &str) -> Result<&'a mut Value> {
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = array_index(segment, items.len(), path)?;
            if index == items.len() {
                items.push(Value::Null);
            }
            Ok(&mut items[index])
        }
        _ => Err(Error::path(
            path,
            format!("cannot descend into scalar value at '{segment}'"),
        )),
    }
}

/// Value at `path`, if every segment resolves.
pub fn get<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse(path).ok()?;
    segments
        .iter()
        .try_fold(doc, |node, segment| child(node, segment))
}

/// Assign `value` at `path`, creating intermediate objects as needed.
pub fn set(doc: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments = parse(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(Error::path(path, "empty path"));
    };

    let mut node = doc;
    for segment in parents {
        node = descend_or_create(node, segment, path)?;
    }

    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = array_index(last, items.len(), path)?;
            if index == items.len() {
                items.push(value);
            } else {
                items[index] = value;
            }
            Ok(())
        }
        _ => Err(Error::path(
            path,
            format!("cannot set '{last}' on a scalar value"),
        )),
    }
}

/// Remove and return the value at `path`. Sibling key order is preserved.
pub fn delete(doc: &mut Value, path: &str) -> Option<Value> {
    let segments = parse(path).ok()?;
    let (last, parents) = segments.split_last()?;

    let mut node = doc;
    for segment in parents {
        node = child_mut(node, segment)?;
    }

    match node {
        Value::Object(map) => map.shift_remove(last.as_str()),
        Value::Array(items) => {
            let index = last.parse::<usize>().ok()?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}
