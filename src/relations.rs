//! Supersession relationship sets (`wof:supersedes` / `wof:superseded_by`).
//!
//! Stored arrays use `0` and `-1` to mean "no relation". Those sentinels are
//! decoded into [`Relation::None`] and never written back out.

use std::collections::BTreeSet;

use serde_json::Value;

/// One entry of a relationship array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relation {
    None,
    Id(i64),
}

impl Relation {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 | -1 => Self::None,
            id => Self::Id(id),
        }
    }

    /// Decode a JSON array element. Numeric strings are accepted; anything else is `None`.
    pub fn from_value(value: &Value) -> Self {
        let raw = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        raw.map_or(Self::None, Self::from_raw)
    }

    pub fn id(self) -> Option<i64> {
        match self {
            Self::None => None,
            Self::Id(id) => Some(id),
        }
    }
}

/// Which side of a supersession pair is being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationField {
    Supersedes,
    SupersededBy,
}

impl RelationField {
    pub fn path(self) -> &'static str {
        match self {
            Self::Supersedes => crate::record::SUPERSEDES,
            Self::SupersededBy => crate::record::SUPERSEDED_BY,
        }
    }

    /// The field that must hold the reverse link on the other record.
    pub fn inverse(self) -> Self {
        match self {
            Self::Supersedes => Self::SupersededBy,
            Self::SupersededBy => Self::Supersedes,
        }
    }
}

/// Union of `existing` and `to_add` with sentinels removed and duplicates collapsed.
///
/// The result is ascending, but callers should treat it as a set.
pub fn merge_ids(existing: &[i64], to_add: &[i64]) -> Vec<i64> {
    existing
        .iter()
        .chain(to_add)
        .filter_map(|&raw| Relation::from_raw(raw).id())
        .collect::<BTreeSet<i64>>()
        .into_iter()
        .collect()
}

/// Decode a stored relationship array. A missing or non-array value is empty.
pub fn ids_from_value(value: Option<&Value>) -> Vec<i64> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| Relation::from_value(item).id())
                .collect()
        })
        .unwrap_or_default()
}
