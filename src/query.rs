//! `{PATH}={REGEXP}` filters for corpus iteration.

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::path;

#[derive(Debug, Clone)]
pub struct Query {
    path: String,
    pattern: Regex,
}

impl Query {
    pub fn parse(raw: &str) -> Result<Self> {
        let Some((path, pattern)) = raw.split_once('=') else {
            return Err(Error::InvalidInput(format!(
                "invalid query '{raw}', expected PATH=REGEXP"
            )));
        };
        let pattern = Regex::new(pattern)
            .map_err(|err| Error::InvalidInput(format!("invalid regexp in '{raw}': {err}")))?;
        Ok(Self {
            path: path.trim().to_string(),
            pattern,
        })
    }

    /// True when the value at the path (or any element of it, for arrays) matches.
    pub fn matches(&self, doc: &Value) -> bool {
        match path::get(doc, &self.path) {
            Some(Value::Array(items)) => items.iter().any(|item| self.matches_scalar(item)),
            Some(value) => self.matches_scalar(value),
            None => false,
        }
    }

    fn matches_scalar(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.pattern.is_match(s),
            Value::Number(_) | Value::Bool(_) => self.pattern.is_match(&value.to_string()),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum QueryMode {
    #[default]
    All,
    Any,
}

impl QueryMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "all" | "ALL" => Ok(Self::All),
            "any" | "ANY" => Ok(Self::Any),
            other => Err(Error::InvalidInput(format!("invalid query mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuerySet {
    pub queries: Vec<Query>,
    pub mode: QueryMode,
}

impl QuerySet {
    pub fn new(queries: Vec<Query>, mode: QueryMode) -> Self {
        Self { queries, mode }
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// An empty set matches everything.
    pub fn matches(&self, doc: &Value) -> bool {
        if self.queries.is_empty() {
            return true;
        }
        match self.mode {
            QueryMode::All => self.queries.iter().all(|q| q.matches(doc)),
            QueryMode::Any => self.queries.iter().any(|q| q.matches(doc)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc() -> Value {
        json!({"properties": {
            "wof:placetype": "locality",
            "wof:country": "CA",
            "mz:is_current": 1,
            "wof:belongsto": [85633041, 136251273]
        }})
    }

    #[test]
    fn matches_strings_numbers_and_arrays() {
        assert!(Query::parse("properties.wof:placetype=^local").unwrap().matches(&doc()));
        assert!(Query::parse("properties.mz:is_current=^1$").unwrap().matches(&doc()));
        assert!(Query::parse("properties.wof:belongsto=^136251273$").unwrap().matches(&doc()));
        assert!(!Query::parse("properties.wof:name=.*").unwrap().matches(&doc()));
    }

    #[test]
    fn modes_combine_queries() {
        let queries = vec![
            Query::parse("properties.wof:country=CA").unwrap(),
            Query::parse("properties.wof:placetype=region").unwrap(),
        ];
        assert!(!QuerySet::new(queries.clone(), QueryMode::All).matches(&doc()));
        assert!(QuerySet::new(queries, QueryMode::Any).matches(&doc()));
        assert!(QuerySet::default().matches(&doc()));
    }

    #[test]
    fn bad_queries_are_input_errors() {
        assert!(Query::parse("no-equals").unwrap_err().is_usage());
        assert!(Query::parse("properties.x=(").unwrap_err().is_usage());
        assert!(QueryMode::parse("some").is_err());
    }
}
