//! Extended Date/Time Format values for `edtf:*` properties.
//!
//! Only the subset used by gazetteer records is recognized: years, months and
//! days with optional `X` digits and `?`/`~`/`%` qualifiers, intervals,
//! open/unknown markers and bracketed sets.

use chrono::Utc;

use crate::error::{Error, Result};

/// Open-ended bound, e.g. a cessation that has not happened.
pub const OPEN: &str = "..";
/// Unknown bound.
pub const UNKNOWN: &str = "";

const LEGACY_OPEN: &str = "open";
const LEGACY_UNKNOWN: &str = "uuuu";

/// Current UTC date as `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Replacement for a pre-2019 EDTF marker, if `value` is one.
pub fn upgrade_legacy(value: &str) -> Option<&'static str> {
    match value {
        LEGACY_OPEN => Some(OPEN),
        LEGACY_UNKNOWN => Some(UNKNOWN),
        _ => None,
    }
}

/// Validate `raw` and return it trimmed.
pub fn parse(raw: &str) -> Result<String> {
    let value = raw.trim();
    if is_valid(value) {
        Ok(value.to_string())
    } else {
        Err(Error::InvalidDate(raw.to_string()))
    }
}

/// The caller's date if given, today otherwise.
pub fn parse_or_today(raw: Option<&str>) -> Result<String> {
    match raw {
        Some(value) if !value.trim().is_empty() => parse(value),
        _ => Ok(today()),
    }
}

pub fn is_valid(value: &str) -> bool {
    if value == OPEN || value == UNKNOWN || upgrade_legacy(value).is_some() {
        return true;
    }

    if let Some(inner) = strip_set_brackets(value) {
        return !inner.is_empty()
            && inner.split(',').all(|item| {
                let item = item.trim();
                match item.split_once("..") {
                    Some((start, end)) => {
                        (start.is_empty() || is_date(start)) && (end.is_empty() || is_date(end))
                    }
                    None => is_date(item),
                }
            });
    }

    match value.split_once('/') {
        Some((start, end)) => is_bound(start) && is_bound(end) && !(start.is_empty() && end.is_empty()),
        None => is_date(value),
    }
}

fn strip_set_brackets(value: &str) -> Option<&str> {
    value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .or_else(|| value.strip_prefix('{').and_then(|v| v.strip_suffix('}')))
}

fn is_bound(value: &str) -> bool {
    value.is_empty() || value == OPEN || is_date(value)
}

fn is_date(value: &str) -> bool {
    let value = value.trim_end_matches(['?', '~', '%']);
    let (negative, value) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let mut parts = value.split('-');
    let Some(year) = parts.next() else {
        return false;
    };
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit() || c == 'X') {
        return false;
    }

    let month = parts.next();
    let day = parts.next();
    if parts.next().is_some() || (negative && month.is_some()) {
        return false;
    }

    if let Some(month) = month {
        if !is_unit(month, 1, 12) && !is_unit(month, 21, 24) {
            return false;
        }
    }
    if let Some(day) = day {
        if month.map_or(false, |m| is_unit(m, 21, 24)) || !is_unit(day, 1, 31) {
            return false;
        }
    }
    true
}

fn is_unit(value: &str, min: u32, max: u32) -> bool {
    let value = value.trim_end_matches(['?', '~', '%']);
    if value.len() != 2 {
        return false;
    }
    if value == "XX" {
        return true;
    }
    value
        .parse::<u32>()
        .map(|n| (min..=max).contains(&n))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_record_dates() {
        for value in [
            "2020",
            "2020-03",
            "2020-03-17",
            "2020-03-17?",
            "198X",
            "2001-XX",
            "2001-21",
            "..",
            "",
            "2000/2020",
            "2000/..",
            "/2020",
            "[1667,1668,1670..1672]",
            "-0044",
        ] {
            assert!(is_valid(value), "expected '{value}' to be valid");
        }
    }

    #[test]
    fn rejects_garbage() {
        for value in ["yesterday", "2020-13", "2020-02-32", "20", "2020-03-17-01", "/", "[]"] {
            assert!(!is_valid(value), "expected '{value}' to be invalid");
        }
    }

    #[test]
    fn legacy_markers_upgrade() {
        assert_eq!(upgrade_legacy("open"), Some(OPEN));
        assert_eq!(upgrade_legacy("uuuu"), Some(UNKNOWN));
        assert_eq!(upgrade_legacy("2020"), None);
    }

    #[test]
    fn parse_or_today_defaults_to_an_iso_day() {
        let today = parse_or_today(None).unwrap();
        assert_eq!(today.len(), 10);
        assert!(is_valid(&today));
        assert_eq!(parse_or_today(Some(" 2004 ")).unwrap(), "2004");
        assert!(matches!(parse_or_today(Some("soon")), Err(Error::InvalidDate(_))));
    }
}
