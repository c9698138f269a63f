//! Date comparison with a per-call parse cache
//!
//! Parsing is delegated to a [`DateParser`]; the default implementation tries
//! a list of common layouts with `chrono`. Parsed values are cached in the
//! [`CompareContext`] for the duration of one sort or compare call.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::comparator::CompareContext;
use crate::error::{SortError, SortResult, ValueKind};

/// Parses a date string into a timestamp
pub trait DateParser: Send + Sync {
    fn parse(&self, value: &str) -> Option<NaiveDateTime>;
}

/// Date-time layouts tried after RFC 3339 and RFC 2822
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

/// Date-only layouts, taken as midnight
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%Y%m%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%b %d %Y",
];

/// Default parser built on `chrono`
///
/// Zoned inputs are normalized to UTC before comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoDateParser;

impl DateParser for ChronoDateParser {
    fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.naive_utc());
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
            return Some(dt.naive_utc());
        }

        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    }
}

/// Parsed dates keyed by their raw value, for one call only
#[derive(Debug, Default)]
pub struct ParseCache {
    entries: HashMap<String, NaiveDateTime>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached timestamp for `value`, parsing it on first use
    pub fn get_or_parse(&mut self, value: &str, parser: &dyn DateParser) -> SortResult<NaiveDateTime> {
        if let Some(parsed) = self.entries.get(value) {
            return Ok(*parsed);
        }
        let parsed = parser
            .parse(value)
            .ok_or_else(|| SortError::unparsable(ValueKind::Date, value))?;
        self.entries.insert(value.to_string(), parsed);
        Ok(parsed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compare two date strings chronologically
pub fn compare_dates(a: &str, b: &str, ctx: &mut CompareContext<'_>) -> SortResult<Ordering> {
    let parser = ctx.date_parser;
    let a_date = ctx.dates.get_or_parse(a, parser)?;
    let b_date = ctx.dates.get_or_parse(b, parser)?;
    Ok(a_date.cmp(&b_date))
}
