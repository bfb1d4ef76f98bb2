//! Date normalization for timeline ordering
//!
//! Event dates are free-form strings. They are mapped to a [`DateKey`] so
//! that mixed formats sort chronologically:
//!
//! 1. Dated keys, earliest first. Partial dates (`2021-03`, `2021`,
//!    `March 2021`) sort at the start of their period.
//! 2. Yearless dates (`03-15`) by month and day.
//! 3. Anything unparseable, in insertion order.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const FULL_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})$").expect("valid regex"));
static YEAR_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").expect("valid regex"));
static MONTH_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[-/](\d{1,2})$").expect("valid regex"));

/// Comparable form of an event date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateKey {
    /// Resolved calendar date
    Dated(NaiveDate),
    /// Month and day without a year
    Yearless { month: u32, day: u32 },
    /// Not recognized
    Unknown,
}

impl DateKey {
    /// Normalize a free-form date string
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();

        for format in FULL_DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                return DateKey::Dated(date);
            }
        }

        // ISO timestamps: keep the date part
        if let Some(prefix) = s.get(..10) {
            if s.len() > 10 && s[10..].starts_with(['T', ' ']) {
                if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
                    return DateKey::Dated(date);
                }
            }
        }

        if let Some(caps) = YEAR_MONTH.captures(s) {
            if let Some(date) = ymd(&caps[1], &caps[2], "1") {
                return DateKey::Dated(date);
            }
        }

        if let Some(caps) = YEAR_ONLY.captures(s) {
            if let Some(date) = ymd(&caps[1], "1", "1") {
                return DateKey::Dated(date);
            }
        }

        for format in ["%d %B %Y", "%d %b %Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(&format!("1 {}", s), format) {
                return DateKey::Dated(date);
            }
        }

        if let Some(caps) = MONTH_DAY.captures(s) {
            let month: u32 = caps[1].parse().unwrap_or(0);
            let day: u32 = caps[2].parse().unwrap_or(0);
            // 2000 is a leap year, so Feb 29 is accepted
            if NaiveDate::from_ymd_opt(2000, month, day).is_some() {
                return DateKey::Yearless { month, day };
            }
        }

        DateKey::Unknown
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// How the timeline orders events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrdering {
    /// By normalized date
    #[default]
    Chronological,
    /// By raw date string, as older clients expect
    Lexical,
}

impl FromStr for DateOrdering {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chronological" => Ok(DateOrdering::Chronological),
            "lexical" => Ok(DateOrdering::Lexical),
            other => Err(Error::Config(format!(
                "Unknown timeline ordering '{}', expected 'chronological' or 'lexical'",
                other
            ))),
        }
    }
}

impl fmt::Display for DateOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateOrdering::Chronological => write!(f, "chronological"),
            DateOrdering::Lexical => write!(f, "lexical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> DateKey {
        DateKey::Dated(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(DateKey::parse("2021-03-04"), date(2021, 3, 4));
        assert_eq!(DateKey::parse(" 2021/03/04 "), date(2021, 3, 4));
        assert_eq!(DateKey::parse("03/04/2021"), date(2021, 3, 4));
        assert_eq!(DateKey::parse("March 4, 2021"), date(2021, 3, 4));
        assert_eq!(DateKey::parse("4 March 2021"), date(2021, 3, 4));
        assert_eq!(DateKey::parse("2021-03-04T09:30:00Z"), date(2021, 3, 4));
    }

    #[test]
    fn test_parse_partial_dates() {
        assert_eq!(DateKey::parse("2021-03"), date(2021, 3, 1));
        assert_eq!(DateKey::parse("2021"), date(2021, 1, 1));
        assert_eq!(DateKey::parse("March 2021"), date(2021, 3, 1));
        assert_eq!(DateKey::parse("03-15"), DateKey::Yearless { month: 3, day: 15 });
        assert_eq!(DateKey::parse("02-29"), DateKey::Yearless { month: 2, day: 29 });
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(DateKey::parse(""), DateKey::Unknown);
        assert_eq!(DateKey::parse("early spring"), DateKey::Unknown);
        assert_eq!(DateKey::parse("13-45"), DateKey::Unknown);
        assert_eq!(DateKey::parse("2021-02-30"), DateKey::Unknown);
    }

    #[test]
    fn test_keys_order_mixed_formats() {
        // Lexically "03/04/2021" < "2020-12-01"; chronologically it is later
        assert!(DateKey::parse("2020-12-01") < DateKey::parse("03/04/2021"));
        assert!(DateKey::parse("2021") < DateKey::parse("2021-06-30"));
        assert!(DateKey::parse("2099-01-01") < DateKey::parse("01-01"));
        assert!(DateKey::parse("01-01") < DateKey::parse("someday"));
    }

    #[test]
    fn test_ordering_from_str() {
        assert_eq!("Lexical".parse::<DateOrdering>().unwrap(), DateOrdering::Lexical);
        assert_eq!(
            "chronological".parse::<DateOrdering>().unwrap(),
            DateOrdering::Chronological
        );
        assert!("random".parse::<DateOrdering>().is_err());
    }
}
