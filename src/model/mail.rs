//! Per-message index records and the values stored in them.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::parser::date::Strategy;

/// The headers kept in the index. Every other header is discarded at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderName {
    From,
    To,
    Cc,
    Date,
    Subject,
}

impl HeaderName {
    pub const ALL: [HeaderName; 5] = [
        HeaderName::From,
        HeaderName::To,
        HeaderName::Cc,
        HeaderName::Date,
        HeaderName::Subject,
    ];

    /// Match a header field name case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|h| h.as_str().eq_ignore_ascii_case(name))
    }

    /// Canonical capitalization (`"From"`, `"Cc"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::From => "From",
            Self::To => "To",
            Self::Cc => "Cc",
            Self::Date => "Date",
            Self::Subject => "Subject",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header values for one message.
///
/// An absent header and a header with an empty value are both stored as
/// `None`, so consumers never have to tell the two apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    values: [Option<String>; 5],
}

impl Headers {
    /// Value of `name`, or `None` when absent or empty.
    pub fn get(&self, name: HeaderName) -> Option<&str> {
        self.values[name.slot()].as_deref()
    }

    /// Value of `name`, or `""` when absent.
    pub fn get_or_empty(&self, name: HeaderName) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Store a value. A later call for the same name replaces the earlier one.
    pub fn set(&mut self, name: HeaderName, value: impl Into<String>) {
        let value = value.into();
        self.values[name.slot()] = if value.trim().is_empty() {
            None
        } else {
            Some(value)
        };
    }

    /// Iterate over the headers that are present.
    pub fn iter(&self) -> impl Iterator<Item = (HeaderName, &str)> {
        HeaderName::ALL
            .into_iter()
            .filter_map(|h| self.get(h).map(|v| (h, v)))
    }
}

/// A canonical, comparable message date.
///
/// `Timestamp` keeps the time and the offset written in the source; `Day`
/// is used when only a calendar date could be recovered.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum MailDate {
    Timestamp(DateTime<FixedOffset>),
    Day(NaiveDate),
}

impl MailDate {
    /// Calendar date as written (in the message's own offset).
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Timestamp(dt) => dt.date_naive(),
            Self::Day(d) => *d,
        }
    }

    pub fn year(&self) -> i32 {
        self.date().year()
    }

    pub fn month(&self) -> u32 {
        self.date().month()
    }

    pub fn day(&self) -> u32 {
        self.date().day()
    }

    /// Point in time used for ordering. A `Day` counts as midnight UTC.
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            Self::Timestamp(dt) => dt.with_timezone(&Utc),
            Self::Day(d) => Utc.from_utc_datetime(&d.and_time(NaiveTime::default())),
        }
    }

    /// Whether a time of day is known.
    pub fn has_time(&self) -> bool {
        matches!(self, Self::Timestamp(_))
    }

    /// Format with a `strftime` pattern. Time fields render as zero for a `Day`.
    pub fn format(&self, fmt: &str) -> String {
        match self {
            Self::Timestamp(dt) => dt.format(fmt).to_string(),
            Self::Day(d) => d.and_time(NaiveTime::default()).format(fmt).to_string(),
        }
    }

    fn rank(&self) -> (DateTime<Utc>, u8, i32) {
        match self {
            Self::Day(_) => (self.instant(), 0, 0),
            Self::Timestamp(dt) => (self.instant(), 1, dt.offset().local_minus_utc()),
        }
    }
}

impl PartialEq for MailDate {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl Eq for MailDate {}

impl PartialOrd for MailDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MailDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for MailDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Day(d) => write!(f, "{d}"),
        }
    }
}

/// Result of date normalization for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NormalizedDate {
    Parsed { date: MailDate, strategy: Strategy },
    Unparsed,
}

impl NormalizedDate {
    pub fn date(&self) -> Option<&MailDate> {
        match self {
            Self::Parsed { date, .. } => Some(date),
            Self::Unparsed => None,
        }
    }

    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            Self::Parsed { strategy, .. } => Some(*strategy),
            Self::Unparsed => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }
}

/// One message of the mailbox.
///
/// Records are created once during the index build and never mutated.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    /// Zero-based position in file order.
    pub index: usize,

    /// Byte offset of the `From ` delimiter line.
    pub offset: u64,

    /// Bytes up to the next delimiter or EOF.
    pub length: u64,

    /// The recognized headers.
    pub headers: Headers,

    /// Normalized `Date:` (or a secondary source), or `Unparsed`.
    pub date: NormalizedDate,
}

impl MessageRecord {
    pub fn byte_range(&self) -> Range<u64> {
        self.offset..self.offset + self.length
    }

    pub fn from(&self) -> &str {
        self.headers.get_or_empty(HeaderName::From)
    }

    pub fn subject(&self) -> &str {
        self.headers.get_or_empty(HeaderName::Subject)
    }

    /// The raw `Date:` header, if any.
    pub fn raw_date(&self) -> Option<&str> {
        self.headers.get(HeaderName::Date)
    }
}
