//! Date normalization: an ordered chain of parsing strategies.
//!
//! Each strategy is a pure `fn(&str, &DateWindow) -> Option<MailDate>` and is
//! tried in order; the first success wins. When the `Date:` header is absent
//! or defeats every strategy, the `Received:` timestamp and then the envelope
//! (`From `) line are tried with the strict strategies only.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::debug;

use crate::model::mail::{MailDate, NormalizedDate};

/// Which strategy produced a normalized date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Strict RFC 2822 (`Thu, 01 Jun 2023 09:15:33 -0700`).
    Rfc2822,
    /// RFC 2822 look-alikes: no weekday, named zones, IMAP and asctime layouts.
    Rfc2822Lenient,
    /// ISO 8601 / RFC 3339 (`2023-06-01`, `2023-06-01T09:15:33Z`).
    Iso8601,
    /// A plausible year, optionally with a month and day, anywhere in the text.
    LooseText,
    /// Timestamp of the `Received:` header.
    ReceivedHeader,
    /// Timestamp on the `From ` delimiter line.
    EnvelopeLine,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::Rfc2822,
        Strategy::Rfc2822Lenient,
        Strategy::Iso8601,
        Strategy::LooseText,
        Strategy::ReceivedHeader,
        Strategy::EnvelopeLine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Rfc2822 => "rfc2822",
            Self::Rfc2822Lenient => "rfc2822-lenient",
            Self::Iso8601 => "iso8601",
            Self::LooseText => "loose-text",
            Self::ReceivedHeader => "received-header",
            Self::EnvelopeLine => "envelope-line",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive range of years the loose strategy will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub min_year: i32,
    pub max_year: i32,
}

impl DateWindow {
    pub fn new(min_year: i32, max_year: i32) -> Self {
        Self { min_year, max_year }
    }

    /// `[min_year, current year + years_ahead]`.
    pub fn up_to_now(min_year: i32, years_ahead: i32) -> Self {
        Self::new(min_year, Utc::now().year() + years_ahead)
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }
}

impl Default for DateWindow {
    fn default() -> Self {
        Self::up_to_now(1970, 1)
    }
}

/// Signature shared by every strategy.
pub type StrategyFn = fn(&str, &DateWindow) -> Option<MailDate>;

/// Strategies applied to the `Date:` header, in order.
pub const PRIMARY_CHAIN: [(Strategy, StrategyFn); 4] = [
    (Strategy::Rfc2822, parse_rfc2822),
    (Strategy::Rfc2822Lenient, parse_rfc2822_lenient),
    (Strategy::Iso8601, parse_iso8601),
    (Strategy::LooseText, parse_loose_text),
];

/// Strategies applied to secondary sources (free text there is too noisy).
const SECONDARY_CHAIN: [StrategyFn; 3] = [parse_rfc2822, parse_rfc2822_lenient, parse_iso8601];

/// Runs the strategy chain with a fixed year window.
#[derive(Debug, Clone, Default)]
pub struct DateNormalizer {
    window: DateWindow,
}

impl DateNormalizer {
    pub fn new(window: DateWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Normalize a `Date:` header value alone.
    pub fn normalize(&self, raw: Option<&str>) -> NormalizedDate {
        self.resolve(raw, None, None)
    }

    /// Normalize with fallbacks to the `Received:` timestamp and envelope line.
    pub fn resolve(
        &self,
        raw: Option<&str>,
        received: Option<&str>,
        envelope: Option<&str>,
    ) -> NormalizedDate {
        if let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) {
            for (strategy, parse) in PRIMARY_CHAIN {
                if let Some(date) = parse(raw, &self.window) {
                    return NormalizedDate::Parsed { date, strategy };
                }
            }
            debug!(date = raw, "No strategy matched Date header");
        }

        let secondary = [
            (Strategy::ReceivedHeader, received),
            (Strategy::EnvelopeLine, envelope),
        ];
        for (strategy, source) in secondary {
            let Some(source) = source.map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            if let Some(date) = SECONDARY_CHAIN
                .iter()
                .find_map(|parse| parse(source, &self.window))
            {
                return NormalizedDate::Parsed { date, strategy };
            }
        }

        NormalizedDate::Unparsed
    }
}

// ── Strategy 1: strict RFC 2822 ────────────────────────────────

/// `Thu, 01 Jun 2023 09:15:33 -0700` and anything else chrono's RFC 2822 parser accepts.
pub fn parse_rfc2822(raw: &str, _window: &DateWindow) -> Option<MailDate> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(MailDate::Timestamp)
}

// ── Strategy 2: RFC 2822 variants ──────────────────────────────

const LENIENT_ZONED_FORMATS: [&str; 5] = [
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%d %b %y %H:%M:%S %z",
    "%b %d %H:%M:%S %Y %z",
    "%b %d %Y %H:%M:%S %z",
];

const LENIENT_NAIVE_FORMATS: [&str; 5] = [
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%b %d %H:%M:%S %Y",
    "%b %d %Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

const LENIENT_DAY_FORMATS: [&str; 3] = ["%d %b %Y", "%b %d %Y", "%B %d %Y"];

/// RFC 2822 look-alikes: optional weekday, extra whitespace, trailing
/// comments, named zones, IMAP `16-JUL-2025` and asctime layouts.
/// Zone-less times are taken as UTC.
pub fn parse_rfc2822_lenient(raw: &str, _window: &DateWindow) -> Option<MailDate> {
    let cleaned = strip_day_of_week(&collapse_whitespace(&strip_comments(raw)));
    if cleaned.is_empty() {
        return None;
    }
    let cleaned = normalize_imap_date(&cleaned);
    let cleaned = cleaned.replace(',', " ");
    let cleaned = replace_named_tz(&collapse_whitespace(&cleaned));

    if let Ok(dt) = DateTime::parse_from_rfc2822(&cleaned) {
        return Some(MailDate::Timestamp(dt));
    }
    for fmt in LENIENT_ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&cleaned, fmt) {
            return Some(MailDate::Timestamp(dt));
        }
    }
    for fmt in LENIENT_NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(as_utc(ndt));
        }
    }
    for fmt in LENIENT_DAY_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(MailDate::Day(d));
        }
    }

    // mail-parser knows many broken real-world layouts, but only trust it
    // when there is a time of day to anchor on.
    if cleaned.contains(':') {
        return mail_parser_date(raw.trim());
    }
    None
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<MailDate> {
    use mail_parser::MessageParser;

    let fake_msg = format!("Date: {input}\n\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes())?;
    let rfc3339 = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&rfc3339)
        .ok()
        .filter(|dt| dt.year() > 1)
        .map(MailDate::Timestamp)
}

fn as_utc(ndt: NaiveDateTime) -> MailDate {
    match FixedOffset::east_opt(0) {
        Some(utc) => MailDate::Timestamp(utc.from_utc_datetime(&ndt)),
        None => MailDate::Day(ndt.date()),
    }
}

/// Remove parenthesized comments such as `(PDT)` or `(GMT+02:00)`.
fn strip_comments(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip a leading weekday, abbreviated or full, with or without a comma.
fn strip_day_of_week(s: &str) -> String {
    let first = s.split([' ', ',']).next().unwrap_or("");
    let lower = first.to_ascii_lowercase();
    let is_weekday = WEEKDAYS
        .iter()
        .any(|(short, long)| lower == *short || lower == *long);
    if is_weekday {
        s[first.len()..]
            .trim_start_matches([',', ' '])
            .to_string()
    } else {
        s.to_string()
    }
}

const WEEKDAYS: [(&str, &str); 7] = [
    ("mon", "monday"),
    ("tue", "tuesday"),
    ("wed", "wednesday"),
    ("thu", "thursday"),
    ("fri", "friday"),
    ("sat", "saturday"),
    ("sun", "sunday"),
];

/// `"16-JUL-2025 03:01:03"` → `"16 JUL 2025 03:01:03"`.
fn normalize_imap_date(s: &str) -> String {
    let (first, rest) = s.split_once(' ').unwrap_or((s, ""));
    let parts: Vec<&str> = first.split('-').collect();
    let imap_like = parts.len() == 3
        && parts[0].bytes().all(|b| b.is_ascii_digit())
        && parts[1].bytes().all(|b| b.is_ascii_alphabetic())
        && parts[2].bytes().all(|b| b.is_ascii_digit());
    if !imap_like {
        return s.to_string();
    }
    let date = parts.join(" ");
    if rest.is_empty() {
        date
    } else {
        format!("{date} {rest}")
    }
}

/// Replace a trailing timezone abbreviation with its numeric offset.
fn replace_named_tz(s: &str) -> String {
    const TZS: [(&str, &str); 15] = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("UT", "+0000"),
        ("Z", "+0000"),
        ("CEST", "+0200"),
        ("CET", "+0100"),
        ("JST", "+0900"),
    ];
    let Some((head, last)) = s.rsplit_once(' ') else {
        return s.to_string();
    };
    TZS.iter()
        .find(|(name, _)| last.eq_ignore_ascii_case(name))
        .map(|(_, offset)| format!("{head} {offset}"))
        .unwrap_or_else(|| s.to_string())
}

// ── Strategy 3: ISO 8601 ───────────────────────────────────────

const ISO_ZONED_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

const ISO_NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

const ISO_DAY_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// `2023-06-01`, `2023-06-01T09:15:33Z`, `2023-06-01 09:15:33 +0200`, or a
/// leading `YYYY-MM-DD` token followed by other text.
pub fn parse_iso8601(raw: &str, _window: &DateWindow) -> Option<MailDate> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(MailDate::Timestamp(dt));
    }
    for fmt in ISO_ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Some(MailDate::Timestamp(dt));
        }
    }
    for fmt in ISO_NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(as_utc(ndt));
        }
    }

    let first = trimmed.split_whitespace().next()?;
    let first = first.split('T').next().unwrap_or(first);
    ISO_DAY_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(first, fmt).ok())
        .map(MailDate::Day)
}

// ── Strategy 4: loose free text ────────────────────────────────

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

#[derive(Debug)]
struct Token<'a> {
    text: &'a str,
    /// Separator between this token and the next one.
    sep_after: &'a str,
}

fn tokenize(s: &str) -> Vec<Token<'_>> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in s.char_indices() {
        match (c.is_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(st)) => {
                spans.push((st, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(st) = start {
        spans.push((st, s.len()));
    }

    spans
        .iter()
        .enumerate()
        .map(|(i, &(begin, end))| {
            let next = spans.get(i + 1).map_or(s.len(), |n| n.0);
            Token {
                text: &s[begin..end],
                sep_after: &s[end..next],
            }
        })
        .collect()
}

fn month_from_name(token: &str) -> Option<u32> {
    let lower = token.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| *m == lower || (lower.len() <= 4 && m.starts_with(lower.as_str())))
        .map(|i| i as u32 + 1)
}

fn small_number(token: &str, max: u32) -> Option<u32> {
    if token.is_empty() || token.len() > 2 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok().filter(|n| (1..=max).contains(n))
}

fn is_date_joiner(sep: &str) -> bool {
    matches!(sep, "-" | "/" | ".")
}

/// Find a four-digit year inside `window`, pair it with a month name or a
/// joined numeric month when possible, and default the rest to the 1st.
pub fn parse_loose_text(raw: &str, window: &DateWindow) -> Option<MailDate> {
    let tokens = tokenize(raw);

    let year_pos = tokens.iter().position(|t| {
        t.text.len() == 4
            && t.text.bytes().all(|b| b.is_ascii_digit())
            && t.text.parse::<i32>().is_ok_and(|y| window.contains(y))
    })?;
    let year: i32 = tokens[year_pos].text.parse().ok()?;

    let mut month = None;
    let mut day = None;

    if let Some(month_pos) = tokens.iter().position(|t| month_from_name(t.text).is_some()) {
        month = month_from_name(tokens[month_pos].text);
        let neighbours = [month_pos.checked_sub(1), Some(month_pos + 1)];
        day = neighbours
            .into_iter()
            .flatten()
            .filter(|&i| i != year_pos)
            .find_map(|i| tokens.get(i).and_then(|t| small_number(t.text, 31)));
    } else {
        let after = tokens
            .get(year_pos + 1)
            .filter(|_| is_date_joiner(tokens[year_pos].sep_after));
        let before = year_pos
            .checked_sub(1)
            .map(|i| &tokens[i])
            .filter(|t| is_date_joiner(t.sep_after));

        if let Some(m) = after.and_then(|t| small_number(t.text, 12)) {
            month = Some(m);
            let month_tok = &tokens[year_pos + 1];
            if is_date_joiner(month_tok.sep_after) {
                day = tokens
                    .get(year_pos + 2)
                    .and_then(|t| small_number(t.text, 31));
            }
        } else if let Some(m) = before.and_then(|t| small_number(t.text, 12)) {
            month = Some(m);
        }
    }

    let month = month.unwrap_or(1);
    let date = day
        .and_then(|d| NaiveDate::from_ymd_opt(year, month, d))
        .or_else(|| NaiveDate::from_ymd_opt(year, month, 1))?;
    Some(MailDate::Day(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> DateWindow {
        DateWindow::new(1970, 2030)
    }

    fn ymd(d: &MailDate) -> (i32, u32, u32) {
        (d.year(), d.month(), d.day())
    }

    #[test]
    fn test_strict_rfc2822() {
        let d = parse_rfc2822("Thu, 01 Jun 2023 09:15:33 -0700", &window()).unwrap();
        assert_eq!(ymd(&d), (2023, 6, 1));
        assert!(d.has_time());
        assert_eq!(d.format("%H:%M:%S %z"), "09:15:33 -0700");
    }

    #[test]
    fn test_chain_reports_rfc2822() {
        let n = DateNormalizer::new(window()).normalize(Some("Thu, 01 Jun 2023 09:15:33 -0700"));
        assert_eq!(n.strategy(), Some(Strategy::Rfc2822));
        assert_eq!(ymd(n.date().unwrap()), (2023, 6, 1));
    }

    #[test]
    fn test_lenient_variants() {
        let w = window();
        let cases = [
            ("04 Jan 2024 10:00:00 EST", (2024, 1, 4)),
            ("Thursday, 04 Jan 2024 10:00:00 +0000", (2024, 1, 4)),
            ("Thu,  4 Jan 2024 10:00:00 +0000 (UTC)", (2024, 1, 4)),
            ("16-JUL-2025 03:01:03", (2025, 7, 16)),
            ("14-AUG-2025 02:01:35 +0000", (2025, 8, 14)),
            ("Thu Jun  1 09:15:33 2023", (2023, 6, 1)),
            ("4 Jan 2024", (2024, 1, 4)),
        ];
        for (input, expected) in cases {
            let d = parse_rfc2822_lenient(input, &w)
                .unwrap_or_else(|| panic!("failed to parse {input:?}"));
            assert_eq!(ymd(&d), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_lenient_named_zone_offset() {
        let d = parse_rfc2822_lenient("Thu, 04 Jan 2024 10:00:00 PST", &window()).unwrap();
        assert_eq!(d.format("%z"), "-0800");
    }

    #[test]
    fn test_iso8601() {
        let w = window();
        let d = parse_iso8601("2023-06-01", &w).unwrap();
        assert_eq!(ymd(&d), (2023, 6, 1));
        assert!(!d.has_time());
        let d = parse_iso8601("2024-01-04T10:00:00Z", &w).unwrap();
        assert!(d.has_time());
        let d = parse_iso8601("2022-11-30 (approx.)", &w).unwrap();
        assert_eq!(ymd(&d), (2022, 11, 30));
        assert!(parse_iso8601("not a date", &w).is_none());
    }

    #[test]
    fn test_loose_month_name() {
        let d = parse_loose_text("June 2023 newsletter", &window()).unwrap();
        assert_eq!(ymd(&d), (2023, 6, 1));
    }

    #[test]
    fn test_loose_day_and_month() {
        let w = window();
        assert_eq!(
            ymd(&parse_loose_text("sent on 15 Sept 2021 somewhere", &w).unwrap()),
            (2021, 9, 15)
        );
        assert_eq!(
            ymd(&parse_loose_text("March 3, 2019", &w).unwrap()),
            (2019, 3, 3)
        );
    }

    #[test]
    fn test_loose_numeric_month() {
        let w = window();
        assert_eq!(ymd(&parse_loose_text("report 2022/07", &w).unwrap()), (2022, 7, 1));
        assert_eq!(ymd(&parse_loose_text("11.2020 batch", &w).unwrap()), (2020, 11, 1));
        assert_eq!(ymd(&parse_loose_text("2021-02-30x", &w).unwrap()), (2021, 2, 1));
    }

    #[test]
    fn test_loose_year_only_and_window() {
        let w = window();
        assert_eq!(ymd(&parse_loose_text("year 2005 recap", &w).unwrap()), (2005, 1, 1));
        assert!(parse_loose_text("order 1234 shipped", &w).is_none());
        assert!(parse_loose_text("no digits", &w).is_none());
        // First in-window year wins
        assert_eq!(
            ymd(&parse_loose_text("ticket 9999 from 2010", &w).unwrap()),
            (2010, 1, 1)
        );
    }

    #[test]
    fn test_absent_header_is_unparsed() {
        let n = DateNormalizer::new(window());
        assert_eq!(n.normalize(None), NormalizedDate::Unparsed);
        assert_eq!(n.normalize(Some("   ")), NormalizedDate::Unparsed);
        assert_eq!(n.normalize(Some("garbage")), NormalizedDate::Unparsed);
    }

    #[test]
    fn test_secondary_sources() {
        let n = DateNormalizer::new(window());
        let r = n.resolve(None, Some("Sun, 31 Dec 2023 09:00:00 +0000"), None);
        assert_eq!(r.strategy(), Some(Strategy::ReceivedHeader));
        let r = n.resolve(Some("garbage"), None, Some("Thu Jun  1 09:15:33 2023"));
        assert_eq!(r.strategy(), Some(Strategy::EnvelopeLine));
        assert_eq!(ymd(r.date().unwrap()), (2023, 6, 1));
        // The primary header wins when it parses
        let r = n.resolve(
            Some("2021-05-05"),
            Some("Sun, 31 Dec 2023 09:00:00 +0000"),
            None,
        );
        assert_eq!(r.strategy(), Some(Strategy::Iso8601));
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(Strategy::LooseText.to_string(), "loose-text");
        assert_eq!(Strategy::ALL.len(), 6);
    }
}
