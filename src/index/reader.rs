//! Aggregate statistics over an index, computed on demand.

use std::collections::HashMap;

use serde::Serialize;

use crate::index::mailbox::MailboxIndex;
use crate::model::address::EmailAddress;
use crate::model::mail::{MailDate, MessageRecord};
use crate::parser::date::Strategy;

/// Number of sender domains reported by [`MailboxStats`].
pub const TOP_DOMAINS: usize = 5;

/// Summary of a whole mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxStats {
    pub total: usize,
    pub parsed_dates: usize,
    pub unparsed_dates: usize,
    pub earliest: Option<MailDate>,
    pub latest: Option<MailDate>,
    pub file_size: u64,
    pub preamble_bytes: u64,
    /// Messages resolved by each strategy, in chain order; zero counts omitted.
    pub by_strategy: Vec<(Strategy, usize)>,
    /// Most frequent sender domains, most frequent first.
    pub top_domains: Vec<(String, usize)>,
}

impl MailboxStats {
    /// Walk every record of the index once.
    pub fn compute(index: &MailboxIndex) -> Self {
        let records = index.records();
        let (earliest, latest) = date_range(records).unzip();

        let mut by_strategy: HashMap<Strategy, usize> = HashMap::new();
        for strategy in records.iter().filter_map(|r| r.date.strategy()) {
            *by_strategy.entry(strategy).or_default() += 1;
        }
        let mut by_strategy: Vec<(Strategy, usize)> = by_strategy.into_iter().collect();
        by_strategy.sort_by_key(|(strategy, _)| *strategy);

        let parsed_dates = by_strategy.iter().map(|(_, n)| n).sum();

        Self {
            total: records.len(),
            parsed_dates,
            unparsed_dates: records.len() - parsed_dates,
            earliest,
            latest,
            file_size: index.file_size(),
            preamble_bytes: index.preamble_len(),
            by_strategy,
            top_domains: top_domains(records, TOP_DOMAINS),
        }
    }
}

/// Return the date range (oldest, newest) across the records with a date.
pub fn date_range(records: &[MessageRecord]) -> Option<(MailDate, MailDate)> {
    let mut dates = records.iter().filter_map(|r| r.date.date().copied());
    let first = dates.next()?;
    Some(dates.fold((first, first), |(min, max), d| (min.min(d), max.max(d))))
}

/// Return the top N sender domains by message count.
///
/// Ties are broken alphabetically so the output is stable.
pub fn top_domains(records: &[MessageRecord], n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        if let Some(domain) = EmailAddress::parse(record.from()).domain() {
            *counts.entry(domain).or_default() += 1;
        }
    }
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mail::{HeaderName, Headers, NormalizedDate};
    use chrono::NaiveDate;

    fn record(index: usize, from: &str, ymd: Option<(i32, u32, u32)>) -> MessageRecord {
        let mut headers = Headers::default();
        headers.set(HeaderName::From, from.to_string());
        let date = match ymd {
            Some((y, m, d)) => NormalizedDate::Parsed {
                date: MailDate::Day(NaiveDate::from_ymd_opt(y, m, d).unwrap()),
                strategy: Strategy::Iso8601,
            },
            None => NormalizedDate::Unparsed,
        };
        MessageRecord {
            index,
            offset: index as u64 * 10,
            length: 10,
            headers,
            date,
        }
    }

    #[test]
    fn test_compute_stats() {
        let index = MailboxIndex::new(
            "x.mbox",
            40,
            0,
            vec![
                record(0, "a@one.org", Some((2022, 5, 1))),
                record(1, "B <b@Two.org>", Some((2021, 1, 9))),
                record(2, "c@one.org", None),
                record(3, "nobody", Some((2023, 12, 31))),
            ],
        );
        let stats = MailboxStats::compute(&index);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.parsed_dates, 3);
        assert_eq!(stats.unparsed_dates, 1);
        assert_eq!(stats.earliest.unwrap().year(), 2021);
        assert_eq!(stats.latest.unwrap().year(), 2023);
        assert_eq!(stats.by_strategy, vec![(Strategy::Iso8601, 3)]);
        assert_eq!(
            stats.top_domains,
            vec![("one.org".to_string(), 2), ("two.org".to_string(), 1)]
        );
        assert_eq!(stats.file_size, 40);
    }

    #[test]
    fn test_empty_index_stats() {
        let stats = MailboxStats::compute(&MailboxIndex::new("e.mbox", 0, 0, Vec::new()));
        assert_eq!(stats.total, 0);
        assert_eq!(stats.earliest, None);
        assert!(stats.top_domains.is_empty());
    }
}
