//! The materialized index of one mailbox file.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{MboxError, Result};
use crate::model::mail::{MailDate, MessageRecord};
use crate::parser::date::Strategy;

/// Every message record of one mbox file, in file order.
///
/// Built once by [`build_index`](crate::index::build_index) and never
/// mutated afterwards; sorting and searching produce views over it.
#[derive(Debug, Clone)]
pub struct MailboxIndex {
    path: PathBuf,
    file_size: u64,
    preamble: u64,
    records: Vec<MessageRecord>,
}

impl MailboxIndex {
    /// Assemble an index. `records[i].index` must equal `i`.
    pub fn new(
        path: impl Into<PathBuf>,
        file_size: u64,
        preamble: u64,
        records: Vec<MessageRecord>,
    ) -> Self {
        debug_assert!(records.iter().enumerate().all(|(i, r)| r.index == i));
        Self {
            path: path.into(),
            file_size,
            preamble,
            records,
        }
    }

    /// Path of the source mbox file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the source file when it was indexed.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes before the first delimiter, not covered by any record.
    pub fn preamble_len(&self) -> u64 {
        self.preamble
    }

    /// Number of messages.
    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    /// Record at a file-order position.
    pub fn get(&self, index: usize) -> Result<&MessageRecord> {
        self.records.get(index).ok_or(MboxError::OutOfRange {
            ordinal: index,
            len: self.records.len(),
        })
    }

    /// Messages whose date could not be resolved.
    pub fn unparsed_count(&self) -> usize {
        self.records.iter().filter(|r| !r.date.is_parsed()).count()
    }

    /// Per-message date resolution report, in file order.
    pub fn date_diagnostics(&self) -> Vec<DateDiagnostic> {
        self.records.iter().map(DateDiagnostic::from).collect()
    }
}

/// How one message's date was resolved: raw header, strategy, result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateDiagnostic {
    pub index: usize,
    pub subject: String,
    /// The raw `Date:` header, if present.
    pub raw: Option<String>,
    /// Strategy that produced `date`; `None` means unparsed.
    pub strategy: Option<Strategy>,
    pub date: Option<MailDate>,
}

impl From<&MessageRecord> for DateDiagnostic {
    fn from(record: &MessageRecord) -> Self {
        Self {
            index: record.index,
            subject: record.subject().to_string(),
            raw: record.raw_date().map(str::to_string),
            strategy: record.date.strategy(),
            date: record.date.date().copied(),
        }
    }
}

impl DateDiagnostic {
    /// Strategy name, or `"unparsed"`.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.map_or("unparsed", Strategy::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mail::{HeaderName, Headers, NormalizedDate};
    use chrono::NaiveDate;

    fn record(index: usize, subject: &str, date: NormalizedDate) -> MessageRecord {
        let mut headers = Headers::default();
        headers.set(HeaderName::Subject, subject.to_string());
        MessageRecord {
            index,
            offset: index as u64 * 100,
            length: 100,
            headers,
            date,
        }
    }

    fn sample_index() -> MailboxIndex {
        let day = MailDate::Day(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        MailboxIndex::new(
            "test.mbox",
            200,
            0,
            vec![
                record(
                    0,
                    "first",
                    NormalizedDate::Parsed {
                        date: day,
                        strategy: Strategy::Iso8601,
                    },
                ),
                record(1, "second", NormalizedDate::Unparsed),
            ],
        )
    }

    #[test]
    fn test_get_and_size() {
        let index = sample_index();
        assert_eq!(index.size(), 2);
        assert_eq!(index.get(1).unwrap().subject(), "second");
        assert!(matches!(
            index.get(2),
            Err(MboxError::OutOfRange { ordinal: 2, len: 2 })
        ));
        assert_eq!(index.unparsed_count(), 1);
    }

    #[test]
    fn test_date_diagnostics() {
        let diags = sample_index().date_diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].strategy_name(), "iso8601");
        assert_eq!(diags[1].strategy_name(), "unparsed");
        assert_eq!(diags[1].date, None);
        assert_eq!(diags[1].raw, None);
    }
}
